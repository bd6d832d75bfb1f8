use redb::TableDefinition;

/// Notes: id -> NoteRecord (msgpack)
pub const NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("notes");

/// Accessibility uploads: id -> DocumentRecord (msgpack)
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
