use serde::{Deserialize, Serialize};

use crate::text::truncate_chars;

/// Preview length for notes.
pub const NOTE_SNIPPET_CHARS: usize = 500;
/// Preview length for accessibility uploads.
pub const DOCUMENT_SNIPPET_CHARS: usize = 300;

pub const DEFAULT_NOTE_TITLE: &str = "Note";

/// A note as written to the store. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    /// Present only when the note came from an uploaded file.
    pub public_url: Option<String>,
    pub snippet: String,
}

impl NewNote {
    pub fn new(title: Option<String>, content: String, public_url: Option<String>) -> Self {
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string());
        let snippet = truncate_chars(&content, NOTE_SNIPPET_CHARS).to_string();
        Self {
            title,
            content,
            public_url,
            snippet,
        }
    }

    pub fn with_id(self, id: String) -> NoteRecord {
        NoteRecord {
            id,
            title: self.title,
            content: self.content,
            public_url: self.public_url,
            snippet: self.snippet,
        }
    }
}

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub snippet: String,
}

impl NoteRecord {
    /// The text worth explaining: full content, falling back to the snippet.
    pub fn explainable_text(&self) -> &str {
        if self.content.is_empty() {
            &self.snippet
        } else {
            &self.content
        }
    }
}

/// Metadata for a file uploaded to the accessibility service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    /// Original filename
    pub title: String,
    /// Object storage key
    pub storage_path: String,
    pub public_url: String,
    pub extracted_snippet: String,
}

impl NewDocument {
    pub fn new(title: String, storage_path: String, public_url: String, text: &str) -> Self {
        Self {
            title,
            storage_path,
            public_url,
            extracted_snippet: truncate_chars(text, DOCUMENT_SNIPPET_CHARS).to_string(),
        }
    }

    pub fn with_id(self, id: String) -> DocumentRecord {
        DocumentRecord {
            id,
            title: self.title,
            storage_path: self.storage_path,
            public_url: self.public_url,
            extracted_snippet: self.extracted_snippet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub storage_path: String,
    pub public_url: String,
    pub extracted_snippet: String,
}
