/// Keep at most `max_chars` characters of `s`, cutting on a char boundary.
/// Strings already within the bound come back unchanged.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
