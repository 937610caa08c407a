//! Text processing utilities.

/// Minimum trimmed length for a document to be worth chunking at all.
pub const MIN_DOCUMENT_CHARS: usize = 20;

/// Case-fold and trim a query so that cache keys collide for queries
/// differing only in case or surrounding whitespace.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
