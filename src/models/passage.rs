use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bounded, possibly overlapping window of a source document.
///
/// Passages are created once during ingestion and immutable afterwards.
/// The corpus store owns them in insertion order, so a passage's position
/// in that store matches its vector's position in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub content: String,
    pub source: String,
    /// Character offset of the window start in the source document.
    pub start_pos: usize,
    /// Character offset one past the window end (before trimming).
    pub end_pos: usize,
    pub chunk_index: usize,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Passage {
    /// Deterministic id: identical `(source, start_pos)` always digests to
    /// the identical id, which makes re-chunking idempotent.
    pub fn generate_id(source: &str, start_pos: usize) -> String {
        use sha2::{Digest, Sha256};
        let input = format!("{}:{}", source, start_pos);
        let hash = Sha256::digest(input.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(
        content: String,
        source: &str,
        start_pos: usize,
        end_pos: usize,
        chunk_index: usize,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            id: Self::generate_id(source, start_pos),
            content,
            source: source.to_string(),
            start_pos,
            end_pos,
            chunk_index,
            created_at: chrono::Utc::now().to_rfc3339(),
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_deterministic() {
        let a = Passage::generate_id("docs/creed.txt", 462);
        let b = Passage::generate_id("docs/creed.txt", 462);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_generate_id_varies_with_inputs() {
        let base = Passage::generate_id("docs/creed.txt", 0);
        assert_ne!(base, Passage::generate_id("docs/creed.txt", 462));
        assert_ne!(base, Passage::generate_id("docs/other.txt", 0));
    }

    #[test]
    fn test_new_fills_id_and_timestamp() {
        let p = Passage::new("body".to_string(), "src.txt", 0, 4, 0, Map::new());
        assert_eq!(p.id, Passage::generate_id("src.txt", 0));
        assert!(!p.created_at.is_empty());
        assert!(p.extra.is_empty());
    }
}
