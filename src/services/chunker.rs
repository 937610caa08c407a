//! Text chunking with overlap.

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::models::{IndexingConfig, Passage};
use crate::utils::text::MIN_DOCUMENT_CHARS;

/// Splits documents into overlapping fixed-size passages.
///
/// Windows advance by `chunk_size - overlap` characters, so identical input
/// always yields identical passage ids and contents.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    min_chunk_chars: usize,
}

impl TextChunker {
    /// Create a chunker. Rejects `overlap >= chunk_size`, which would make
    /// the stride non-positive and the split loop endless.
    pub fn new(config: &IndexingConfig) -> Result<Self, ConfigError> {
        if config.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if config.overlap >= config.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            min_chunk_chars: config.min_chunk_chars,
        })
    }

    /// Split `content` into passages attributed to `source`.
    ///
    /// Returns an empty sequence (not an error) for content too short to be
    /// worth indexing. Windows are trimmed of surrounding whitespace and
    /// dropped when the trimmed remainder is below the minimum length;
    /// `chunk_index` counts kept passages only.
    pub fn chunk(
        &self,
        content: &str,
        source: &str,
        extra: Option<&Map<String, Value>>,
    ) -> Vec<Passage> {
        if content.trim().chars().count() < MIN_DOCUMENT_CHARS {
            return Vec::new();
        }

        let chars: Vec<char> = content.chars().collect();
        let total = chars.len();
        let stride = self.chunk_size - self.overlap;

        let mut passages = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + self.chunk_size).min(total);
            let window: String = chars[start..end].iter().collect();
            let trimmed = window.trim();

            if trimmed.chars().count() >= self.min_chunk_chars {
                passages.push(Passage::new(
                    trimmed.to_string(),
                    source,
                    start,
                    end,
                    passages.len(),
                    extra.cloned().unwrap_or_default(),
                ));
            }

            start += stride;
        }

        passages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(&IndexingConfig {
            chunk_size,
            overlap,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let config = IndexingConfig {
            chunk_size: 100,
            overlap: 100,
            ..Default::default()
        };
        assert!(TextChunker::new(&config).is_err());

        let config = IndexingConfig {
            chunk_size: 100,
            overlap: 150,
            ..Default::default()
        };
        assert!(TextChunker::new(&config).is_err());
    }

    #[test]
    fn test_short_content_yields_nothing() {
        let chunks = chunker(512, 50).chunk("too short", "doc.txt", None);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_offsets_for_thousand_chars() {
        // 1000 chars at 512/50 must start at 0, 462, 924 with the final
        // passage spanning [924, 1000).
        let content = "a".repeat(1000);
        let chunks = chunker(512, 50).chunk(&content, "doc.txt", None);

        let starts: Vec<usize> = chunks.iter().map(|c| c.start_pos).collect();
        assert_eq!(starts, vec![0, 462, 924]);
        assert_eq!(chunks.last().unwrap().end_pos, 1000);
        assert_eq!(chunks[0].end_pos, 512);
    }

    #[test]
    fn test_starts_increase_by_stride() {
        let content = "x".repeat(3000);
        let chunks = chunker(400, 100).chunk(&content, "doc.txt", None);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_pos - pair[0].start_pos, 300);
        }
        assert_eq!(chunks.last().unwrap().end_pos, 3000);
    }

    #[test]
    fn test_chunking_is_idempotent() {
        let content = format!("{} {}", "alpha beta gamma ".repeat(40), "tail");
        let first = chunker(200, 20).chunk(&content, "doc.txt", None);
        let second = chunker(200, 20).chunk(&content, "doc.txt", None);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_windows_are_trimmed_and_short_ones_dropped() {
        // A long run of whitespace in the middle produces a window whose
        // trimmed length falls under the minimum.
        let content = format!("{}{}{}", "a".repeat(100), " ".repeat(100), "b".repeat(100));
        let chunks = chunker(100, 0).chunk(&content, "doc.txt", None);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "a".repeat(100));
        assert_eq!(chunks[1].content, "b".repeat(100));
        // chunk_index counts kept passages, not windows
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].start_pos, 200);
    }

    #[test]
    fn test_extra_metadata_carried_through() {
        let mut extra = Map::new();
        extra.insert("title".to_string(), Value::String("On Grace".into()));
        let content = "c".repeat(300);
        let chunks = chunker(512, 50).chunk(&content, "doc.json", Some(&extra));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].extra.get("title").unwrap(), "On Grace");
    }
}
