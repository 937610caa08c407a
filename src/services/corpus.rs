//! Persisted corpus: vector index, parallel passage store, and the
//! metadata summary emitted after a build.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::index::{IndexMode, VectorIndex};
use crate::models::{IndexingConfig, Passage};

pub const INDEX_FILE: &str = "index.json";
pub const PASSAGES_FILE: &str = "passages.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Snapshot of configuration and corpus size, written next to the index
/// for operational visibility (`status` reads it back).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub document_count: usize,
    pub vector_dimension: usize,
    pub index_mode: IndexMode,
    pub chunk_size: usize,
    pub overlap: usize,
    pub total_vectors: usize,
    pub files_indexed: u64,
    pub files_skipped: u64,
    pub created_at: String,
}

/// An index and the passages it was built from. Position `i` in the index
/// corresponds to `passages[i]` as long as both were saved together; a
/// search position past the passage store means the two drifted apart and
/// is skipped by the retrieval layer rather than treated as fatal.
pub struct CorpusIndex {
    pub index: VectorIndex,
    pub passages: Vec<Passage>,
}

impl CorpusIndex {
    pub fn new(index: VectorIndex, passages: Vec<Passage>) -> Self {
        Self { index, passages }
    }

    /// Passage for an index position, if the position is still valid.
    pub fn passage_at(&self, position: usize) -> Option<&Passage> {
        self.passages.get(position)
    }

    pub fn metadata(
        &self,
        config: &IndexingConfig,
        files_indexed: u64,
        files_skipped: u64,
    ) -> IndexMetadata {
        IndexMetadata {
            document_count: self.passages.len(),
            vector_dimension: self.index.dimension(),
            index_mode: self.index.mode(),
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            total_vectors: self.index.len(),
            files_indexed,
            files_skipped,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Write index, passage store, and metadata summary together.
    pub fn save(&self, dir: &Path, metadata: &IndexMetadata) -> Result<(), IndexError> {
        std::fs::create_dir_all(dir)?;

        self.index.save(&dir.join(INDEX_FILE))?;

        let passages_file = std::fs::File::create(dir.join(PASSAGES_FILE))?;
        serde_json::to_writer(std::io::BufWriter::new(passages_file), &self.passages)?;

        let metadata_file = std::fs::File::create(dir.join(METADATA_FILE))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(metadata_file), metadata)?;

        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let index = VectorIndex::load(&dir.join(INDEX_FILE))?;

        let passages_file = std::fs::File::open(dir.join(PASSAGES_FILE))?;
        let passages: Vec<Passage> =
            serde_json::from_reader(std::io::BufReader::new(passages_file))?;

        Ok(Self { index, passages })
    }

    pub fn load_metadata(dir: &Path) -> Result<IndexMetadata, IndexError> {
        let file = std::fs::File::open(dir.join(METADATA_FILE))?;
        let metadata = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(metadata)
    }
}
