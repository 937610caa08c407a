//! In-process vector index over passage embeddings.
//!
//! Two modes share one facade: `Flat` is exact brute-force inner product,
//! `Ivf` is the approximate IVF-PQ structure. The IVF state machine is
//! `Empty → Trained → Populated`; flat skips the training state entirely.

mod flat;
mod ivf;
mod kmeans;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use flat::FlatIndex;
pub use ivf::{IvfIndex, IvfParams};

use crate::error::IndexError;
use crate::models::IndexingConfig;

/// Index structure selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Approximate IVF-PQ; the primary target for large corpora.
    #[default]
    Ivf,
    /// Exact brute-force fallback.
    Flat,
}

impl std::str::FromStr for IndexMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ivf" | "ivf_pq" | "ivfpq" => Ok(IndexMode::Ivf),
            "flat" | "exact" => Ok(IndexMode::Flat),
            _ => Err(format!("unknown index mode: {}", s)),
        }
    }
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexMode::Ivf => write!(f, "ivf"),
            IndexMode::Flat => write!(f, "flat"),
        }
    }
}

impl From<&IndexingConfig> for IvfParams {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            nlist: config.nlist,
            nprobe: config.nprobe,
            subspaces: config.pq_subspaces,
            bits: config.pq_bits,
        }
    }
}

/// Facade over the two index structures. Search takes `&self` with no
/// interior mutability, so concurrent readers need no synchronization as
/// long as nobody mutates; rebuilds publish a fresh index instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VectorIndex {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

impl VectorIndex {
    pub fn new(dim: usize, mode: IndexMode, params: IvfParams) -> Result<Self, IndexError> {
        match mode {
            IndexMode::Flat => Ok(VectorIndex::Flat(FlatIndex::new(dim)?)),
            IndexMode::Ivf => Ok(VectorIndex::Ivf(IvfIndex::new(dim, params)?)),
        }
    }

    pub fn mode(&self) -> IndexMode {
        match self {
            VectorIndex::Flat(_) => IndexMode::Flat,
            VectorIndex::Ivf(_) => IndexMode::Ivf,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            VectorIndex::Flat(index) => index.dimension(),
            VectorIndex::Ivf(index) => index.dimension(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(index) => index.len(),
            VectorIndex::Ivf(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this index must be trained before vectors can be added.
    pub fn needs_training(&self) -> bool {
        match self {
            VectorIndex::Flat(_) => false,
            VectorIndex::Ivf(index) => !index.is_trained(),
        }
    }

    /// Train on a representative sample (commonly the full corpus).
    /// Flat mode has no training state and rejects the call.
    pub fn train(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        match self {
            VectorIndex::Flat(_) => Err(IndexError::TrainingNotRequired),
            VectorIndex::Ivf(index) => index.train(vectors),
        }
    }

    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        match self {
            VectorIndex::Flat(index) => index.add(vectors),
            VectorIndex::Ivf(index) => index.add(vectors),
        }
    }

    /// Top-k `(position, score)` by descending similarity.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        match self {
            VectorIndex::Flat(index) => index.search(query, k),
            VectorIndex::Ivf(index) => index.search(query, k),
        }
    }

    /// Persist full index state (parameters, quantizer, codes or vectors).
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    /// Restore an index saved with [`VectorIndex::save`]. Search results
    /// after reload are identical to pre-save results for the same query.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let file = std::fs::File::open(path)?;
        let index = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(index)
    }
}
