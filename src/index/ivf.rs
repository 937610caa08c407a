//! IVF-PQ approximate index: a k-means coarse quantizer partitions the
//! corpus into inverted lists, and product quantization compresses each
//! vector to one byte per subspace. Search probes the few lists nearest the
//! query and ranks candidates with a precomputed per-subspace score table.
//!
//! Recall is traded for memory and speed; that trade is accepted, not
//! corrected, by callers.

use serde::{Deserialize, Serialize};

use super::kmeans::{dot, kmeans, nearest_centroid, sq_dist};
use crate::error::IndexError;

/// Fixed training seed so the same corpus always produces the same quantizer.
const TRAIN_SEED: u64 = 0x6b73_6561_7263_6801;

/// Training vectors per coarse cluster, at minimum. Cluster count is clamped
/// to `n / TRAIN_POINTS_PER_CLUSTER` to avoid degenerate clustering on small
/// corpora.
const TRAIN_POINTS_PER_CLUSTER: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IvfParams {
    /// Upper bound on coarse cluster count.
    pub nlist: usize,
    /// Clusters probed per query.
    pub nprobe: usize,
    /// PQ subspace count; must divide the vector dimension.
    pub subspaces: usize,
    /// Bits per PQ code; centroids per subspace = 2^bits, max 8.
    pub bits: u32,
}

/// PQ codebook: `subspaces` × `centroids_per_subspace` × `sub_dim` floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PqCodebook {
    subspaces: usize,
    centroids_per_subspace: usize,
    sub_dim: usize,
    centroids: Vec<f32>,
}

impl PqCodebook {
    /// Learn one codebook per subspace over a contiguous vector arena.
    /// `k` must already be clamped to the training-set size by the caller.
    fn train(data: &[f32], dim: usize, subspaces: usize, k: usize, seed: u64) -> Self {
        let sub_dim = dim / subspaces;
        let n = data.len() / dim;
        let mut centroids = vec![0.0f32; subspaces * k * sub_dim];

        for sub in 0..subspaces {
            let mut sub_vectors = vec![0.0f32; n * sub_dim];
            for i in 0..n {
                let src = i * dim + sub * sub_dim;
                sub_vectors[i * sub_dim..(i + 1) * sub_dim]
                    .copy_from_slice(&data[src..src + sub_dim]);
            }
            let sub_centroids = kmeans(&sub_vectors, sub_dim, k, seed.wrapping_add(sub as u64));
            centroids[sub * k * sub_dim..(sub + 1) * k * sub_dim]
                .copy_from_slice(&sub_centroids);
        }

        Self {
            subspaces,
            centroids_per_subspace: k,
            sub_dim,
            centroids,
        }
    }

    /// Encode a vector as one centroid id per subspace.
    fn encode(&self, vector: &[f32]) -> Vec<u8> {
        let k = self.centroids_per_subspace;
        let mut codes = Vec::with_capacity(self.subspaces);
        for sub in 0..self.subspaces {
            let sub_vec = &vector[sub * self.sub_dim..(sub + 1) * self.sub_dim];
            let base = sub * k * self.sub_dim;
            let sub_centroids = &self.centroids[base..base + k * self.sub_dim];
            codes.push(nearest_centroid(sub_centroids, self.sub_dim, sub_vec) as u8);
        }
        codes
    }

    /// Precompute per-subspace dot products against every centroid, so each
    /// candidate costs `subspaces` table lookups instead of `dim` multiplies.
    fn score_table(&self, query: &[f32]) -> ScoreTable {
        let k = self.centroids_per_subspace;
        let mut table = vec![0.0f32; self.subspaces * k];
        for sub in 0..self.subspaces {
            let q_sub = &query[sub * self.sub_dim..(sub + 1) * self.sub_dim];
            for ci in 0..k {
                let c_start = sub * k * self.sub_dim + ci * self.sub_dim;
                table[sub * k + ci] = dot(q_sub, &self.centroids[c_start..c_start + self.sub_dim]);
            }
        }
        ScoreTable {
            table,
            subspaces: self.subspaces,
            centroids_per_subspace: k,
        }
    }
}

struct ScoreTable {
    table: Vec<f32>,
    subspaces: usize,
    centroids_per_subspace: usize,
}

impl ScoreTable {
    /// Approximate similarity of the query to a PQ-encoded vector.
    #[inline]
    fn score(&self, codes: &[u8]) -> f32 {
        let k = self.centroids_per_subspace;
        let mut sum = 0.0f32;
        for (sub, &code) in codes.iter().enumerate().take(self.subspaces) {
            sum += self.table[sub * k + code as usize];
        }
        sum
    }
}

/// Quantizer state produced by training, absent until `train` succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Quantizer {
    nlist: usize,
    /// Coarse centroids, `nlist * dim` floats.
    centroids: Vec<f32>,
    codebook: PqCodebook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvfIndex {
    dim: usize,
    params: IvfParams,
    quantizer: Option<Quantizer>,
    /// Vector positions per coarse cluster.
    lists: Vec<Vec<u32>>,
    /// PQ codes, `count * subspaces` bytes in insertion order.
    codes: Vec<u8>,
    count: usize,
}

impl IvfIndex {
    pub fn new(dim: usize, params: IvfParams) -> Result<Self, IndexError> {
        if dim == 0 {
            return Err(IndexError::InvalidDimension);
        }
        if params.nlist == 0 {
            return Err(IndexError::InvalidParams("nlist must be at least 1".into()));
        }
        if params.nprobe == 0 {
            return Err(IndexError::InvalidParams(
                "nprobe must be at least 1".into(),
            ));
        }
        if !(1..=8).contains(&params.bits) {
            return Err(IndexError::InvalidParams(format!(
                "bits must be between 1 and 8, got {}",
                params.bits
            )));
        }
        if params.subspaces == 0 || !dim.is_multiple_of(params.subspaces) {
            return Err(IndexError::InvalidParams(format!(
                "subspaces ({}) must divide the vector dimension ({})",
                params.subspaces, dim
            )));
        }
        Ok(Self {
            dim,
            params,
            quantizer: None,
            lists: Vec::new(),
            codes: Vec::new(),
            count: 0,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_trained(&self) -> bool {
        self.quantizer.is_some()
    }

    /// Effective coarse cluster count, once trained.
    pub fn cluster_count(&self) -> Option<usize> {
        self.quantizer.as_ref().map(|q| q.nlist)
    }

    /// Train the coarse quantizer and PQ codebooks. Valid exactly once,
    /// before any vectors are added.
    pub fn train(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        if self.quantizer.is_some() {
            return Err(IndexError::AlreadyTrained);
        }
        if vectors.is_empty() {
            return Err(IndexError::EmptyTrainingSet);
        }
        let data = self.flatten(vectors)?;
        let n = vectors.len();

        let nlist = self
            .params
            .nlist
            .min((n / TRAIN_POINTS_PER_CLUSTER).max(1));
        let centroids = kmeans(&data, self.dim, nlist, TRAIN_SEED);

        let pq_k = (1usize << self.params.bits).min(n);
        let codebook = PqCodebook::train(
            &data,
            self.dim,
            self.params.subspaces,
            pq_k,
            TRAIN_SEED.wrapping_add(1),
        );

        self.lists = vec![Vec::new(); nlist];
        self.quantizer = Some(Quantizer {
            nlist,
            centroids,
            codebook,
        });
        Ok(())
    }

    /// Append vectors at monotonically increasing positions.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        let Some(quantizer) = &self.quantizer else {
            return Err(IndexError::NotTrained);
        };
        let _ = self.flatten(vectors)?;

        for v in vectors {
            let cluster = nearest_centroid(&quantizer.centroids, self.dim, v);
            self.lists[cluster].push(self.count as u32);
            self.codes.extend(quantizer.codebook.encode(v));
            self.count += 1;
        }
        Ok(())
    }

    /// Top-k by descending approximate similarity over the `nprobe` clusters
    /// nearest the query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if self.count == 0 {
            return Err(IndexError::NotPopulated);
        }
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }
        // count > 0 implies a quantizer exists
        let quantizer = self.quantizer.as_ref().ok_or(IndexError::NotTrained)?;

        let mut coarse: Vec<(usize, f32)> = (0..quantizer.nlist)
            .map(|ci| {
                let c = &quantizer.centroids[ci * self.dim..(ci + 1) * self.dim];
                (ci, sq_dist(query, c))
            })
            .collect();
        coarse.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let table = quantizer.codebook.score_table(query);
        let subspaces = self.params.subspaces;

        let mut scored = Vec::new();
        for &(cluster, _) in coarse.iter().take(self.params.nprobe) {
            for &pos in &self.lists[cluster] {
                let pos = pos as usize;
                let codes = &self.codes[pos * subspaces..(pos + 1) * subspaces];
                scored.push((pos, table.score(codes)));
            }
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    fn flatten(&self, vectors: &[Vec<f32>]) -> Result<Vec<f32>, IndexError> {
        let mut data = Vec::with_capacity(vectors.len() * self.dim);
        for v in vectors {
            if v.len() != self.dim {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dim,
                    got: v.len(),
                });
            }
            data.extend_from_slice(v);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> IvfParams {
        IvfParams {
            nlist: 1024,
            nprobe: 8,
            subspaces: 2,
            bits: 8,
        }
    }

    /// Forty 4-d vectors in two well-separated clusters.
    fn clustered_corpus() -> Vec<Vec<f32>> {
        let mut corpus = Vec::new();
        for i in 0..20 {
            let jitter = i as f32 * 0.01;
            corpus.push(vec![1.0 + jitter, 1.0, 0.0, 0.0]);
            corpus.push(vec![0.0, 0.0, 1.0 + jitter, 1.0]);
        }
        corpus
    }

    #[test]
    fn test_subspaces_must_divide_dimension() {
        let bad = IvfParams {
            subspaces: 3,
            ..params()
        };
        assert!(matches!(
            IvfIndex::new(4, bad),
            Err(IndexError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_add_before_train_fails() {
        let mut index = IvfIndex::new(4, params()).unwrap();
        assert!(matches!(
            index.add(&[vec![0.0; 4]]),
            Err(IndexError::NotTrained)
        ));
    }

    #[test]
    fn test_train_twice_fails() {
        let mut index = IvfIndex::new(4, params()).unwrap();
        index.train(&clustered_corpus()).unwrap();
        assert!(matches!(
            index.train(&clustered_corpus()),
            Err(IndexError::AlreadyTrained)
        ));
    }

    #[test]
    fn test_train_empty_fails() {
        let mut index = IvfIndex::new(4, params()).unwrap();
        assert!(matches!(
            index.train(&[]),
            Err(IndexError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_search_before_populate_fails() {
        let mut index = IvfIndex::new(4, params()).unwrap();
        index.train(&clustered_corpus()).unwrap();
        assert!(matches!(
            index.search(&[0.0; 4], 3),
            Err(IndexError::NotPopulated)
        ));
    }

    #[test]
    fn test_cluster_count_clamped_by_corpus_size() {
        let mut index = IvfIndex::new(4, params()).unwrap();
        index.train(&clustered_corpus()).unwrap();
        // 40 training vectors / 10 = at most 4 clusters despite nlist=1024
        assert_eq!(index.cluster_count(), Some(4));
    }

    #[test]
    fn test_search_returns_descending_scores_from_right_cluster() {
        let corpus = clustered_corpus();
        let mut index = IvfIndex::new(4, params()).unwrap();
        index.train(&corpus).unwrap();
        index.add(&corpus).unwrap();

        let results = index.search(&[1.0, 1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        // Even positions hold the first cluster's vectors
        for (pos, _) in &results {
            assert_eq!(pos % 2, 0, "expected a first-cluster vector, got {pos}");
        }
    }

    #[test]
    fn test_positions_monotonic_across_adds() {
        let corpus = clustered_corpus();
        let mut index = IvfIndex::new(4, params()).unwrap();
        index.train(&corpus).unwrap();
        index.add(&corpus[..10]).unwrap();
        index.add(&corpus[10..]).unwrap();
        assert_eq!(index.len(), corpus.len());

        let results = index.search(&[0.0, 0.0, 1.0, 1.0], corpus.len()).unwrap();
        let max_pos = results.iter().map(|r| r.0).max().unwrap();
        assert!(max_pos < corpus.len());
    }
}
