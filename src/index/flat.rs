//! Exact (brute-force) inner-product index.
//!
//! Fallback mode for small corpora or recall-sensitive workloads; the
//! primary target is the IVF-PQ index in `ivf.rs`.

use serde::{Deserialize, Serialize};

use super::kmeans::dot;
use crate::error::IndexError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    /// Contiguous arena, `count * dim` floats in insertion order.
    vectors: Vec<f32>,
    count: usize,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Result<Self, IndexError> {
        if dim == 0 {
            return Err(IndexError::InvalidDimension);
        }
        Ok(Self {
            dim,
            vectors: Vec::new(),
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

    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        for v in vectors {
            if v.len() != self.dim {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dim,
                    got: v.len(),
                });
            }
        }
        for v in vectors {
            self.vectors.extend_from_slice(v);
            self.count += 1;
        }
        Ok(())
    }

    /// Exact top-k by descending dot-product similarity.
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

        let mut scored: Vec<(usize, f32)> = (0..self.count)
            .map(|i| {
                let v = &self.vectors[i * self.dim..(i + 1) * self.dim];
                (i, dot(query, v))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            FlatIndex::new(0),
            Err(IndexError::InvalidDimension)
        ));
    }

    #[test]
    fn test_search_empty_index_fails() {
        let index = FlatIndex::new(4).unwrap();
        assert!(matches!(
            index.search(&[0.0; 4], 3),
            Err(IndexError::NotPopulated)
        ));
    }

    #[test]
    fn test_dimension_mismatch_on_add() {
        let mut index = FlatIndex::new(4).unwrap();
        let err = index.add(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 4,
                got: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_self_query_is_top_ranked() {
        // Ten orthogonal passages; querying with passage 3's vector must
        // return position 3 with the maximal score.
        let mut index = FlatIndex::new(10).unwrap();
        let corpus: Vec<Vec<f32>> = (0..10).map(|i| unit(10, i)).collect();
        index.add(&corpus).unwrap();

        let results = index.search(&corpus[3], 5).unwrap();
        assert_eq!(results[0].0, 3);
        assert!(results[0].1 >= results.iter().map(|r| r.1).fold(f32::MIN, f32::max));
    }

    #[test]
    fn test_scores_descend() {
        let mut index = FlatIndex::new(2).unwrap();
        index
            .add(&[
                vec![1.0, 0.0],
                vec![0.8, 0.2],
                vec![0.0, 1.0],
                vec![0.5, 0.5],
            ])
            .unwrap();

        let results = index.search(&[1.0, 0.0], 4).unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_truncates_to_k() {
        let mut index = FlatIndex::new(2).unwrap();
        index
            .add(&(0..8).map(|i| vec![i as f32, 1.0]).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 3).unwrap().len(), 3);
    }
}
