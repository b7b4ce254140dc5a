//! Exact inner-product vector index.
//!
//! Rows are stored contiguously in one row-major `Vec<f32>` in append
//! order and are never reordered or removed. Search is brute force over
//! every row, which keeps results exact and reproducible.
//!
//! Vectors must be normalized by the caller when cosine similarity is
//! wanted; the index only computes inner products.

use std::cmp::Ordering;

use crate::embedding::inner_product;
use crate::{Error, Result};

/// A single nearest-neighbour match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Row position in append order.
    pub row: usize,
    /// Inner product between the query and the row.
    pub score: f32,
}

/// Descending score, then ascending row. A total order, so ranking is
/// identical across calls.
fn rank(a: &Hit, b: &Hit) -> Ordering {
    b.score.total_cmp(&a.score).then(a.row.cmp(&b.row))
}

/// Append-only flat index over fixed-dimension vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dims: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index. `dims` is clamped to at least 1.
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            data: Vec::new(),
        }
    }

    /// Rebuild an index from row-major data, e.g. a decoded snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `dims` is zero or `data` does not
    /// hold a whole number of rows.
    pub fn from_flat(dims: usize, data: Vec<f32>) -> Result<Self> {
        if dims == 0 {
            return Err(Error::InvalidInput("index dims must be > 0".to_string()));
        }
        if data.len() % dims != 0 {
            return Err(Error::InvalidInput(format!(
                "{} values do not form whole rows of {} dims",
                data.len(),
                dims
            )));
        }
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len() / self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All rows, row-major.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Append rows in input order.
    ///
    /// Every vector is checked before any is appended, so a dimension
    /// error leaves the index unchanged.
    pub fn insert_many(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dims) {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: bad.len(),
            });
        }
        self.data.reserve(vectors.len() * self.dims);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Return the `min(k, len)` rows most similar to `query`.
    ///
    /// Results are ordered by descending score; equal scores are ordered by
    /// lowest row first. An empty index yields an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        self.search_filtered(query, k, |_| true)
    }

    /// Like [`search`](Self::search), restricted to rows for which `keep`
    /// returns true.
    pub fn search_filtered<F>(&self, query: &[f32], k: usize, keep: F) -> Result<Vec<Hit>>
    where
        F: Fn(usize) -> bool,
    {
        if query.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Hit> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .filter(|(row, _)| keep(*row))
            .map(|(row, vector)| Hit {
                row,
                score: inner_product(query, vector),
            })
            .collect();

        let k = k.min(hits.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank);
            hits.truncate(k);
        }
        hits.sort_by(rank);
        Ok(hits)
    }
}
