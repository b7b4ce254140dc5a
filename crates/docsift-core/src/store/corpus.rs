use std::collections::BTreeMap;

use crate::index::{Hit, VectorIndex};
use crate::models::{ChunkRecord, SearchResult};
use crate::{Error, Result};

use super::DocumentStore;

/// A chunk record paired with its embedding, ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub vector: Vec<f32>,
    pub record: ChunkRecord,
}

/// A [`VectorIndex`] and [`DocumentStore`] that always hold the same
/// number of rows.
#[derive(Debug, Clone)]
pub struct Corpus {
    index: VectorIndex,
    store: DocumentStore,
}

impl Corpus {
    /// An empty corpus for vectors of `dims` entries.
    pub fn new(dims: usize) -> Self {
        Self {
            index: VectorIndex::new(dims),
            store: DocumentStore::new(),
        }
    }

    /// Pair a previously persisted index and store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Misaligned`] if the row counts differ.
    pub fn from_parts(index: VectorIndex, store: DocumentStore) -> Result<Self> {
        if index.len() != store.len() {
            return Err(Error::Misaligned {
                vectors: index.len(),
                records: store.len(),
            });
        }
        Ok(Self { index, store })
    }

    pub fn dims(&self) -> usize {
        self.index.dims()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Append chunks to both sides, preserving input order.
    ///
    /// Returns the number of rows added. On error nothing is appended.
    pub fn append(&mut self, chunks: Vec<IndexedChunk>) -> Result<usize> {
        let added = chunks.len();
        let (vectors, records): (Vec<Vec<f32>>, Vec<ChunkRecord>) = chunks
            .into_iter()
            .map(|chunk| (chunk.vector, chunk.record))
            .unzip();

        self.index.insert_many(&vectors)?;
        self.store.append(records);

        debug_assert_eq!(self.index.len(), self.store.len());
        Ok(added)
    }

    /// Whether any record came from `source`.
    pub fn has_source(&self, source: &str) -> bool {
        self.store.iter().any(|r| r.source == source)
    }

    /// Top-`k` rows most similar to `query`, best first, optionally
    /// restricted to records from one source document.
    ///
    /// Resolve the hits with [`resolve_hits`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `source` is given and no record has it.
    pub fn search_hits(&self, query: &[f32], k: usize, source: Option<&str>) -> Result<Vec<Hit>> {
        match source {
            None => self.index.search(query, k),
            Some(source) => {
                if !self.has_source(source) {
                    return Err(Error::NotFound(format!("document: {}", source)));
                }
                self.index.search_filtered(query, k, |row| {
                    self.store
                        .get(row)
                        .map(|r| r.source == source)
                        .unwrap_or(false)
                })
            }
        }
    }

    /// Number of chunks per source document.
    pub fn source_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.store.iter() {
            *counts.entry(record.source.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Turn index hits into search results, in hit order.
///
/// Hits whose row has no record are skipped.
pub fn resolve_hits(hits: &[Hit], store: &DocumentStore) -> Vec<SearchResult> {
    hits.iter()
        .filter_map(|hit| {
            store.get(hit.row).ok().map(|record| SearchResult {
                chunk: record.clone(),
                relevance_score: hit.score,
            })
        })
        .collect()
}
