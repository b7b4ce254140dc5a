//! Document store and the paired index/store corpus.
//!
//! The [`DocumentStore`] is an ordered list of [`ChunkRecord`]s whose
//! positions match the rows of a [`VectorIndex`](crate::index::VectorIndex).
//! [`Corpus`] owns one of each and is the only place where both are
//! mutated, so the row alignment holds by construction:
//!
//! ```text
//! row:     0        1        2        ...
//! index:   [f32;D]  [f32;D]  [f32;D]
//! store:   record   record   record
//! ```

mod corpus;

pub use corpus::*;

use crate::models::ChunkRecord;
use crate::{Error, Result};

/// Append-only list of chunk records, addressed by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStore {
    records: Vec<ChunkRecord>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ChunkRecord>) -> Self {
        Self { records }
    }

    /// Append records in input order.
    pub fn append(&mut self, records: Vec<ChunkRecord>) {
        self.records.extend(records);
    }

    /// Fetch the record at `row`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexRange`] if `row >= len()`.
    pub fn get(&self, row: usize) -> Result<&ChunkRecord> {
        self.records.get(row).ok_or(Error::IndexRange {
            row,
            count: self.records.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }
}
