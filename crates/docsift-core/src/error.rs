//! Error taxonomy shared by the core and the application crate.

use thiserror::Error;

/// Result type alias for docsift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting or retrieving documents.
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be read or its text could not be extracted.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// No extractor handles this file type.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The embedding gateway failed or returned malformed vectors.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Extraction or chunking produced no text to index.
    #[error("nothing to index: {0}")]
    EmptyResult(String),

    /// Writing or reading the snapshot failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// A named document or source does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row lookup fell outside the document store.
    #[error("row {row} out of range for {count} rows")]
    IndexRange { row: usize, count: usize },

    /// A vector does not have the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index rows and document records disagree in count.
    #[error("index has {vectors} rows but store has {records} records")]
    Misaligned { vectors: usize, records: usize },

    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
