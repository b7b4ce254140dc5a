//! # docsift-core
//!
//! Runtime-free building blocks for document retrieval.
//!
//! This crate holds the pure parts of the pipeline: data models, the text
//! chunker, the [`Embedder`](embedding::Embedder) trait with a deterministic
//! hashing backend, the exact vector index, the row-aligned document store
//! and context assembly. It performs no file, network or process I/O; the
//! `docsift` app crate supplies extraction, model-backed embedders,
//! persistence and the CLI/HTTP surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `DocType`, `ExtractedSegment`, `ChunkRecord`, `SearchResult` |
//! | [`chunk`] | Overlapping sentence-aware chunking |
//! | [`embedding`] | `Embedder` trait, `HashEmbedder`, vector helpers |
//! | [`index`] | Exact inner-product `VectorIndex` |
//! | [`store`] | `DocumentStore` and the paired `Corpus` |
//! | [`context`] | Budgeted context block assembly |
//! | [`error`] | Crate error type |

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod store;

pub use error::{Error, Result};
