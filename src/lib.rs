//! # docsift
//!
//! Retrieval over PDFs and scanned images.
//!
//! docsift extracts page-tagged text from PDFs and OCR'd images, splits it
//! into overlapping character windows, embeds each window, and keeps the
//! vectors and their metadata side by side in a persisted flat index. Queries
//! return the nearest chunks or a length-bounded context block.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────────┐
//! │ Extractor │──▶│ Chunker  │──▶│ Embedder │──▶│ Corpus           │
//! │ PDF / OCR │   │ (core)   │   │          │   │ index + records  │
//! └───────────┘   └──────────┘   └──────────┘   └────────┬─────────┘
//!                                                        │ snapshot
//!                        ┌───────────────────────────────┤
//!                        ▼                               ▼
//!                   ┌──────────┐                    ┌──────────┐
//!                   │   CLI    │                    │   HTTP   │
//!                   │(docsift) │                    │  (axum)  │
//!                   └──────────┘                    └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and image text extraction |
//! | [`embedding`] | Embedding provider selection and remote backends |
//! | [`snapshot`] | Index and record-list persistence |
//! | [`retriever`] | Ingest, search and context orchestration |
//! | [`server`] | HTTP transport |
//! | [`stats`] | Corpus summary |
//!
//! Chunking, the vector index, the document store and context assembly live
//! in the `docsift-core` crate.

pub mod config;
pub mod embedding;
pub mod extract;
pub mod retriever;
pub mod server;
pub mod snapshot;
pub mod stats;
