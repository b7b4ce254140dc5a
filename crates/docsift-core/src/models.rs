//! Core data models shared by ingestion and retrieval.
//!
//! A [`ChunkRecord`] is immutable once created. Its identity is its row
//! position: record `n` in the [`DocumentStore`](crate::store::DocumentStore)
//! describes vector `n` in the [`VectorIndex`](crate::index::VectorIndex).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// File extensions routed to the OCR extractor.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

/// Kind of source document a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Pdf,
    Image,
}

impl DocType {
    /// Classify a path by its (case-insensitive) extension.
    ///
    /// Returns `None` for anything that is neither a PDF nor a supported
    /// raster image, e.g. `.docx`.
    ///
    /// ```rust
    /// use docsift_core::models::DocType;
    /// use std::path::Path;
    ///
    /// assert_eq!(DocType::from_path(Path::new("scan.JPG")), Some(DocType::Image));
    /// assert_eq!(DocType::from_path(Path::new("report.docx")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == "pdf" {
            Some(DocType::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocType::Image)
        } else {
            None
        }
    }
}

/// A run of text produced by an extractor, tagged with where it came from.
///
/// PDFs yield one segment per non-empty page; images yield a single
/// segment without a page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSegment {
    pub text: String,
    /// File name of the source document (no directory).
    pub source: String,
    pub doc_type: DocType,
    /// 1-based page number, when the format has pages.
    pub page: Option<u32>,
}

/// One indexed chunk of document text plus its provenance.
///
/// Serialized field names follow the persisted record schema:
/// `{text, source, type, chunk_id, file_path, page?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    /// Sequence number of this chunk within its segment, starting at 0.
    #[serde(rename = "chunk_id")]
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Path the document was ingested from.
    #[serde(rename = "file_path")]
    pub origin_path: String,
}

impl ChunkRecord {
    /// Build the record for chunk `chunk_index` of `segment`.
    pub fn from_segment(
        segment: &ExtractedSegment,
        text: String,
        chunk_index: usize,
        origin_path: &str,
    ) -> Self {
        Self {
            text,
            source: segment.source.clone(),
            doc_type: segment.doc_type,
            chunk_index,
            page: segment.page,
            origin_path: origin_path.to_string(),
        }
    }
}

/// A chunk returned from a query, with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub chunk: ChunkRecord,
    /// Inner product of the normalized query and chunk vectors.
    pub relevance_score: f32,
}
