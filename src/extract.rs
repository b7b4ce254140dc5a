//! Text extraction for PDF and scanned-image documents.
//!
//! The [`Extractor`] trait turns a file on disk into page-tagged
//! [`ExtractedSegment`]s. [`FileExtractor`] is the production
//! implementation:
//!
//! | Type | Extensions | Backend | Segments |
//! |------|------------|---------|----------|
//! | PDF | `.pdf` | `pdf-extract` | one per non-empty page, `page` = 1-based page number |
//! | Image | `.png .jpg .jpeg .tiff .tif .bmp` | `tesseract` CLI | one, no page |
//!
//! Segment text is trimmed; pages or images whose text is blank produce no
//! segment. An empty result means "nothing extracted" and is not an error.
//! Anything else (unsupported extension, unreadable file, corrupt PDF,
//! OCR failure) is an [`ExtractError`].

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;

use docsift_core::models::{DocType, ExtractedSegment};

use crate::config::ExtractConfig;

/// Extraction error. The ingest pipeline logs it and skips the document.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedType(String),
    Io(String),
    Pdf(String),
    Ocr(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedType(path) => write!(f, "unsupported file type: {}", path),
            ExtractError::Io(e) => write!(f, "failed to read document: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ocr(e) => write!(f, "OCR failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<ExtractError> for docsift_core::Error {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedType(path) => docsift_core::Error::UnsupportedType(path),
            other => docsift_core::Error::Extraction(other.to_string()),
        }
    }
}

/// Turns a document on disk into page-tagged text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>, ExtractError>;
}

/// Dispatches on file extension to the PDF or OCR backend.
#[derive(Debug, Clone)]
pub struct FileExtractor {
    tesseract_bin: String,
    ocr_language: Option<String>,
}

impl FileExtractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            tesseract_bin: config.tesseract_bin.clone(),
            ocr_language: config.ocr_language.clone(),
        }
    }

    async fn extract_image(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<Vec<ExtractedSegment>, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::Io(format!("{}: not a file", path.display())));
        }

        let mut command = tokio::process::Command::new(&self.tesseract_bin);
        command.arg(path).arg("stdout");
        if let Some(language) = &self.ocr_language {
            command.arg("-l").arg(language);
        }

        let output = command
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExtractError::Ocr(format!("failed to run '{}': {}", self.tesseract_bin, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "'{}' exited with {}: {}",
                self.tesseract_bin,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(image_segment(source, &text).into_iter().collect())
    }
}

#[async_trait]
impl Extractor for FileExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>, ExtractError> {
        let doc_type = DocType::from_path(path)
            .ok_or_else(|| ExtractError::UnsupportedType(path.display().to_string()))?;
        let source = source_name(path);

        match doc_type {
            DocType::Pdf => extract_pdf(path, &source).await,
            DocType::Image => self.extract_image(path, &source).await,
        }
    }
}

/// File name of `path`, used as the record's `source`.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn extract_pdf(path: &Path, source: &str) -> Result<Vec<ExtractedSegment>, ExtractError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))?;

    // pdf-extract is CPU-bound and may panic on malformed input; a panic
    // surfaces here as a JoinError.
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| ExtractError::Pdf(e.to_string()))?
    .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(pdf_segments(source, pages))
}

/// One segment per page with non-blank text, numbered from 1.
pub fn pdf_segments(source: &str, pages: Vec<String>) -> Vec<ExtractedSegment> {
    pages
        .into_iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(ExtractedSegment {
                text: text.to_string(),
                source: source.to_string(),
                doc_type: DocType::Pdf,
                page: Some(i as u32 + 1),
            })
        })
        .collect()
}

fn image_segment(source: &str, text: &str) -> Option<ExtractedSegment> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(ExtractedSegment {
        text: text.to_string(),
        source: source.to_string(),
        doc_type: DocType::Image,
        page: None,
    })
}
