//! Configuration parsing and validation.
//!
//! docsift is configured via a TOML file (default: `config/docsift.toml`).
//! Every section and key is optional; when the file does not exist at all
//! the built-in defaults are used. A file that exists but does not parse
//! or fails validation is an error.
//!
//! # Example Configuration
//!
//! ```toml
//! [snapshot]
//! index_path = "data/index.bin"
//! store_path = "data/store.json"
//!
//! [chunking]
//! chunk_size = 500
//! overlap = 50
//!
//! [retrieval]
//! top_k = 5
//! max_context_length = 2000
//!
//! [embedding]
//! provider = "local"          # "hash", "local", "openai" or "ollama"
//! model = "all-minilm-l6-v2"
//! batch_size = 64
//!
//! [extract]
//! timeout_secs = 120
//! tesseract_bin = "tesseract"
//!
//! [server]
//! bind = "127.0.0.1:5001"
//! upload_dir = "uploads"
//! ```
//!
//! `config/docsift.example.toml` lists every key.
//!
//! # Validation
//!
//! [`load_config`] rejects:
//! - `chunking.chunk_size == 0` or `chunking.overlap >= chunking.chunk_size`
//! - `retrieval.top_k < 1`
//! - `embedding.dims == 0` or `embedding.batch_size == 0`
//! - `embedding.model` / `embedding.dims` missing for the `openai` and `ollama` providers
//! - unknown embedding providers

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docsift_core::chunk::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

/// Embedding providers accepted in `[embedding].provider`.
pub const EMBEDDING_PROVIDERS: &[&str] = &["hash", "local", "openai", "ollama"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the two snapshot artifacts live.
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            store_path: default_store_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/index.bin")
}
fn default_store_path() -> PathBuf {
    PathBuf::from("data/store.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results returned by `search` when the caller gives no `top_k`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Character budget used by `context` when the caller gives none.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_length: default_max_context_length(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_context_length() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request HTTP timeout for remote providers.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on one embedding call made during ingest or query,
    /// retries included.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    if cfg!(feature = "local-embeddings-fastembed") {
        "local".to_string()
    } else {
        "hash".to_string()
    }
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_call_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Upper bound on extracting one document.
    #[serde(default = "default_extract_timeout_secs")]
    pub timeout_secs: u64,
    /// OCR executable invoked for image documents.
    #[serde(default = "default_tesseract_bin")]
    pub tesseract_bin: String,
    /// Tesseract language code(s), e.g. `"eng"` or `"eng+deu"`.
    #[serde(default)]
    pub ocr_language: Option<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extract_timeout_secs(),
            tesseract_bin: default_tesseract_bin(),
            ocr_language: None,
        }
    }
}

fn default_extract_timeout_secs() -> u64 {
    120
}
fn default_tesseract_bin() -> String {
    "tesseract".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Uploaded documents are kept under `<upload_dir>/<uuid>/<file name>`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5001".to_string()
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Config {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        // Validate chunking
        if self.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            anyhow::bail!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap,
                self.chunking.chunk_size
            );
        }

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        // Validate embedding
        let embedding = &self.embedding;
        if !EMBEDDING_PROVIDERS.contains(&embedding.provider.as_str()) {
            anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be one of: {}.",
                embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            );
        }
        if embedding.dims == Some(0) {
            anyhow::bail!("embedding.dims must be > 0");
        }
        if embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
        if matches!(embedding.provider.as_str(), "openai" | "ollama") {
            if embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    embedding.provider
                );
            }
            if embedding.dims.is_none() {
                anyhow::bail!(
                    "embedding.dims must be specified when provider is '{}'",
                    embedding.provider
                );
            }
        }

        Ok(())
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_context_length, 2000);
        assert_eq!(config.snapshot.index_path, PathBuf::from("data/index.bin"));
        assert_eq!(config.server.bind, "127.0.0.1:5001");
        assert_eq!(config.extract.tesseract_bin, "tesseract");
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
[chunking]
chunk_size = 800

[embedding]
provider = "hash"
dims = 64
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.embedding.dims, Some(64));
        assert_eq!(config.embedding.batch_size, 64);
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_chunk_size() {
        let err = parse_config("[chunking]\nchunk_size = 100\noverlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[embedding]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_remote_provider_requires_model_and_dims() {
        assert!(parse_config("[embedding]\nprovider = \"openai\"\ndims = 1536\n").is_err());
        assert!(parse_config("[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\n").is_err());
        assert!(parse_config(
            "[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\ndims = 768\n"
        )
        .is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../config/docsift.example.toml")).unwrap();
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.embedding.call_timeout_secs, 120);
        assert_eq!(config.server.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("docsift.toml");
        std::fs::write(&path, "[chunking\nchunk_size = ").unwrap();
        assert!(load_config(&path).is_err());
    }
}
