//! Durable snapshot of the corpus.
//!
//! A snapshot is two files written side by side:
//!
//! | Artifact | Default path | Content |
//! |----------|--------------|---------|
//! | index blob | `data/index.bin` | vectors, row-major little-endian `f32` |
//! | record list | `data/store.json` | chunk records, in row order |
//!
//! Index blob layout:
//!
//! ```text
//! "DSIX" | version u32 | dims u32 | rows u64 | generation [u8; 16] | rows × dims × f32 | sha256 [u8; 32]
//! ```
//!
//! The record list is `{ "generation", "saved_at", "dims", "records": [...] }`.
//! Both artifacts carry the same random generation id, so a crash between
//! the two renames is detected on load as a generation mismatch. Each file
//! is written to a temp file in the target directory and renamed into
//! place.
//!
//! # Loading
//!
//! [`SnapshotStore::load`] never fails. Missing or unusable artifacts yield
//! an empty corpus and a [`LoadOutcome`] saying why; prior data is then
//! lost at the next save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use docsift_core::embedding::{blob_to_vec, vec_to_blob};
use docsift_core::index::VectorIndex;
use docsift_core::models::ChunkRecord;
use docsift_core::store::{Corpus, DocumentStore};

use crate::config::SnapshotConfig;

const INDEX_MAGIC: &[u8; 4] = b"DSIX";
const INDEX_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 16;
const DIGEST_LEN: usize = 32;

/// How the corpus was obtained at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No snapshot existed; started empty.
    Fresh,
    /// Both artifacts loaded and agreed.
    Restored { rows: usize },
    /// A snapshot existed but could not be used; started empty.
    Recovered { reason: String },
}

impl LoadOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, LoadOutcome::Recovered { .. })
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Fresh => write!(f, "fresh"),
            LoadOutcome::Restored { rows } => write!(f, "restored {} rows", rows),
            LoadOutcome::Recovered { reason } => write!(f, "recovered empty ({})", reason),
        }
    }
}

/// Reasons a snapshot cannot be used.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{0} is missing")]
    Missing(&'static str),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("index blob truncated ({0} bytes)")]
    Truncated(usize),
    #[error("index blob has bad magic")]
    BadMagic,
    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u32),
    #[error("index checksum mismatch")]
    Checksum,
    #[error("snapshot dims {found} do not match embedder dims {expected}")]
    Dims { expected: usize, found: usize },
    #[error("index and record list come from different saves")]
    GenerationMismatch,
    #[error("record list is not valid: {0}")]
    Records(#[from] serde_json::Error),
    #[error(transparent)]
    Corpus(#[from] docsift_core::Error),
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    generation: Uuid,
    saved_at: DateTime<Utc>,
    dims: usize,
    records: &'a [ChunkRecord],
}

#[derive(Deserialize)]
struct StoreFile {
    generation: Uuid,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    dims: usize,
    records: Vec<ChunkRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoreFormat {
    Snapshot(StoreFile),
    /// Bare record array without generation or dims.
    Legacy(Vec<ChunkRecord>),
}

/// Reads and writes the two snapshot artifacts.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    index_path: PathBuf,
    store_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(index_path: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            store_path: store_path.into(),
        }
    }

    pub fn from_config(config: &SnapshotConfig) -> Self {
        Self::new(&config.index_path, &config.store_path)
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Write both artifacts under a fresh generation id.
    ///
    /// # Errors
    ///
    /// Returns [`docsift_core::Error::Persistence`] on any I/O or encoding
    /// failure. Whichever artifact was already renamed stays in place; the
    /// generation check rejects the pair on the next load.
    pub fn save(&self, corpus: &Corpus) -> docsift_core::Result<()> {
        let generation = Uuid::new_v4();

        let records = serde_json::to_vec_pretty(&StoreFileRef {
            generation,
            saved_at: Utc::now(),
            dims: corpus.dims(),
            records: corpus.store().records(),
        })
        .map_err(|e| persistence_error(&self.store_path, e))?;
        let blob = encode_index(corpus.index(), generation);

        write_atomic(&self.index_path, &blob).map_err(|e| persistence_error(&self.index_path, e))?;
        write_atomic(&self.store_path, &records)
            .map_err(|e| persistence_error(&self.store_path, e))?;
        Ok(())
    }

    /// Load the corpus for an embedder producing `dims`-wide vectors.
    pub fn load(&self, dims: usize) -> (Corpus, LoadOutcome) {
        match self.try_load(dims) {
            Ok(Some(corpus)) => {
                let rows = corpus.len();
                (corpus, LoadOutcome::Restored { rows })
            }
            Ok(None) => (Corpus::new(dims), LoadOutcome::Fresh),
            Err(e) => (
                Corpus::new(dims),
                LoadOutcome::Recovered {
                    reason: e.to_string(),
                },
            ),
        }
    }

    fn try_load(&self, dims: usize) -> Result<Option<Corpus>, SnapshotError> {
        match (self.index_path.exists(), self.store_path.exists()) {
            (false, false) => return Ok(None),
            (false, true) => return Err(SnapshotError::Missing("index blob")),
            (true, false) => return Err(SnapshotError::Missing("record list")),
            (true, true) => {}
        }

        let blob = read(&self.index_path)?;
        let (generation, index) = decode_index(&blob)?;
        if index.dims() != dims {
            return Err(SnapshotError::Dims {
                expected: dims,
                found: index.dims(),
            });
        }

        let records = match serde_json::from_slice::<StoreFormat>(&read(&self.store_path)?)? {
            StoreFormat::Snapshot(file) => {
                if file.generation != generation {
                    return Err(SnapshotError::GenerationMismatch);
                }
                if file.dims != dims {
                    return Err(SnapshotError::Dims {
                        expected: dims,
                        found: file.dims,
                    });
                }
                file.records
            }
            StoreFormat::Legacy(records) => records,
        };

        let corpus = Corpus::from_parts(index, DocumentStore::from_records(records))?;
        Ok(Some(corpus))
    }
}

fn persistence_error(path: &Path, err: impl fmt::Display) -> docsift_core::Error {
    docsift_core::Error::Persistence(format!("{}: {}", path.display(), err))
}

fn read(path: &Path) -> Result<Vec<u8>, SnapshotError> {
    std::fs::read(path).map_err(|source| SnapshotError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Write `bytes` to `path` via a synced temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn encode_index(index: &VectorIndex, generation: Uuid) -> Vec<u8> {
    let data = vec_to_blob(index.as_flat());
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + DIGEST_LEN);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_VERSION.to_le_bytes());
    out.extend_from_slice(&(index.dims() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    out.extend_from_slice(generation.as_bytes());
    out.extend_from_slice(&data);
    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    out
}

fn decode_index(blob: &[u8]) -> Result<(Uuid, VectorIndex), SnapshotError> {
    if blob.len() < HEADER_LEN + DIGEST_LEN {
        return Err(SnapshotError::Truncated(blob.len()));
    }
    let (body, digest) = blob.split_at(blob.len() - DIGEST_LEN);
    if Sha256::digest(body).as_slice() != digest {
        return Err(SnapshotError::Checksum);
    }
    if &body[0..4] != INDEX_MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let version = u32::from_le_bytes(word(&body[4..8]));
    if version != INDEX_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let dims = u32::from_le_bytes(word(&body[8..12])) as usize;
    let mut rows_bytes = [0u8; 8];
    rows_bytes.copy_from_slice(&body[12..20]);
    let rows = u64::from_le_bytes(rows_bytes) as usize;
    let mut generation = [0u8; 16];
    generation.copy_from_slice(&body[20..36]);

    let data = &body[HEADER_LEN..];
    let expected = rows
        .checked_mul(dims)
        .and_then(|n| n.checked_mul(4))
        .ok_or(SnapshotError::Truncated(blob.len()))?;
    if data.len() != expected {
        return Err(SnapshotError::Truncated(blob.len()));
    }

    let index = VectorIndex::from_flat(dims, blob_to_vec(data))?;
    Ok((Uuid::from_bytes(generation), index))
}

fn word(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(bytes);
    out
}
