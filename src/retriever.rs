//! Retrieval orchestrator: ingest and query pipelines over one corpus.
//!
//! # Ingest
//!
//! ```text
//! path ─▶ Extractor ─▶ Chunker ─▶ Embedder ─▶ normalize ─▶ Corpus::append ─▶ SnapshotStore::save
//! ```
//!
//! Extraction and embedding run without holding any lock and are bounded by
//! timeouts. The commit step is serialized: the current corpus is copied,
//! the new rows appended to the copy, the copy swapped in, then saved. A
//! failure before the swap leaves the corpus untouched.
//!
//! The copy is a full clone of every vector and record, so each commit
//! costs O(rows × dims) time and briefly doubles corpus memory. That is
//! fine for a single-user corpus of thousands of chunks; a much larger
//! corpus would need a persistent or chunked structure instead.
//!
//! # Query
//!
//! Queries take the corpus that is current when they start and run against
//! it without locking, so a query concurrent with an ingest sees the
//! pre-ingest state.
//!
//! # Persistence failures
//!
//! A failed save is logged and does not roll back the in-memory corpus.
//! Memory and disk then differ until the next successful save
//! ([`IngestReport::persisted`] is `false`; [`Retriever::close`] retries).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use docsift_core::chunk::Chunker;
use docsift_core::context::assemble_context;
use docsift_core::embedding::{normalize, Embedder};
use docsift_core::models::{ChunkRecord, SearchResult};
use docsift_core::store::{resolve_hits, Corpus, IndexedChunk};
use docsift_core::{Error, Result};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::{Extractor, FileExtractor};
use crate::snapshot::{LoadOutcome, SnapshotStore};

/// Results used to build a context, independent of the character budget.
pub const CONTEXT_FAN_OUT: usize = 5;

/// Tunables for a [`Retriever`].
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub chunker: Chunker,
    pub extract_timeout: Duration,
    pub embed_timeout: Duration,
    pub embed_batch_size: usize,
    pub top_k: usize,
    pub max_context_length: usize,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            chunker: Chunker::default(),
            extract_timeout: Duration::from_secs(120),
            embed_timeout: Duration::from_secs(120),
            embed_batch_size: 64,
            top_k: 5,
            max_context_length: 2000,
        }
    }
}

impl RetrieverSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            chunker: Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?,
            extract_timeout: Duration::from_secs(config.extract.timeout_secs),
            embed_timeout: Duration::from_secs(config.embedding.call_timeout_secs),
            embed_batch_size: config.embedding.batch_size.max(1),
            top_k: config.retrieval.top_k,
            max_context_length: config.retrieval.max_context_length,
        })
    }
}

/// What one successful ingest added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source: String,
    /// Extracted segments with text (pages for PDFs).
    pub segments: usize,
    pub chunks_added: usize,
    /// Whether the snapshot on disk reflects this ingest.
    pub persisted: bool,
}

/// Point-in-time summary of the corpus.
#[derive(Debug, Clone)]
pub struct RetrieverStats {
    pub rows: usize,
    pub dims: usize,
    pub model: String,
    pub sources: BTreeMap<String, usize>,
    pub load_outcome: LoadOutcome,
}

/// Owns the corpus and every collaborator needed to grow and query it.
pub struct Retriever {
    extractor: Arc<dyn Extractor>,
    embedder: Arc<dyn Embedder>,
    snapshot: SnapshotStore,
    settings: RetrieverSettings,
    corpus: RwLock<Arc<Corpus>>,
    commit: Mutex<()>,
    dirty: AtomicBool,
    load_outcome: LoadOutcome,
}

impl Retriever {
    /// Build the configured extractor, embedder and snapshot store, then
    /// load the snapshot.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let extractor = Arc::new(FileExtractor::new(&config.extract));
        let embedder = create_embedder(&config.embedding)?;
        let snapshot = SnapshotStore::from_config(&config.snapshot);
        let settings = RetrieverSettings::from_config(config)?;

        let retriever = tokio::task::spawn_blocking(move || {
            Self::with_parts(extractor, embedder, snapshot, settings)
        })
        .await?;
        Ok(retriever)
    }

    /// Assemble a retriever from explicit parts and load the snapshot.
    pub fn with_parts(
        extractor: Arc<dyn Extractor>,
        embedder: Arc<dyn Embedder>,
        snapshot: SnapshotStore,
        settings: RetrieverSettings,
    ) -> Self {
        let (corpus, load_outcome) = snapshot.load(embedder.dims());
        match &load_outcome {
            LoadOutcome::Fresh => info!("no snapshot found, starting with an empty corpus"),
            LoadOutcome::Restored { rows } => info!(rows, "snapshot restored"),
            LoadOutcome::Recovered { reason } => warn!(
                %reason,
                index = %snapshot.index_path().display(),
                store = %snapshot.store_path().display(),
                "snapshot unusable, starting with an empty corpus"
            ),
        }

        Self {
            extractor,
            embedder,
            snapshot,
            settings,
            corpus: RwLock::new(Arc::new(corpus)),
            commit: Mutex::new(()),
            dirty: AtomicBool::new(false),
            load_outcome,
        }
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn settings(&self) -> &RetrieverSettings {
        &self.settings
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    pub fn stats(&self) -> RetrieverStats {
        let corpus = self.current();
        RetrieverStats {
            rows: corpus.len(),
            dims: corpus.dims(),
            model: self.embedder.model_name().to_string(),
            sources: corpus.source_counts(),
            load_outcome: self.load_outcome.clone(),
        }
    }

    /// Ingest a document, reporting failure as `false`.
    ///
    /// Unsupported types, extraction and embedding failures, and documents
    /// with no text are logged and leave the corpus unchanged.
    pub async fn add_document(&self, path: &Path) -> bool {
        match self.ingest(path).await {
            Ok(report) => {
                info!(
                    source = %report.source,
                    chunks = report.chunks_added,
                    persisted = report.persisted,
                    "document added"
                );
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "document not added");
                false
            }
        }
    }

    /// Ingest a document and report what was added.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedType`], [`Error::Extraction`],
    /// [`Error::EmptyResult`] or [`Error::Embedding`]. In every error case
    /// the corpus is unchanged. A failed save is not an error; see
    /// [`IngestReport::persisted`].
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let segments = tokio::time::timeout(self.settings.extract_timeout, self.extractor.extract(path))
            .await
            .map_err(|_| {
                Error::Extraction(format!(
                    "{}: timed out after {:?}",
                    path.display(),
                    self.settings.extract_timeout
                ))
            })??;

        let segments: Vec<_> = segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        if segments.is_empty() {
            return Err(Error::EmptyResult(format!(
                "no text extracted from {}",
                path.display()
            )));
        }

        let origin = path.display().to_string();
        let mut records: Vec<ChunkRecord> = Vec::new();
        for segment in &segments {
            for (i, text) in self.settings.chunker.chunk(&segment.text).into_iter().enumerate() {
                records.push(ChunkRecord::from_segment(segment, text, i, &origin));
            }
        }
        if records.is_empty() {
            return Err(Error::EmptyResult(format!(
                "no chunks produced from {}",
                path.display()
            )));
        }
        debug!(
            path = %path.display(),
            segments = segments.len(),
            chunks = records.len(),
            "chunked document"
        );

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embed_all(&texts).await?;

        let source = records[0].source.clone();
        let chunks: Vec<IndexedChunk> = vectors
            .into_iter()
            .zip(records)
            .map(|(vector, record)| IndexedChunk { vector, record })
            .collect();
        let chunks_added = chunks.len();

        let persisted = self.commit(chunks).await?;

        Ok(IngestReport {
            source,
            segments: segments.len(),
            chunks_added,
            persisted,
        })
    }

    /// Top `top_k` results for `query`, best first.
    ///
    /// Returns an empty list for an empty corpus or when the query cannot
    /// be embedded.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        match self.try_search(query, top_k, None).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Like [`search`](Self::search), surfacing errors, optionally scoped
    /// to chunks from one source document.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when `source` names no indexed document;
    /// [`Error::Embedding`] when the query cannot be embedded.
    pub async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        source: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let corpus = self.current();
        match source {
            Some(source) if !corpus.has_source(source) => {
                return Err(Error::NotFound(format!("document: {}", source)));
            }
            None if corpus.is_empty() => return Ok(Vec::new()),
            _ => {}
        }

        let vector = self.embed_query(query).await?;
        let hits = corpus.search_hits(&vector, top_k, source)?;
        let results = resolve_hits(&hits, corpus.store());
        if results.len() < hits.len() {
            warn!(
                skipped = hits.len() - results.len(),
                rows = corpus.len(),
                "skipped search hits outside the document store"
            );
        }
        Ok(results)
    }

    /// Provenance-tagged context for `query`, at most `max_length`
    /// characters long.
    pub async fn get_context(&self, query: &str, max_length: usize) -> String {
        let results = self.search(query, CONTEXT_FAN_OUT).await;
        assemble_context(&results, max_length)
    }

    /// Save the current corpus.
    pub async fn flush(&self) -> Result<()> {
        let _guard = self.commit.lock().await;
        self.persist(self.current()).await?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Shut down, saving first if an earlier save failed.
    pub async fn close(self) -> Result<()> {
        if self.dirty.load(Ordering::SeqCst) {
            self.flush().await?;
        }
        Ok(())
    }

    fn current(&self) -> Arc<Corpus> {
        self.corpus
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append `chunks` as one unit and save. Returns whether the save
    /// succeeded.
    async fn commit(&self, chunks: Vec<IndexedChunk>) -> Result<bool> {
        let _guard = self.commit.lock().await;

        let mut next = Corpus::clone(&self.current());
        next.append(chunks)?;
        let next = Arc::new(next);
        *self.corpus.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);

        match self.persist(next).await {
            Ok(()) => {
                self.dirty.store(false, Ordering::SeqCst);
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "snapshot save failed; in-memory corpus is ahead of disk");
                self.dirty.store(true, Ordering::SeqCst);
                Ok(false)
            }
        }
    }

    async fn persist(&self, corpus: Arc<Corpus>) -> Result<()> {
        let snapshot = self.snapshot.clone();
        tokio::task::spawn_blocking(move || snapshot.save(&corpus))
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_all(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("empty embedding response".to_string()))
    }

    /// Embed `texts` in batches, checking shape and normalizing each vector.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let dims = self.embedder.dims();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.settings.embed_batch_size) {
            let embedded = tokio::time::timeout(self.settings.embed_timeout, self.embedder.embed(batch))
                .await
                .map_err(|_| {
                    Error::Embedding(format!(
                        "timed out after {:?}",
                        self.settings.embed_timeout
                    ))
                })??;

            if embedded.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            for mut vector in embedded {
                if vector.len() != dims {
                    return Err(Error::Embedding(format!(
                        "expected {} dims, got {}",
                        dims,
                        vector.len()
                    )));
                }
                normalize(&mut vector);
                vectors.push(vector);
            }
        }

        Ok(vectors)
    }
}
