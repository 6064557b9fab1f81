//! Library entry point for ingestion runs
//!
//! A [`CodebaseIndexer`] is constructed once per process with its index and
//! embedder, then passed to whoever needs it. There is no global handle.

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedManager};
use crate::error::IndexError;
use crate::git::SourceRevision;
use crate::indexer::{ChunkPipeline, ChunkRun, FileWalker};
use crate::sync::{IndexSynchronizer, SyncMode, SyncReport};
use crate::vector_db::{LanceIndex, VectorIndex};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub root: String,
    pub files_seen: usize,
    pub files_skipped_empty: usize,
    pub files_failed: usize,
    pub files_skipped_oversized: usize,
    pub chunks: usize,
    pub duplicates_dropped: usize,
    pub sync: SyncReport,
    pub duration_ms: u64,
    /// RFC 3339 completion time
    pub completed_at: String,
}

/// Select and chunk the configured repository on the calling thread.
///
/// Revision metadata is attached when the root is inside a git repository.
pub fn chunk_repository(
    config: &Config,
    cancel: &CancellationToken,
) -> Result<ChunkRun, IndexError> {
    let walker = FileWalker::from_config(config);
    let root = walker.resolve_root()?;
    let revision = SourceRevision::discover(&root);
    let pipeline = ChunkPipeline::from_config(config)?.with_revision(revision);
    let selection = walker.select()?;
    let mut run = pipeline.run(&root, &selection.files, cancel)?;
    run.files_skipped_oversized = selection.oversized.len();
    Ok(run)
}

/// Explicit handle over one configured index and embedder.
///
/// # Example
///
/// ```no_run
/// use codebase_index::{CodebaseIndexer, Config};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load(None)?;
///     let indexer = CodebaseIndexer::open(config).await?;
///
///     let report = indexer.ingest(CancellationToken::new()).await?;
///     println!("{} added, {} deleted", report.sync.added, report.sync.deleted);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CodebaseIndexer {
    config: Arc<Config>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    // One run at a time per handle
    run_lock: Arc<Mutex<()>>,
}

impl CodebaseIndexer {
    /// Validate `config`, connect to LanceDB and load the embedding model
    pub async fn open(config: Config) -> Result<Self, IndexError> {
        config.validate()?;

        let db_path = config.index.lancedb_path.to_string_lossy().to_string();
        let index = LanceIndex::with_path(&db_path).await?;

        let model_name = config.embedding.model_name.clone();
        let embedder =
            tokio::task::spawn_blocking(move || FastEmbedManager::from_name(&model_name))
                .await
                .context("Embedding model initialization task failed")??;

        tracing::info!(
            "Opened index at {} with model {} ({} dimensions)",
            index.db_path(),
            embedder.model_name(),
            embedder.dimension()
        );

        Self::with_components(config, Arc::new(index), Arc::new(embedder))
    }

    /// Build a handle from already constructed collaborators
    pub fn with_components(
        config: Config,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, IndexError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            index,
            embedder,
            run_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collection(&self) -> String {
        self.config.collection_name()
    }

    pub fn mode(&self) -> SyncMode {
        if self.config.index.rebuild {
            SyncMode::Rebuild
        } else {
            SyncMode::Incremental
        }
    }

    /// Select and chunk the repository without touching the index
    pub async fn chunk_only(&self, cancel: &CancellationToken) -> Result<ChunkRun, IndexError> {
        let config = self.config.clone();
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || chunk_repository(&config, &cancel))
            .await
            .map_err(|e| IndexError::other(format!("Chunking task failed: {}", e)))?
    }

    /// Chunk the repository and synchronize the collection with the result
    pub async fn ingest(&self, cancel: CancellationToken) -> Result<IngestReport, IndexError> {
        let _guard = self.run_lock.lock().await;
        let start = Instant::now();
        let collection = self.collection();

        tracing::info!(
            "Ingesting {} into '{}'",
            self.config.repository.root.display(),
            collection
        );

        let run = self.chunk_only(&cancel).await?;

        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        let synchronizer = IndexSynchronizer::new(self.index.clone(), self.embedder.clone())
            .with_batch_size(self.config.index.batch_size)
            .with_embed_timeout(Duration::from_secs(self.config.embedding.timeout_secs));

        let sync = synchronizer
            .sync(&collection, &run.chunks, self.mode(), &cancel)
            .await?;

        let report = IngestReport {
            collection,
            root: self.config.repository.root.display().to_string(),
            files_seen: run.files_seen,
            files_skipped_empty: run.files_skipped_empty,
            files_failed: run.files_failed,
            files_skipped_oversized: run.files_skipped_oversized,
            chunks: run.chunks.len(),
            duplicates_dropped: run.duplicates_dropped,
            sync,
            duration_ms: start.elapsed().as_millis() as u64,
            completed_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(
            "Ingestion finished in {} ms: {} chunks, {} added, {} deleted, {} unchanged",
            report.duration_ms,
            report.chunks,
            report.sync.added,
            report.sync.deleted,
            report.sync.unchanged
        );

        Ok(report)
    }
}
