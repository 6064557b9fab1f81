//! Reconciliation of a persistent index with the current chunk set
//!
//! Incremental runs delete stale ids first, then embed and upsert only ids
//! the index has not seen. Because ids are content hashes, unchanged chunks
//! are never re-embedded and a failed run can simply be repeated.

use crate::embedding::EmbeddingProvider;
use crate::error::SyncError;
use crate::indexer::Chunk;
use crate::vector_db::{IndexRecord, VectorIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BATCH_SIZE: usize = 256;
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Delete stale ids and add new ones, leaving unchanged entries alone
    Incremental,
    /// Drop the collection, then add the whole chunk set
    Rebuild,
}

/// Differences between stored ids and the current chunk set
#[derive(Debug)]
pub struct SyncPlan<'a> {
    pub stale: HashSet<String>,
    /// Chunks to embed and upsert, unique and sorted by id
    pub to_add: Vec<&'a Chunk>,
    pub unchanged: usize,
}

impl<'a> SyncPlan<'a> {
    pub fn incremental(stored: &HashSet<String>, chunks: &'a [Chunk]) -> Self {
        let current = unique_by_id(chunks);
        let stale = stored
            .iter()
            .filter(|id| !current.contains_key(id.as_str()))
            .cloned()
            .collect();
        let unchanged = current.keys().filter(|id| stored.contains(**id)).count();
        let to_add = current
            .into_iter()
            .filter(|(id, _)| !stored.contains(*id))
            .map(|(_, chunk)| chunk)
            .collect();

        Self {
            stale,
            to_add,
            unchanged,
        }
    }

    pub fn rebuild(stored: &HashSet<String>, chunks: &'a [Chunk]) -> Self {
        Self {
            stale: stored.clone(),
            to_add: unique_by_id(chunks).into_values().collect(),
            unchanged: 0,
        }
    }
}

fn unique_by_id(chunks: &[Chunk]) -> BTreeMap<&str, &Chunk> {
    let mut map = BTreeMap::new();
    for chunk in chunks {
        map.entry(chunk.id.as_str()).or_insert(chunk);
    }
    map
}

/// Outcome of one synchronization call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub stored_before: usize,
    pub deleted: usize,
    pub added: usize,
    pub unchanged: usize,
    pub batches: usize,
}

/// Drives delete and batched upsert calls against a [`VectorIndex`]
pub struct IndexSynchronizer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    embed_timeout: Duration,
}

impl IndexSynchronizer {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Make `collection` hold exactly the ids of `chunks`.
    ///
    /// Errors report the failing batch and how many batches were committed.
    pub async fn sync(
        &self,
        collection: &str,
        chunks: &[Chunk],
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let start = Instant::now();

        let stored = self
            .index
            .list_ids(collection)
            .await
            .map_err(|e| SyncError::ListFailed {
                collection: collection.to_string(),
                reason: format!("{:#}", e),
            })?;

        let plan = match mode {
            SyncMode::Incremental => SyncPlan::incremental(&stored, chunks),
            SyncMode::Rebuild => SyncPlan::rebuild(&stored, chunks),
        };
        let total = plan.to_add.len().div_ceil(self.batch_size);

        if chunks.is_empty() && !stored.is_empty() {
            tracing::warn!(
                "Current chunk set is empty; all {} entries in '{}' will be removed",
                stored.len(),
                collection
            );
        }

        tracing::info!(
            "Sync '{}' ({:?}): {} stored, {} stale, {} new, {} unchanged",
            collection,
            mode,
            stored.len(),
            plan.stale.len(),
            plan.to_add.len(),
            plan.unchanged
        );

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled {
                committed: 0,
                total,
            });
        }

        if mode == SyncMode::Rebuild {
            // Dropping the collection also discards a vector dimension left
            // behind by a previous embedding model
            self.index
                .reset(collection)
                .await
                .map_err(|e| SyncError::ResetFailed {
                    collection: collection.to_string(),
                    reason: format!("{:#}", e),
                })?;
        } else if !plan.stale.is_empty() {
            self.index
                .delete(collection, &plan.stale)
                .await
                .map_err(|e| SyncError::DeleteFailed {
                    count: plan.stale.len(),
                    reason: format!("{:#}", e),
                })?;
        }

        for (batch, group) in plan.to_add.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Sync cancelled after {}/{} batches", batch, total);
                return Err(SyncError::Cancelled {
                    committed: batch,
                    total,
                });
            }

            let vectors = self.embed(group, batch, total).await?;
            let records: Vec<IndexRecord> = group
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexRecord {
                    id: chunk.id.clone(),
                    content: chunk.content.clone(),
                    metadata: chunk.metadata.clone(),
                    vector,
                })
                .collect();

            self.index
                .upsert(collection, records)
                .await
                .map_err(|e| SyncError::UpsertFailed {
                    batch,
                    committed: batch,
                    total,
                    reason: format!("{:#}", e),
                })?;

            tracing::debug!("Committed batch {}/{}", batch + 1, total);
        }

        let report = SyncReport {
            mode,
            stored_before: stored.len(),
            deleted: plan.stale.len(),
            added: plan.to_add.len(),
            unchanged: plan.unchanged,
            batches: total,
        };

        tracing::info!(
            "Sync '{}' done in {:?}: {} deleted, {} added in {} batches",
            collection,
            start.elapsed(),
            report.deleted,
            report.added,
            report.batches
        );

        Ok(report)
    }

    /// Embed one batch on a blocking thread, bounded by the embed timeout
    async fn embed(
        &self,
        group: &[&Chunk],
        batch: usize,
        total: usize,
    ) -> Result<Vec<Vec<f32>>, SyncError> {
        let texts: Vec<String> = group.iter().map(|c| c.content.clone()).collect();
        let embedder = self.embedder.clone();
        let task = tokio::task::spawn_blocking(move || embedder.embed_batch(texts));

        let failed = |reason: String| SyncError::EmbeddingFailed {
            batch,
            committed: batch,
            total,
            reason,
        };

        let vectors = match tokio::time::timeout(self.embed_timeout, task).await {
            Ok(Ok(Ok(vectors))) => vectors,
            Ok(Ok(Err(e))) => return Err(failed(format!("{:#}", e))),
            Ok(Err(e)) => return Err(failed(format!("embedding task panicked: {}", e))),
            Err(_) => {
                return Err(SyncError::EmbeddingTimeout {
                    batch,
                    committed: batch,
                    total,
                    secs: self.embed_timeout.as_secs(),
                });
            }
        };

        if vectors.len() != group.len() {
            return Err(failed(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                group.len()
            )));
        }

        Ok(vectors)
    }
}
