//! Parallel chunking driver
//!
//! Files fan out over a bounded rayon pool; each worker reads, segments,
//! splits and assembles one file. Per-file outcomes flow back over a channel
//! to the calling thread, which alone owns the [`SeenHashes`] set and
//! deduplicates in file order. Output is therefore identical for any worker
//! count.

use super::{
    Chunk, ChunkAssembler, FileWalker, Observation, SeenHashes, Segmenter, TokenSplitter,
    language_tag,
};
use crate::config::Config;
use crate::error::IndexError;
use crate::git::SourceRevision;
use crate::paths::PlatformPaths;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// What one worker produced for one file
enum FileOutcome {
    Chunks(Vec<Chunk>),
    Empty,
    Failed(String),
}

/// Merged result of chunking a file list
#[derive(Debug, Clone, Default)]
pub struct ChunkRun {
    /// Surviving chunks, unique by id, in file order
    pub chunks: Vec<Chunk>,
    pub files_seen: usize,
    pub files_skipped_empty: usize,
    pub files_failed: usize,
    /// Selected by extension but left out for size; filled in by the caller
    /// that walked the tree
    pub files_skipped_oversized: usize,
    pub duplicates_dropped: usize,
}

impl ChunkRun {
    pub fn ids(&self) -> HashSet<String> {
        self.chunks.iter().map(|c| c.id.clone()).collect()
    }
}

/// Segmenter -> splitter -> assembler over a worker pool, deduplicated by a
/// single owner
#[derive(Debug, Clone)]
pub struct ChunkPipeline {
    segmenter: Segmenter,
    splitter: TokenSplitter,
    assembler: ChunkAssembler,
    workers: usize,
}

impl ChunkPipeline {
    pub fn new(splitter: TokenSplitter, workers: usize) -> Self {
        Self {
            segmenter: Segmenter::new(),
            splitter,
            assembler: ChunkAssembler::default(),
            workers: workers.max(1),
        }
    }

    /// Build from the `[chunking]` section
    pub fn from_config(config: &Config) -> Result<Self, IndexError> {
        let splitter = TokenSplitter::from_config(&config.chunking)?;
        Ok(Self::new(splitter, config.chunking.workers))
    }

    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_revision(mut self, revision: Option<SourceRevision>) -> Self {
        self.assembler = ChunkAssembler::new(revision);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn splitter(&self) -> &TokenSplitter {
        &self.splitter
    }

    /// Select files with `walker` and chunk them
    pub fn run_walker(
        &self,
        walker: &FileWalker,
        cancel: &CancellationToken,
    ) -> Result<ChunkRun, IndexError> {
        let root = walker.resolve_root()?;
        let selection = walker.select()?;
        let mut run = self.run(&root, &selection.files, cancel)?;
        run.files_skipped_oversized = selection.oversized.len();
        Ok(run)
    }

    /// Chunk `files`, which are expected to live under `root`.
    ///
    /// Unreadable files and panics inside a worker count as zero chunks.
    /// Cancellation is checked before each file; a cancelled run returns
    /// [`IndexError::Cancelled`] and discards everything produced so far.
    pub fn run(
        &self,
        root: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<ChunkRun, IndexError> {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("chunk-worker-{}", i))
            .build()
            .map_err(|e| IndexError::other(format!("Failed to build worker pool: {}", e)))?;

        let (tx, rx) = mpsc::channel::<(usize, FileOutcome)>();
        let mut outcomes: Vec<Option<FileOutcome>> = Vec::new();
        outcomes.resize_with(files.len(), || None);

        std::thread::scope(|scope| {
            scope.spawn(move || {
                pool.install(|| {
                    files
                        .par_iter()
                        .enumerate()
                        .for_each_with(tx, |tx, (position, path)| {
                            if cancel.is_cancelled() {
                                return;
                            }
                            let outcome = self.process_file(root, path);
                            // The receiver outlives every worker
                            let _ = tx.send((position, outcome));
                        });
                });
            });

            for (position, outcome) in rx {
                outcomes[position] = Some(outcome);
            }
        });

        if cancel.is_cancelled() {
            tracing::info!("Chunking cancelled, discarding partial results");
            return Err(IndexError::Cancelled);
        }

        let mut run = ChunkRun {
            files_seen: files.len(),
            ..ChunkRun::default()
        };
        let mut seen = SeenHashes::new();

        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                FileOutcome::Chunks(chunks) => {
                    for chunk in chunks {
                        match seen.observe(&chunk.id) {
                            Observation::New => run.chunks.push(chunk),
                            Observation::Duplicate => run.duplicates_dropped += 1,
                        }
                    }
                }
                FileOutcome::Empty => run.files_skipped_empty += 1,
                FileOutcome::Failed(_) => run.files_failed += 1,
            }
        }

        tracing::info!(
            "Chunked {} files into {} chunks ({} duplicates dropped, {} empty, {} failed) in {:?} with {} workers",
            run.files_seen,
            run.chunks.len(),
            run.duplicates_dropped,
            run.files_skipped_empty,
            run.files_failed,
            start.elapsed(),
            self.workers
        );

        Ok(run)
    }

    fn process_file(&self, root: &Path, path: &Path) -> FileOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.chunk_file(root, path))) {
            Ok(Ok(chunks)) if chunks.is_empty() => {
                tracing::debug!("Skipping empty file: {}", path.display());
                FileOutcome::Empty
            }
            Ok(Ok(chunks)) => FileOutcome::Chunks(chunks),
            Ok(Err(e)) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                FileOutcome::Failed(e.to_string())
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("Chunking {} panicked: {}", path.display(), reason);
                FileOutcome::Failed(reason)
            }
        }
    }

    fn chunk_file(&self, root: &Path, path: &Path) -> std::io::Result<Vec<Chunk>> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);

        let relative_path = PlatformPaths::relative_to(root, path);
        let language = language_tag(path);

        let mut chunks = Vec::new();
        for (segment_index, segment) in self.segmenter.segment(&text, &language).iter().enumerate()
        {
            for (chunk_index, content) in self.splitter.split(segment).iter().enumerate() {
                chunks.push(self.assembler.assemble(
                    content,
                    &relative_path,
                    segment_index,
                    chunk_index,
                    &language,
                ));
            }
        }

        tracing::debug!("{}: {} chunks", relative_path, chunks.len());
        Ok(chunks)
    }
}
