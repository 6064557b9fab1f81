//! # codebase-index - Repository Chunking and Incremental Index Sync
//!
//! Turns a source repository into a semantic index: files are selected,
//! split into bounded, content-addressed chunks, and synchronized into a
//! vector index so that exactly the chunks of the current tree are stored.
//!
//! ## Key Features
//!
//! - **AST-Aware Segmentation**: Tree-sitter top-level definitions for 12 languages,
//!   whole-file fallback for everything else
//! - **Token-Bounded Splitting**: cl100k_base estimates with configurable overlap
//! - **Content Addressing**: SHA-256 chunk ids; identical content is stored once
//! - **Incremental Sync**: stale ids deleted, only new ids embedded and upserted
//! - **Local Stack**: FastEmbed embeddings and an embedded LanceDB index
//!
//! ## Architecture
//!
//! ```text
//! repository root
//!        │
//! ┌──────▼──────┐
//! │ FileWalker  │  extension allow-list, ignored directory names
//! └──────┬──────┘
//!        │ sorted paths
//! ┌──────▼────────────────────────────────────────┐
//! │ ChunkPipeline (rayon workers)                 │
//! │   Segmenter -> TokenSplitter -> ChunkAssembler│
//! └──────┬────────────────────────────────────────┘
//!        │ channel; SeenHashes owned by the collector
//! ┌──────▼────────────┐     ┌──────────────────┐
//! │ IndexSynchronizer │────►│ EmbeddingProvider│
//! └──────┬────────────┘     └──────────────────┘
//!        │ list_ids / delete / upsert
//! ┌──────▼──────┐
//! │ VectorIndex │  LanceDB (persistent) or in-memory
//! └─────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use codebase_index::{CodebaseIndexer, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.repository.root = "/path/to/repo".into();
//!
//!     let indexer = CodebaseIndexer::open(config).await?;
//!     let report = indexer.ingest(CancellationToken::new()).await?;
//!     println!("{} chunks, {} new", report.chunks, report.sync.added);
//!     Ok(())
//! }
//! ```

/// Ingestion handle tying chunking and synchronization together
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Git revision metadata
pub mod git;

/// File selection, segmentation, splitting and chunk assembly
pub mod indexer;

/// Platform paths and path rendering
pub mod paths;

/// Stale-delete / new-upsert reconciliation
pub mod sync;

/// Vector index abstraction with LanceDB and in-memory backends
pub mod vector_db;

pub use client::{CodebaseIndexer, IngestReport, chunk_repository};
pub use config::Config;
pub use error::{IndexError, SyncError};
pub use indexer::{Chunk, ChunkMetadata, ChunkRun};
pub use sync::{SyncMode, SyncReport};
