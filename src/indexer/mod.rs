//! File selection, segmentation, token-bounded splitting and chunk assembly
//!
//! Data flow for one run:
//!
//! ```text
//! root -> FileWalker -> [per file: Segmenter -> TokenSplitter -> ChunkAssembler] -> SeenHashes -> chunks
//! ```
//!
//! The per-file stages run on a bounded worker pool ([`ChunkPipeline`]); the
//! seen-hash set is owned by the collecting thread only.

mod ast_parser;
mod chunker;
mod dedup;
mod file_walker;
mod language;
mod pipeline;
mod segmenter;
mod token_splitter;

pub use ast_parser::{AstParser, ParseError};
pub use chunker::ChunkAssembler;
pub use dedup::{Observation, SeenHashes, content_hash};
pub use file_walker::{FileWalker, Selection};
pub use language::{detect_language, language_tag};
pub use pipeline::{ChunkPipeline, ChunkRun};
pub use segmenter::{SegmentStrategy, Segmenter};
pub use token_splitter::{
    Cl100kCounter, Span, TokenCounter, TokenSplitter, WhitespaceCounter, counter_for,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A content-addressed unit of text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// SHA-256 hex of `content`; also the index primary key
    pub id: String,
    /// The literal text of this chunk
    pub content: String,
    /// Where the chunk came from; never part of `id`
    pub metadata: ChunkMetadata,
}

/// Canonical chunk metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path relative to the repository root, `/`-separated
    pub relative_path: String,
    /// Zero-based index of the segment within its file
    pub segment_index: usize,
    /// Zero-based index of the chunk within its segment
    pub chunk_index: usize,
    /// Language tag derived from the file extension
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

impl ChunkMetadata {
    /// Flatten into a string/int map, omitting absent revision fields
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("relative_path".into(), Value::from(self.relative_path.clone()));
        map.insert("segment_index".into(), Value::from(self.segment_index));
        map.insert("chunk_index".into(), Value::from(self.chunk_index));
        map.insert("language".into(), Value::from(self.language.clone()));
        if let Some(url) = &self.repo_url {
            map.insert("repo_url".into(), Value::from(url.clone()));
        }
        if let Some(hash) = &self.commit_hash {
            map.insert("commit_hash".into(), Value::from(hash.clone()));
        }
        map
    }
}
