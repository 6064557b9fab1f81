// LanceDB is the default embedded vector database
pub mod lance_client;
pub use lance_client::LanceIndex;

// In-process index for tests and dry runs
pub mod memory;
pub use memory::MemoryIndex;

use crate::indexer::ChunkMetadata;
use anyhow::Result;
use std::collections::HashSet;

/// One stored entry: a chunk plus its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub vector: Vec<f32>,
}

/// The persistent index as seen by the synchronizer.
///
/// Entries are keyed by content id and never updated in place.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Every id currently stored in `collection`; empty if it does not exist
    async fn list_ids(&self, collection: &str) -> Result<HashSet<String>>;

    /// Remove entries by id; ids that are not present are ignored
    async fn delete(&self, collection: &str, ids: &HashSet<String>) -> Result<()>;

    /// Insert records, replacing any entry that already has the same id
    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> Result<()>;

    /// Remove the collection with everything it fixed at creation, such as
    /// the vector dimension. The next upsert starts from scratch.
    async fn reset(&self, collection: &str) -> Result<()> {
        let ids = self.list_ids(collection).await?;
        self.delete(collection, &ids).await
    }
}
