use super::{IndexRecord, VectorIndex};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Vector index held in process memory, one map per collection
#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, HashMap<String, IndexRecord>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored records of a collection, sorted by id
    pub async fn records(&self, collection: &str) -> Vec<IndexRecord> {
        let collections = self.collections.read().await;
        let mut records: Vec<IndexRecord> = collections
            .get(collection)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    async fn list_ids(&self, collection: &str) -> Result<HashSet<String>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, ids: &HashSet<String>) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(entries) = collections.get_mut(collection) {
            entries.retain(|id, _| !ids.contains(id));
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn reset(&self, collection: &str) -> Result<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }
}
