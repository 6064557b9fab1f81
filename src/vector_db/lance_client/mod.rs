//! LanceDB-backed vector index
//!
//! One table per collection. A table is created on first upsert with the
//! vector dimension of that batch; reads and deletes against a collection
//! that has no table yet see an empty index.

use crate::indexer::ChunkMetadata;
use crate::vector_db::{IndexRecord, VectorIndex};
use anyhow::{Context, Result, bail};
use arrow_array::{
    Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array,
    types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum ids per delete predicate
const DELETE_CHUNK: usize = 512;

/// LanceDB vector index (embedded, no server required)
pub struct LanceIndex {
    connection: Connection,
    db_path: String,
}

impl LanceIndex {
    /// Create a new LanceDB instance with default path
    pub async fn new() -> Result<Self> {
        let db_path = crate::paths::PlatformPaths::default_lancedb_path();
        Self::with_path(&db_path.to_string_lossy()).await
    }

    /// Create a new LanceDB instance with custom path
    pub async fn with_path(db_path: &str) -> Result<Self> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            db_path: db_path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Create schema for a collection table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("relative_path", DataType::Utf8, false),
            Field::new("segment_index", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("language", DataType::Utf8, false),
            Field::new("repo_url", DataType::Utf8, true),
            Field::new("commit_hash", DataType::Utf8, true),
        ]))
    }

    /// Open the table for a collection, if it exists
    async fn open_table(&self, collection: &str) -> Result<Option<Table>> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;

        if !table_names.iter().any(|name| name == collection) {
            return Ok(None);
        }

        let table = self
            .connection
            .open_table(collection)
            .execute()
            .await
            .with_context(|| format!("Failed to open table '{}'", collection))?;
        Ok(Some(table))
    }

    /// Convert records to a RecordBatch
    fn create_record_batch(records: &[IndexRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let dimension = records.first().map_or(0, |r| r.vector.len());
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            bail!(
                "Vector dimension mismatch for {}: expected {}, got {}",
                bad.id,
                dimension,
                bad.vector.len()
            );
        }

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            records
                .iter()
                .map(|r| Some(r.vector.iter().copied().map(Some))),
            dimension as i32,
        );

        let metadata: Vec<&ChunkMetadata> = records.iter().map(|r| &r.metadata).collect();

        let id_array = StringArray::from(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>());
        let content_array =
            StringArray::from(records.iter().map(|r| r.content.as_str()).collect::<Vec<_>>());
        let path_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.relative_path.as_str())
                .collect::<Vec<_>>(),
        );
        let segment_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.segment_index as u32)
                .collect::<Vec<_>>(),
        );
        let chunk_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.chunk_index as u32)
                .collect::<Vec<_>>(),
        );
        let language_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.language.as_str())
                .collect::<Vec<_>>(),
        );
        let repo_url_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.repo_url.as_deref())
                .collect::<Vec<_>>(),
        );
        let commit_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.commit_hash.as_deref())
                .collect::<Vec<_>>(),
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(id_array),
                Arc::new(vector_array),
                Arc::new(content_array),
                Arc::new(path_array),
                Arc::new(segment_array),
                Arc::new(chunk_array),
                Arc::new(language_array),
                Arc::new(repo_url_array),
                Arc::new(commit_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    /// Number of rows stored in a collection
    pub async fn count(&self, collection: &str) -> Result<usize> {
        match self.open_table(collection).await? {
            Some(table) => table
                .count_rows(None)
                .await
                .context("Failed to count rows"),
            None => Ok(0),
        }
    }

    /// Drop a collection's table entirely; missing tables are ignored
    pub async fn drop_collection(&self, collection: &str) -> Result<()> {
        if self.open_table(collection).await?.is_none() {
            return Ok(());
        }
        self.connection
            .drop_table(collection, &[])
            .await
            .with_context(|| format!("Failed to drop table '{}'", collection))?;
        tracing::info!("Dropped collection '{}'", collection);
        Ok(())
    }
}

fn quote(id: &str) -> String {
    format!("'{}'", id.replace('\'', "''"))
}

#[async_trait::async_trait]
impl VectorIndex for LanceIndex {
    async fn list_ids(&self, collection: &str) -> Result<HashSet<String>> {
        let Some(table) = self.open_table(collection).await? else {
            return Ok(HashSet::new());
        };

        let total = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        if total == 0 {
            return Ok(HashSet::new());
        }

        let stream = table
            .query()
            .select(Select::Columns(vec!["id".to_string()]))
            .limit(total)
            .execute()
            .await
            .context("Failed to query ids")?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect ids")?;

        let mut ids = HashSet::with_capacity(total);
        for batch in batches {
            let id_array = batch
                .column_by_name("id")
                .context("Missing id column")?
                .as_any()
                .downcast_ref::<StringArray>()
                .context("Invalid id type")?;

            for i in 0..id_array.len() {
                ids.insert(id_array.value(i).to_string());
            }
        }

        Ok(ids)
    }

    async fn delete(&self, collection: &str, ids: &HashSet<String>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let Some(table) = self.open_table(collection).await? else {
            return Ok(());
        };

        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();

        for group in sorted.chunks(DELETE_CHUNK) {
            let filter = format!(
                "id IN ({})",
                group
                    .iter()
                    .map(|id| quote(id))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            table
                .delete(&filter)
                .await
                .context("Failed to delete records")?;
        }

        tracing::debug!("Deleted {} ids from '{}'", ids.len(), collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let dimension = records[0].vector.len();
        let schema = Self::create_schema(dimension);
        let batch = Self::create_record_batch(&records, schema.clone())?;
        let count = batch.num_rows();
        let reader = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);

        match self.open_table(collection).await? {
            Some(table) => {
                let mut merge = table.merge_insert(&["id"]);
                merge
                    .when_matched_update_all(None)
                    .when_not_matched_insert_all();
                merge
                    .execute(Box::new(reader))
                    .await
                    .context("Failed to merge records into table")?;
            }
            None => {
                tracing::info!(
                    "Creating collection '{}' with dimension {}",
                    collection,
                    dimension
                );
                self.connection
                    .create_table(collection, Box::new(reader))
                    .execute()
                    .await
                    .context("Failed to create table")?;
            }
        }

        tracing::debug!("Upserted {} records into '{}'", count, collection);
        Ok(())
    }

    async fn reset(&self, collection: &str) -> Result<()> {
        self.drop_collection(collection).await
    }
}

#[cfg(test)]
mod tests;
