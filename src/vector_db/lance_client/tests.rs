use super::*;
use tempfile::TempDir;

fn record(id: &str, path: &str, vector: Vec<f32>) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        content: format!("content {}", id),
        metadata: ChunkMetadata {
            relative_path: path.to_string(),
            segment_index: 0,
            chunk_index: 0,
            language: "Rust".to_string(),
            repo_url: None,
            commit_hash: Some("abc".to_string()),
        },
        vector,
    }
}

async fn test_index() -> (TempDir, LanceIndex) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("lancedb")
        .to_string_lossy()
        .to_string();
    let index = LanceIndex::with_path(&db_path).await.unwrap();
    (temp_dir, index)
}

fn ids(values: &[&str]) -> HashSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_with_path() {
    let (temp_dir, index) = test_index().await;
    assert!(index.db_path().starts_with(&*temp_dir.path().to_string_lossy()));
}

#[tokio::test]
async fn test_missing_collection_is_empty() {
    let (_dir, index) = test_index().await;
    assert!(index.list_ids("absent").await.unwrap().is_empty());
    assert_eq!(index.count("absent").await.unwrap(), 0);
    index.delete("absent", &ids(&["x"])).await.unwrap();
    index.drop_collection("absent").await.unwrap();
}

#[tokio::test]
async fn test_reset_allows_new_dimension() {
    let (_dir, index) = test_index().await;
    index
        .upsert("chunks", vec![record("a", "src/a.rs", vec![0.1, 0.2, 0.3])])
        .await
        .unwrap();

    index.reset("chunks").await.unwrap();
    assert_eq!(index.count("chunks").await.unwrap(), 0);

    index
        .upsert("chunks", vec![record("b", "src/b.rs", vec![0.1, 0.2, 0.3, 0.4])])
        .await
        .unwrap();
    assert_eq!(index.list_ids("chunks").await.unwrap(), ids(&["b"]));
}

#[tokio::test]
async fn test_upsert_creates_table_and_lists_ids() {
    let (_dir, index) = test_index().await;
    index
        .upsert(
            "chunks",
            vec![
                record("a", "src/a.rs", vec![0.1, 0.2, 0.3]),
                record("b", "src/b.rs", vec![0.4, 0.5, 0.6]),
            ],
        )
        .await
        .unwrap();

    assert_eq!(index.list_ids("chunks").await.unwrap(), ids(&["a", "b"]));
    assert_eq!(index.count("chunks").await.unwrap(), 2);
}

#[tokio::test]
async fn test_upsert_existing_id_does_not_duplicate() {
    let (_dir, index) = test_index().await;
    index
        .upsert("chunks", vec![record("a", "a.rs", vec![1.0, 0.0])])
        .await
        .unwrap();
    index
        .upsert(
            "chunks",
            vec![
                record("a", "a.rs", vec![1.0, 0.0]),
                record("c", "c.rs", vec![0.0, 1.0]),
            ],
        )
        .await
        .unwrap();

    assert_eq!(index.count("chunks").await.unwrap(), 2);
    assert_eq!(index.list_ids("chunks").await.unwrap(), ids(&["a", "c"]));
}

#[tokio::test]
async fn test_delete_ignores_absent_ids() {
    let (_dir, index) = test_index().await;
    index
        .upsert(
            "chunks",
            vec![
                record("a", "a.rs", vec![1.0, 0.0]),
                record("b", "b.rs", vec![0.0, 1.0]),
            ],
        )
        .await
        .unwrap();

    index
        .delete("chunks", &ids(&["a", "never-stored", "it's"]))
        .await
        .unwrap();
    assert_eq!(index.list_ids("chunks").await.unwrap(), ids(&["b"]));
}

#[tokio::test]
async fn test_delete_many_ids() {
    let (_dir, index) = test_index().await;
    let records: Vec<_> = (0..1200)
        .map(|i| record(&format!("id{:04}", i), "a.rs", vec![i as f32, 1.0]))
        .collect();
    index.upsert("chunks", records).await.unwrap();

    let doomed: HashSet<String> = (0..1100).map(|i| format!("id{:04}", i)).collect();
    index.delete("chunks", &doomed).await.unwrap();
    assert_eq!(index.count("chunks").await.unwrap(), 100);
}

#[tokio::test]
async fn test_collections_are_separate_tables() {
    let (_dir, index) = test_index().await;
    index
        .upsert("one", vec![record("a", "a.rs", vec![1.0])])
        .await
        .unwrap();
    index
        .upsert("two", vec![record("b", "b.rs", vec![1.0])])
        .await
        .unwrap();

    assert_eq!(index.list_ids("one").await.unwrap(), ids(&["a"]));
    index.drop_collection("one").await.unwrap();
    assert!(index.list_ids("one").await.unwrap().is_empty());
    assert_eq!(index.list_ids("two").await.unwrap(), ids(&["b"]));
}

#[test]
fn test_record_batch_rejects_mixed_dimensions() {
    let records = vec![
        record("a", "a.rs", vec![1.0, 2.0]),
        record("b", "b.rs", vec![1.0]),
    ];
    let result = LanceIndex::create_record_batch(&records, LanceIndex::create_schema(2));
    assert!(result.is_err());
}

#[test]
fn test_record_batch_columns() {
    let records = vec![record("a", "src/a.rs", vec![1.0, 2.0])];
    let batch = LanceIndex::create_record_batch(&records, LanceIndex::create_schema(2)).unwrap();
    assert_eq!(batch.num_rows(), 1);
    assert_eq!(batch.num_columns(), 9);

    let commit = batch
        .column_by_name("commit_hash")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(commit.value(0), "abc");
    assert!(batch.column_by_name("repo_url").unwrap().is_null(0));
}

#[test]
fn test_quote_escapes() {
    assert_eq!(quote("abc"), "'abc'");
    assert_eq!(quote("it's"), "'it''s'");
}
