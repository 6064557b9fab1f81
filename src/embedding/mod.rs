mod fastembed_manager;

pub use fastembed_manager::FastEmbedManager;

use anyhow::Result;

/// Maps chunk content to fixed-dimension vectors.
///
/// Calls are blocking; async callers run them on a blocking thread.
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input text, in input order
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}
