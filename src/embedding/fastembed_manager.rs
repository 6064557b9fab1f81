use super::EmbeddingProvider;
use anyhow::{Context, Result, anyhow};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Supported local models: config name, fastembed model, vector dimension
const MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

/// FastEmbed-based embedding provider running a local ONNX model
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    model_name: &'static str,
    dimension: usize,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_name("all-MiniLM-L6-v2")
    }

    /// Create a manager from a configured model name
    pub fn from_name(name: &str) -> Result<Self> {
        let (model_name, model, dimension) = MODELS
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "Unsupported embedding model '{}' (supported: {})",
                    name,
                    Self::supported_models().join(", ")
                )
            })?;

        tracing::info!("Initializing FastEmbed model: {}", model_name);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            model_name,
            dimension,
        })
    }

    pub fn supported_models() -> Vec<&'static str> {
        MODELS.iter().map(|(name, _, _)| *name).collect()
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("Embedding model lock poisoned"))?;
        let embeddings = model
            .embed(texts, None)
            .context("Failed to generate embeddings")?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_rejected_before_download() {
        let err = FastEmbedManager::from_name("no-such-model").err().unwrap();
        assert!(err.to_string().contains("Unsupported embedding model"));
        assert!(err.to_string().contains("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_supported_models() {
        let models = FastEmbedManager::supported_models();
        assert_eq!(models.len(), 4);
        assert!(models.contains(&"bge-base-en-v1.5"));
    }

    #[test]
    #[ignore = "downloads the embedding model"]
    fn test_embedding_generation() {
        let manager = FastEmbedManager::new().unwrap();
        let texts = vec![
            "fn main() { println!(\"Hello, world!\"); }".to_string(),
            "pub struct Vector { x: f32, y: f32 }".to_string(),
        ];

        let embeddings = manager.embed_batch(texts).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 384);
        assert_eq!(manager.dimension(), 384);
        assert_eq!(manager.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore = "downloads the embedding model"]
    fn test_empty_batch() {
        let manager = FastEmbedManager::new().unwrap();
        let embeddings = manager.embed_batch(vec![]).unwrap();
        assert_eq!(embeddings.len(), 0);
    }

    #[test]
    #[ignore = "downloads the embedding model"]
    fn test_from_name_case_insensitive() {
        let manager = FastEmbedManager::from_name("BGE-BASE-EN-V1.5").unwrap();
        assert_eq!(manager.dimension(), 768);
        assert_eq!(manager.model_name(), "bge-base-en-v1.5");
    }
}
