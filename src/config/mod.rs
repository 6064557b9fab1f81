/// Configuration system for codebase-index
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, IndexError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Which files to ingest
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Segment splitting and worker pool
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Persistent index target
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Repository and file selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Root directory of the checked-out repository
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Optional project name, appended to the collection name
    #[serde(default)]
    pub project_name: Option<String>,

    /// File extensions to ingest (leading dots are accepted)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names that are never descended into
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Maximum file size to ingest (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Also honor .gitignore / .ignore files
    #[serde(default)]
    pub respect_gitignore: bool,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound on estimated tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens shared by consecutive chunks of one segment
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,

    /// Token estimator: "cl100k" or "whitespace"
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,

    /// Number of parallel file workers
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Persistent index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Base collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Chunks per embedding/upsert call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Drop every stored entry before upserting the current run
    #[serde(default)]
    pub rebuild: bool,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

pub const TOKENIZER_CL100K: &str = "cl100k";
pub const TOKENIZER_WHITESPACE: &str = "whitespace";

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    ["py", "js", "java", "ts", "md"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignored_dirs() -> Vec<String> {
    [".git", "node_modules", "__pycache__", ".venv", "env", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_file_size() -> u64 {
    1_048_576 // 1 MB
}

fn default_max_tokens() -> usize {
    500
}

fn default_overlap_tokens() -> usize {
    50
}

fn default_tokenizer() -> String {
    TOKENIZER_CL100K.to_string()
}

fn default_workers() -> usize {
    4
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_collection() -> String {
    "code_chunks".to_string()
}

fn default_batch_size() -> usize {
    256
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_timeout() -> u64 {
    60
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            project_name: None,
            extensions: default_extensions(),
            ignored_dirs: default_ignored_dirs(),
            max_file_size: default_max_file_size(),
            respect_gitignore: false,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
            tokenizer: default_tokenizer(),
            workers: default_workers(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            lancedb_path: default_lancedb_path(),
            collection: default_collection(),
            batch_size: default_batch_size(),
            rebuild: false,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, IndexError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from an explicit path if given, else the default location, then
    /// apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, IndexError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Runs before any file is touched, so degenerate splitter settings never
    /// reach the pipeline.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.chunking.max_tokens == 0 {
            return Err(invalid("chunking.max_tokens", "must be greater than 0"));
        }

        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err(invalid(
                "chunking.overlap_tokens",
                format!(
                    "must be less than max_tokens ({}), got {}",
                    self.chunking.max_tokens, self.chunking.overlap_tokens
                ),
            ));
        }

        if self.chunking.tokenizer != TOKENIZER_CL100K
            && self.chunking.tokenizer != TOKENIZER_WHITESPACE
        {
            return Err(invalid(
                "chunking.tokenizer",
                format!(
                    "must be '{}' or '{}', got '{}'",
                    TOKENIZER_CL100K, TOKENIZER_WHITESPACE, self.chunking.tokenizer
                ),
            ));
        }

        if self.chunking.workers == 0 {
            return Err(invalid("chunking.workers", "must be greater than 0"));
        }

        if self.index.batch_size == 0 {
            return Err(invalid("index.batch_size", "must be greater than 0"));
        }

        if self.index.collection.trim().is_empty() {
            return Err(invalid("index.collection", "must not be empty"));
        }

        if self.repository.max_file_size == 0 {
            return Err(invalid("repository.max_file_size", "must be greater than 0"));
        }

        if self.repository.extensions.is_empty() {
            return Err(invalid("repository.extensions", "must list at least one extension"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("CODEBASE_INDEX_ROOT") {
            self.repository.root = PathBuf::from(root);
        }

        if let Ok(project) = std::env::var("CODEBASE_INDEX_PROJECT") {
            self.repository.project_name = Some(project);
        }

        if let Ok(path) = std::env::var("CODEBASE_INDEX_LANCEDB_PATH") {
            self.index.lancedb_path = PathBuf::from(path);
        }

        if let Ok(model) = std::env::var("CODEBASE_INDEX_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(workers) = std::env::var("CODEBASE_INDEX_WORKERS")
            && let Ok(n) = workers.parse()
        {
            self.chunking.workers = n;
        }

        if let Ok(batch_size) = std::env::var("CODEBASE_INDEX_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.index.batch_size = size;
        }
    }

    /// Effective collection name: `{collection}_{project}` when a project is set.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced with `_` so the name is
    /// usable as a table name by every backend.
    pub fn collection_name(&self) -> String {
        let raw = match &self.repository.project_name {
            Some(project) if !project.trim().is_empty() => {
                format!("{}_{}", self.index.collection, project.trim())
            }
            _ => self.index.collection.clone(),
        };
        raw.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Extensions normalized to lowercase without the leading dot
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.repository
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> IndexError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}
