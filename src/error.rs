/// Centralized error types for codebase-index using thiserror
///
/// Failures local to one file are absorbed by the pipeline and never show up here;
/// these types cover what is fatal to a run.
use thiserror::Error;

/// Main error type for an ingestion run
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("File selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Synchronization error: {0}")]
    Sync(#[from] SyncError),

    #[error("Ingestion was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while selecting files under a repository root
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Root directory does not exist: {0}")]
    RootNotFound(String),

    #[error("Root path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors raised while reconciling the index with the current chunk set.
///
/// Batch numbers are zero-based; `committed` counts upsert batches that were
/// fully written before the failure.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list ids in collection '{collection}': {reason}")]
    ListFailed { collection: String, reason: String },

    #[error("Failed to delete {count} stale entries: {reason}")]
    DeleteFailed { count: usize, reason: String },

    #[error("Failed to reset collection '{collection}': {reason}")]
    ResetFailed { collection: String, reason: String },

    #[error("Embedding failed for batch {batch} ({committed}/{total} batches committed): {reason}")]
    EmbeddingFailed {
        batch: usize,
        committed: usize,
        total: usize,
        reason: String,
    },

    #[error(
        "Embedding timed out after {secs} seconds for batch {batch} ({committed}/{total} batches committed)"
    )]
    EmbeddingTimeout {
        batch: usize,
        committed: usize,
        total: usize,
        secs: u64,
    },

    #[error("Upsert failed for batch {batch} ({committed}/{total} batches committed): {reason}")]
    UpsertFailed {
        batch: usize,
        committed: usize,
        total: usize,
        reason: String,
    },

    #[error("Synchronization cancelled ({committed}/{total} batches committed)")]
    Cancelled { committed: usize, total: usize },
}

impl SyncError {
    /// Number of upsert batches that reached the index before this error
    pub fn committed_batches(&self) -> usize {
        match self {
            SyncError::ListFailed { .. }
            | SyncError::DeleteFailed { .. }
            | SyncError::ResetFailed { .. } => 0,
            SyncError::EmbeddingFailed { committed, .. }
            | SyncError::EmbeddingTimeout { committed, .. }
            | SyncError::UpsertFailed { committed, .. }
            | SyncError::Cancelled { committed, .. } => *committed,
        }
    }
}

impl From<anyhow::Error> for IndexError {
    fn from(err: anyhow::Error) -> Self {
        IndexError::Other(format!("{:#}", err))
    }
}

impl IndexError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        IndexError::Other(msg.into())
    }

    /// Check if this is a user error (bad root or config) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(self, IndexError::Selection(_) | IndexError::Config(_))
    }

    /// Check if re-running ingestion may succeed.
    ///
    /// Deletes and upserts are keyed by content id, so a retried run converges.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IndexError::Sync(
                SyncError::ListFailed { .. }
                    | SyncError::DeleteFailed { .. }
                    | SyncError::ResetFailed { .. }
                    | SyncError::EmbeddingFailed { .. }
                    | SyncError::EmbeddingTimeout { .. }
                    | SyncError::UpsertFailed { .. }
            ) | IndexError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexError::Selection(SelectionError::RootNotFound("/test".to_string()));
        assert_eq!(
            err.to_string(),
            "File selection error: Root directory does not exist: /test"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IndexError = io_err.into();
        assert!(matches!(err, IndexError::Io(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let err: IndexError = anyhow_err.into();
        assert!(matches!(err, IndexError::Other(_)));
    }

    #[test]
    fn test_is_user_error() {
        let user_err = IndexError::Selection(SelectionError::NotADirectory("a.txt".to_string()));
        assert!(user_err.is_user_error());

        let system_err = IndexError::Io(std::io::Error::other("disk"));
        assert!(!system_err.is_user_error());
    }

    #[test]
    fn test_is_retryable() {
        let retryable = IndexError::Sync(SyncError::UpsertFailed {
            batch: 2,
            committed: 2,
            total: 5,
            reason: "connection reset".to_string(),
        });
        assert!(retryable.is_retryable());

        let not_retryable = IndexError::Config(ConfigError::InvalidValue {
            key: "chunking.max_tokens".to_string(),
            reason: "must be greater than 0".to_string(),
        });
        assert!(!not_retryable.is_retryable());
        assert!(!IndexError::Cancelled.is_retryable());
    }

    #[test]
    fn test_upsert_failed_reports_progress() {
        let err = SyncError::UpsertFailed {
            batch: 3,
            committed: 3,
            total: 7,
            reason: "disk full".to_string(),
        };
        assert_eq!(err.committed_batches(), 3);
        assert_eq!(
            err.to_string(),
            "Upsert failed for batch 3 (3/7 batches committed): disk full"
        );
    }

    #[test]
    fn test_reset_failed_is_retryable() {
        let err = SyncError::ResetFailed {
            collection: "code_chunks".to_string(),
            reason: "table locked".to_string(),
        };
        assert_eq!(err.committed_batches(), 0);
        assert_eq!(
            err.to_string(),
            "Failed to reset collection 'code_chunks': table locked"
        );
        assert!(IndexError::Sync(err).is_retryable());
    }

    #[test]
    fn test_delete_failed_has_no_committed_batches() {
        let err = SyncError::DeleteFailed {
            count: 4,
            reason: "timeout".to_string(),
        };
        assert_eq!(err.committed_batches(), 0);
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            key: "chunking.overlap_tokens".to_string(),
            reason: "must be less than max_tokens".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'chunking.overlap_tokens': must be less than max_tokens"
        );
    }

    #[test]
    fn test_error_other() {
        let err = IndexError::other("custom error message");
        assert_eq!(err.to_string(), "custom error message");
    }
}
