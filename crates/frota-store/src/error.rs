//! # Store Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / serde_json::Error                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds path context and categorization        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError::Persistence (frota-engine) ← Applied / NotApplied / Unknown│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Path is empty where a node is required, or a segment is illegal.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Two paths of one multi-path update overlap.
    #[error("Overlapping paths in update: '{first}' and '{second}'")]
    OverlappingPaths { first: String, second: String },

    /// A stored node could not be decoded into the requested type.
    #[error("Corrupt document at '{path}': {message}")]
    Corrupt { path: String, message: String },

    /// JSON (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Pool closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed before commit; nothing was applied.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Commit itself failed. The write may or may not be durable.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(path: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True when a failed write may nevertheless have been applied.
    ///
    /// Every other error is raised before anything reaches storage.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, StoreError::CommitFailed(_) | StoreError::Internal(_))
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
/// sqlx::Error::PoolClosed     → StoreError::ConnectionFailed
/// sqlx::Error::Io             → StoreError::ConnectionFailed
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::Io(io) => StoreError::ConnectionFailed(io.to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
