//! Storage error types.

use harbor_schema::SchemaError;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The transactional engine failed to open or lost its connection
    /// irrecoverably.
    ///
    /// [`Storage`](crate::Storage) intercepts this variant and retries the
    /// operation on a fallback backend; callers only ever see it if the
    /// fallback itself fails within the same call.
    #[error("store broken: {0}")]
    StoreBroken(String),

    /// A value does not conform to the supplied schema.
    ///
    /// Raised for candidate data on write and for present data on read.
    /// Never swallowed: accepting invalid data would corrupt application
    /// state built on the stored shape.
    #[error("value for key {key:?} does not conform to the supplied schema")]
    Validation {
        /// The key whose value failed validation.
        key: String,
    },

    /// A value cannot be represented by the active backend, or stored text
    /// could not be parsed back (a data corruption signal).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The caller-authored schema itself is malformed.
    #[error("malformed schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// The key cannot be used with the active backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// An underlying storage primitive failed, tagged with the operation
    /// that hit it.
    #[error("{op} failed: {message}")]
    Backend {
        /// The logical operation that was running.
        op: &'static str,
        /// The engine's error text.
        message: String,
    },
}

impl StorageError {
    /// Wrap an engine error with the name of the operation that hit it.
    pub fn backend(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            op,
            message: err.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
