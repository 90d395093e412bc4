//! The uniform backend contract shared by all storage tiers.
//!
//! Every backing store implements [`Backend`]: point CRUD over JSON values,
//! a finite key stream, an existence probe and an entry count. The facade
//! holds one `Arc<dyn Backend>` and swaps it by reassignment when the
//! fallback protocol promotes a replacement.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::StorageResult;

/// Finite asynchronous stream of keys. Emits zero or more keys, in
/// store-defined order, then completes.
pub type KeyStream = BoxStream<'static, StorageResult<String>>;

/// Which storage tier a backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Durable, versioned, transactional engine.
    Transactional,
    /// Synchronous string-only store wrapped for async parity.
    Text,
    /// In-process associative map.
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transactional => f.write_str("transactional"),
            Self::Text => f.write_str("text"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Read-only addressing metadata for a backend.
///
/// Intended for diagnostics and for code writing to the same underlying
/// store outside this library. Never mutated by the facade except when the
/// fallback protocol swaps the backend itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendInfo {
    /// Transactional tier addressing.
    Transactional {
        /// On-disk store name.
        store_name: String,
        /// Sub-partition within the store.
        partition: String,
        /// Structural schema version.
        version: u32,
    },
    /// Text tier addressing.
    Text {
        /// Prefix prepended to every key.
        key_prefix: String,
    },
    /// The memory tier carries no addressing metadata.
    Memory,
}

/// One concrete backing store.
///
/// Implementations are selected at construction by the
/// [selection policy](crate::select) and swapped at runtime by the facade's
/// fallback protocol; callers depend on this trait, never on a concrete
/// tier.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The tier this backend belongs to.
    fn kind(&self) -> BackendKind;

    /// Addressing metadata for this backend.
    fn info(&self) -> BackendInfo;

    /// Get the value for a key, or `None` if absent.
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Insert or replace the value for a key.
    ///
    /// `Value::Null` is a no-op success: null is never persisted.
    async fn set(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Remove a key. Succeeds even if the key was absent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Remove all entries.
    async fn clear(&self) -> StorageResult<()>;

    /// Stream all keys. Finite and non-restartable.
    async fn keys(&self) -> StorageResult<KeyStream>;

    /// Whether a key exists, without materializing its value where the
    /// engine allows it.
    async fn has(&self, key: &str) -> StorageResult<bool>;

    /// Number of stored entries.
    async fn size(&self) -> StorageResult<u64>;
}
