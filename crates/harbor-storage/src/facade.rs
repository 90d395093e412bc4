//! The unified storage entry point.
//!
//! [`Storage`] exposes one asynchronous CRUD contract regardless of which
//! backend is active, adds schema validation around reads and writes,
//! maintains per-key watch channels, and runs the fallback protocol: when
//! the active backend reports itself broken, the failed operation is
//! retried exactly once on a freshly constructed fallback backend, which
//! then sticks for the rest of the session.

use std::sync::Arc;

use harbor_schema::{Schema, validate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{trace, warn};

use crate::backend::{Backend, BackendInfo, BackendKind, KeyStream};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryBackend;
use crate::select::select_backend;
use crate::text::{TextBackend, TextStore};
use crate::watch::{WatchStream, WatcherMap};

/// Unified asynchronous key-value storage.
///
/// Construct with [`Storage::open`] for the default selection policy, or
/// [`Storage::builder`] to inject a text store handle or a pre-built
/// backend.
///
/// # Example
///
/// ```rust,no_run
/// use harbor_storage::{Storage, StorageConfig};
/// use serde_json::json;
///
/// # async fn demo() -> harbor_storage::StorageResult<()> {
/// let storage = Storage::open(StorageConfig::default().with_data_dir("./data"));
/// storage.set("greeting", &json!("hello"), None).await?;
/// assert_eq!(
///     storage.get("greeting", None).await?,
///     Some(json!("hello"))
/// );
/// # Ok(())
/// # }
/// ```
pub struct Storage {
    active: RwLock<Arc<dyn Backend>>,
    watchers: WatcherMap,
    fallback_text: Option<Arc<dyn TextStore>>,
    key_prefix: String,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

/// Builder for [`Storage`].
#[derive(Default)]
pub struct StorageBuilder {
    config: StorageConfig,
    text_store: Option<Arc<dyn TextStore>>,
    backend: Option<Arc<dyn Backend>>,
}

impl StorageBuilder {
    /// Use the given configuration.
    #[must_use]
    pub fn config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply a synchronous text store handle.
    ///
    /// Makes the text tier available both to the selection policy and as
    /// the preferred fallback target.
    #[must_use]
    pub fn text_store(mut self, store: Arc<dyn TextStore>) -> Self {
        self.text_store = Some(store);
        self
    }

    /// Bypass the selection policy and start on the given backend.
    ///
    /// The fallback protocol still applies if the backend reports itself
    /// broken.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the storage instance.
    #[must_use]
    pub fn open(self) -> Storage {
        let backend = self
            .backend
            .unwrap_or_else(|| select_backend(&self.config, self.text_store.as_ref()));
        Storage {
            active: RwLock::new(backend),
            watchers: WatcherMap::default(),
            fallback_text: self.text_store,
            key_prefix: self.config.key_prefix,
        }
    }
}

impl Storage {
    /// Open storage with the default selection policy.
    #[must_use]
    pub fn open(config: StorageConfig) -> Self {
        Self::builder().config(config).open()
    }

    /// Start building a storage instance.
    #[must_use]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::default()
    }

    /// The tier of the currently active backend.
    pub async fn backend_kind(&self) -> BackendKind {
        self.active.read().await.kind()
    }

    /// Addressing metadata of the currently active backend.
    pub async fn backend_info(&self) -> BackendInfo {
        self.active.read().await.info()
    }

    async fn active(&self) -> Arc<dyn Backend> {
        Arc::clone(&*self.active.read().await)
    }

    /// Replace the broken active backend with the best available fallback
    /// and return it. The swap is sticky for the rest of the session.
    async fn promote(&self, reason: &str) -> Arc<dyn Backend> {
        let replacement: Arc<dyn Backend> = match &self.fallback_text {
            Some(store) => Arc::new(TextBackend::new(
                Arc::clone(store),
                self.key_prefix.clone(),
            )),
            None => Arc::new(MemoryBackend::new()),
        };
        let mut active = self.active.write().await;
        warn!(
            reason,
            from = %active.kind(),
            to = %replacement.kind(),
            "active backend broken, promoting fallback"
        );
        *active = Arc::clone(&replacement);
        replacement
    }

    /// Get the value for a key.
    ///
    /// When a schema is supplied and the value is present, the value is
    /// validated; absent values bypass validation entirely.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] if present data violates the
    /// schema, or the underlying backend error.
    pub async fn get(&self, key: &str, schema: Option<&Schema>) -> StorageResult<Option<Value>> {
        let backend = self.active().await;
        let value = match backend.get(key).await {
            Err(StorageError::StoreBroken(reason)) => {
                self.promote(&reason).await.get(key).await
            }
            other => other,
        }?;
        if let (Some(value), Some(schema)) = (&value, schema)
            && !validate(value, schema)?
        {
            return Err(StorageError::Validation {
                key: key.to_owned(),
            });
        }
        Ok(value)
    }

    /// Set the value for a key.
    ///
    /// A `Value::Null` value is redirected to [`delete`](Self::delete).
    /// When a schema is supplied, the value is validated before the write
    /// reaches the backend. On success the key's watcher, if any, observes
    /// the new value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] if the value violates the
    /// schema, [`StorageError::Serialization`] if the active backend cannot
    /// represent it, or the underlying backend error.
    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        schema: Option<&Schema>,
    ) -> StorageResult<()> {
        if value.is_null() {
            return self.delete(key).await;
        }
        if let Some(schema) = schema
            && !validate(value, schema)?
        {
            return Err(StorageError::Validation {
                key: key.to_owned(),
            });
        }

        let backend = self.active().await;
        match backend.set(key, value).await {
            Err(StorageError::StoreBroken(reason)) => {
                self.promote(&reason).await.set(key, value).await
            }
            other => other,
        }?;

        trace!(key, "value stored");
        self.watchers.notify(key, Some(value.clone()));
        Ok(())
    }

    /// Remove a key. Succeeds even if the key was absent; the key's
    /// watcher, if any, observes the absence.
    ///
    /// # Errors
    ///
    /// Returns the underlying backend error.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let backend = self.active().await;
        match backend.delete(key).await {
            Err(StorageError::StoreBroken(reason)) => {
                self.promote(&reason).await.delete(key).await
            }
            other => other,
        }?;
        self.watchers.notify(key, None);
        Ok(())
    }

    /// Remove all entries. Every currently watched key observes the
    /// absence.
    ///
    /// # Errors
    ///
    /// Returns the underlying backend error.
    pub async fn clear(&self) -> StorageResult<()> {
        let backend = self.active().await;
        match backend.clear().await {
            Err(StorageError::StoreBroken(reason)) => self.promote(&reason).await.clear().await,
            other => other,
        }?;
        self.watchers.notify_all_absent();
        Ok(())
    }

    /// Stream all keys. Finite; emits zero or more keys then completes.
    ///
    /// # Errors
    ///
    /// Returns the underlying backend error.
    pub async fn keys(&self) -> StorageResult<KeyStream> {
        let backend = self.active().await;
        match backend.keys().await {
            Err(StorageError::StoreBroken(reason)) => self.promote(&reason).await.keys().await,
            other => other,
        }
    }

    /// Whether a key exists.
    ///
    /// # Errors
    ///
    /// Returns the underlying backend error.
    pub async fn has(&self, key: &str) -> StorageResult<bool> {
        let backend = self.active().await;
        match backend.has(key).await {
            Err(StorageError::StoreBroken(reason)) => self.promote(&reason).await.has(key).await,
            other => other,
        }
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns the underlying backend error.
    pub async fn size(&self) -> StorageResult<u64> {
        let backend = self.active().await;
        match backend.size().await {
            Err(StorageError::StoreBroken(reason)) => self.promote(&reason).await.size().await,
            other => other,
        }
    }

    /// Watch a key for live updates.
    ///
    /// The returned stream immediately yields the current value (validated
    /// against `schema` when one is given), then the value after every
    /// subsequent mutation through this instance. The stream is infinite;
    /// cancel by dropping it. Repeated calls for the same key share one
    /// underlying channel.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] if the current value violates
    /// the schema, or the underlying backend error from the initial read.
    pub async fn watch(&self, key: &str, schema: Option<&Schema>) -> StorageResult<WatchStream> {
        if let Some((stream, current)) = self.watchers.subscribe(key) {
            if let (Some(value), Some(schema)) = (&current, schema)
                && !validate(value, schema)?
            {
                return Err(StorageError::Validation {
                    key: key.to_owned(),
                });
            }
            return Ok(stream);
        }
        let current = self.get(key, schema).await?;
        let stream = self.watchers.subscribe_or_create(key, current.clone());
        // A write landing between the priming read and the channel creation
        // has no channel to notify yet. Re-read once after creation; writes
        // from here on notify the channel directly.
        let latest = self.get(key, None).await?;
        if latest != current {
            self.watchers.notify(key, latest);
        }
        Ok(stream)
    }

    /// Get a key's value deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored value does not
    /// deserialize into `T`, or the underlying backend error.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key, None).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if `value` does not
    /// serialize, or the underlying backend error.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(key, &value, None).await
    }
}
