//! Synchronous string-only store and its backend adapter.
//!
//! [`TextStore`] abstracts a purely synchronous store that can only hold
//! text. The handle is injected at construction rather than reached for as
//! ambient state, so the adapter is testable against [`MemoryTextStore`]
//! and deployable against [`FileTextStore`].
//!
//! [`TextBackend`] adapts any `TextStore` to the async [`Backend`] contract:
//! values are JSON-stringified under a configured key prefix, and reads that
//! fail to parse are reported as corruption, never as a silent absent.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use tracing::warn;

use crate::backend::{Backend, BackendInfo, BackendKind, KeyStream};
use crate::error::{StorageError, StorageResult};

/// A synchronous, string-only key-value store.
///
/// The contract mirrors the smallest useful native store: point reads and
/// writes of text plus an index-based key accessor. No ordering guarantee
/// is made for [`key_at`](Self::key_at) beyond being stable while the store
/// is not mutated.
pub trait TextStore: Send + Sync {
    /// Read the text stored under a key.
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store text under a key, replacing any previous value.
    fn write(&self, key: &str, text: &str) -> StorageResult<()>;

    /// Remove a key. Succeeds if the key was absent.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove every key in the store.
    fn clear(&self) -> StorageResult<()>;

    /// Number of keys in the store.
    fn len(&self) -> StorageResult<usize>;

    /// Whether the store holds no keys.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// The key at `index`, or `None` past the end.
    fn key_at(&self, index: usize) -> StorageResult<Option<String>>;
}

// ---------------------------------------------------------------------------
// In-memory text store
// ---------------------------------------------------------------------------

/// In-process [`TextStore`] for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryTextStore {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryTextStore {
    /// Create a new empty text store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextStore for MemoryTextStore {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::backend("read", e))?;
        Ok(data.get(key).cloned())
    }

    fn write(&self, key: &str, text: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::backend("write", e))?;
        data.insert(key.to_owned(), text.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::backend("remove", e))?;
        data.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::backend("clear", e))?;
        data.clear();
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::backend("len", e))?;
        Ok(data.len())
    }

    fn key_at(&self, index: usize) -> StorageResult<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::backend("key_at", e))?;
        Ok(data.keys().nth(index).cloned())
    }
}

// ---------------------------------------------------------------------------
// File-backed text store
// ---------------------------------------------------------------------------

/// Durable [`TextStore`] keeping one file per key in a directory.
///
/// Filenames are the hex encoding of the key bytes, so any key — including
/// the empty string — maps to a valid filename.
#[derive(Debug)]
pub struct FileTextStore {
    dir: PathBuf,
}

const FILE_SUFFIX: &str = ".txt";

impl FileTextStore {
    /// Open a file-backed text store rooted at `dir`, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::backend("open", e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{FILE_SUFFIX}", hex::encode(key)))
    }

    /// Keys currently on disk, in filename order.
    fn list_keys(&self) -> StorageResult<Vec<String>> {
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| StorageError::backend("read_dir", e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::backend("read_dir", e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(FILE_SUFFIX) else {
                continue;
            };
            if let Ok(bytes) = hex::decode(encoded)
                && let Ok(key) = String::from_utf8(bytes)
            {
                names.push(key);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl TextStore for FileTextStore {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::backend("read", e)),
        }
    }

    fn write(&self, key: &str, text: &str) -> StorageResult<()> {
        std::fs::write(self.path_for(key), text).map_err(|e| StorageError::backend("write", e))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::backend("remove", e)),
        }
    }

    fn clear(&self) -> StorageResult<()> {
        for key in self.list_keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.list_keys()?.len())
    }

    fn key_at(&self, index: usize) -> StorageResult<Option<String>> {
        Ok(self.list_keys()?.into_iter().nth(index))
    }
}

// ---------------------------------------------------------------------------
// Backend adapter
// ---------------------------------------------------------------------------

/// [`Backend`] adapter over a [`TextStore`].
///
/// Values are serialized to JSON text and stored under `{prefix}{key}`.
/// The underlying store is synchronous; operations are async-wrapped for
/// interface parity with the other tiers.
pub struct TextBackend {
    store: Arc<dyn TextStore>,
    prefix: String,
}

impl std::fmt::Debug for TextBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBackend")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl TextBackend {
    /// Create an adapter over `store` with the given key prefix.
    #[must_use]
    pub fn new(store: Arc<dyn TextStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// All logical (prefix-stripped) keys in the store.
    fn logical_keys(&self) -> StorageResult<Vec<String>> {
        let len = self.store.len()?;
        let mut keys = Vec::new();
        for index in 0..len {
            let Some(raw) = self.store.key_at(index)? else {
                break;
            };
            if let Some(key) = raw.strip_prefix(&self.prefix) {
                keys.push(key.to_owned());
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl Backend for TextBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Text
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::Text {
            key_prefix: self.prefix.clone(),
        }
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let Some(text) = self.store.read(&self.full_key(key))? else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Unparseable stored text means the entry was corrupted or
                // written by something else; surfacing it beats a silent
                // absent.
                warn!(key, error = %e, "stored text is not valid JSON");
                Err(StorageError::Serialization(format!(
                    "stored text for key {key:?} is not valid JSON: {e}"
                )))
            }
        }
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let text = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.write(&self.full_key(key), &text)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.store.remove(&self.full_key(key))
    }

    async fn clear(&self) -> StorageResult<()> {
        self.store.clear()
    }

    async fn keys(&self) -> StorageResult<KeyStream> {
        let keys = self.logical_keys()?;
        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.store.read(&self.full_key(key))?.is_some())
    }

    async fn size(&self) -> StorageResult<u64> {
        Ok(self.logical_keys()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_backend(prefix: &str) -> TextBackend {
        TextBackend::new(Arc::new(MemoryTextStore::new()), prefix)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let backend = memory_backend("app_");
        let value = json!({ "nested": { "list": [1, 2, 3] }, "flag": true });
        backend.set("config", &value).await.unwrap();
        assert_eq!(backend.get("config").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_prefix_is_applied() {
        let store = Arc::new(MemoryTextStore::new());
        let backend = TextBackend::new(Arc::clone(&store) as Arc<dyn TextStore>, "app_");
        backend.set("k", &json!(1)).await.unwrap();
        assert_eq!(store.read("app_k").unwrap(), Some("1".to_owned()));
    }

    #[tokio::test]
    async fn test_corrupt_text_is_an_error_not_absent() {
        let store = Arc::new(MemoryTextStore::new());
        store.write("k", "{not json").unwrap();
        let backend = TextBackend::new(store, "");
        assert!(matches!(
            backend.get("k").await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_null_is_never_persisted() {
        let backend = memory_backend("");
        backend.set("k", &Value::Null).await.unwrap();
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_strip_prefix_and_skip_foreign_entries() {
        let store = Arc::new(MemoryTextStore::new());
        store.write("other_x", "1").unwrap();
        let backend = TextBackend::new(store, "app_");
        backend.set("a", &json!(1)).await.unwrap();
        backend.set("b", &json!(2)).await.unwrap();

        let mut keys: Vec<String> = backend
            .keys()
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(backend.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_has() {
        let backend = memory_backend("");
        backend.set("k", &json!("v")).await.unwrap();
        assert!(backend.has("k").await.unwrap());
        backend.delete("k").await.unwrap();
        assert!(!backend.has("k").await.unwrap());
        backend.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTextStore::open(dir.path()).unwrap();
        store.write("greeting", "\"hello\"").unwrap();
        assert_eq!(store.read("greeting").unwrap(), Some("\"hello\"".to_owned()));
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.key_at(0).unwrap(), Some("greeting".to_owned()));
        store.remove("greeting").unwrap();
        assert!(store.read("greeting").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = TextBackend::new(Arc::new(FileTextStore::open(dir.path()).unwrap()), "");
            backend.set("k", &json!({ "durable": true })).await.unwrap();
        }
        let backend = TextBackend::new(Arc::new(FileTextStore::open(dir.path()).unwrap()), "");
        assert_eq!(
            backend.get("k").await.unwrap(),
            Some(json!({ "durable": true }))
        );
    }

    #[tokio::test]
    async fn test_file_store_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTextStore::open(dir.path()).unwrap();
        store.write("", "0").unwrap();
        assert_eq!(store.read("").unwrap(), Some("0".to_owned()));
        assert_eq!(store.key_at(0).unwrap(), Some(String::new()));
        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }
}
