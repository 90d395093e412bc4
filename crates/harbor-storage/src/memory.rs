//! In-memory backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;

use crate::backend::{Backend, BackendInfo, BackendKind, KeyStream};
use crate::error::{StorageError, StorageResult};

/// In-process associative map backend.
///
/// Terminal fallback of the promotion chain, and the store of choice for
/// tests and non-persistent contexts. Async only for interface parity with
/// the other tiers.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Value>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::Memory
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::backend("get", e))?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::backend("set", e))?;
        data.insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::backend("delete", e))?;
        data.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::backend("clear", e))?;
        data.clear();
        Ok(())
    }

    async fn keys(&self) -> StorageResult<KeyStream> {
        let keys: Vec<String> = {
            let data = self
                .data
                .read()
                .map_err(|e| StorageError::backend("keys", e))?;
            data.keys().cloned().collect()
        };
        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn has(&self, key: &str) -> StorageResult<bool> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::backend("has", e))?;
        Ok(data.contains_key(key))
    }

    async fn size(&self) -> StorageResult<u64> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::backend("size", e))?;
        Ok(data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_set_round_trip() {
        let backend = MemoryBackend::new();
        backend.set("k", &json!({ "a": [1, 2] })).await.unwrap();
        assert_eq!(
            backend.get("k").await.unwrap(),
            Some(json!({ "a": [1, 2] }))
        );
    }

    #[tokio::test]
    async fn test_get_missing() {
        let backend = MemoryBackend::new();
        assert!(backend.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_is_never_persisted() {
        let backend = MemoryBackend::new();
        backend.set("k", &Value::Null).await.unwrap();
        assert!(backend.get("k").await.unwrap().is_none());
        assert_eq!(backend.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_absent_succeeds() {
        let backend = MemoryBackend::new();
        backend.delete("nothing").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_key_is_distinct() {
        let backend = MemoryBackend::new();
        backend.set("", &json!("empty")).await.unwrap();
        backend.set("x", &json!("x")).await.unwrap();
        assert_eq!(backend.get("").await.unwrap(), Some(json!("empty")));
        assert_eq!(backend.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_and_keys() {
        let backend = MemoryBackend::new();
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

        backend.clear().await.unwrap();
        assert_eq!(backend.size().await.unwrap(), 0);
        let remaining: Vec<_> = backend.keys().await.unwrap().collect().await;
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_has() {
        let backend = MemoryBackend::new();
        assert!(!backend.has("k").await.unwrap());
        backend.set("k", &json!(true)).await.unwrap();
        assert!(backend.has("k").await.unwrap());
    }
}
