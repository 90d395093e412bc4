//! Transactional backend over an embedded `SurrealKV` tree.
//!
//! The engine is durable, versioned and ACID-compliant; every operation
//! here runs inside its own transaction. The tree is opened lazily on the
//! first operation and the outcome — ready or broken — is held in a
//! single-slot cell, so late operations observe the same connection (or the
//! same failure) without re-opening.
//!
//! A broken connection is sticky: once the open fails, every pending and
//! future operation fails with [`StorageError::StoreBroken`], the signal
//! the facade's fallback protocol pattern-matches on.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::backend::{Backend, BackendInfo, BackendKind, KeyStream};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Reserved partition holding per-partition structural metadata.
const META_PARTITION: &str = "__harbor_meta__";

/// Field name of the legacy value-wrapping envelope.
const WRAP_FIELD: &str = "raw";

/// Build the composite key `"{partition}\0{key}"` as bytes.
fn composite_key(partition: &str, key: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(partition.len().saturating_add(1).saturating_add(key.len()));
    buf.extend_from_slice(partition.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// Start of the partition range (inclusive): `"{partition}\0"`.
fn partition_range_start(partition: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(partition.len().saturating_add(1));
    buf.extend_from_slice(partition.as_bytes());
    buf.push(0);
    buf
}

/// End of the partition range (exclusive): `"{partition}\x01"`.
///
/// `\0` is the separator, so every key in the partition sorts inside
/// `["{partition}\0", "{partition}\x01")`.
fn partition_range_end(partition: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(partition.len().saturating_add(1));
    buf.extend_from_slice(partition.as_bytes());
    buf.push(1);
    buf
}

/// Keys containing the NUL separator would escape their partition.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Outcome of the one-time lazy open.
enum Connection {
    Ready(surrealkv::Tree),
    Broken(String),
}

/// Durable transactional tier backed by `SurrealKV`.
///
/// Stores written by earlier generations wrap every value in a single-field
/// `{"raw": ...}` envelope; reads unwrap that shape transparently. A caller
/// value of exactly that shape is indistinguishable from the envelope and
/// reads back unwrapped.
pub struct TransactionalBackend {
    store_name: String,
    partition: String,
    version: u32,
    wrap_values: bool,
    path: PathBuf,
    conn: OnceCell<Connection>,
}

impl std::fmt::Debug for TransactionalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalBackend")
            .field("store_name", &self.store_name)
            .field("partition", &self.partition)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl TransactionalBackend {
    /// Create a backend for the store and partition named by `config`.
    ///
    /// No I/O happens here: the engine is opened lazily on the first
    /// operation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StoreBroken`] if `config` carries no data
    /// directory, meaning the transactional tier is not available at all.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let Some(data_dir) = &config.data_dir else {
            return Err(StorageError::StoreBroken(
                "transactional tier not configured: no data directory".into(),
            ));
        };
        Ok(Self {
            store_name: config.store_name.clone(),
            partition: config.partition.clone(),
            version: config.version,
            wrap_values: config.wrap_values,
            path: data_dir.join(&config.store_name),
            conn: OnceCell::new(),
        })
    }

    /// Flush and close the engine if it was ever opened.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the flush fails.
    pub async fn close(&self) -> StorageResult<()> {
        if let Some(Connection::Ready(tree)) = self.conn.get() {
            tree.close()
                .await
                .map_err(|e| StorageError::backend("close", e))?;
        }
        Ok(())
    }

    /// The connected tree, opening it on first use.
    async fn tree(&self) -> StorageResult<&surrealkv::Tree> {
        match self.conn.get_or_init(|| self.open()).await {
            Connection::Ready(tree) => Ok(tree),
            Connection::Broken(reason) => Err(StorageError::StoreBroken(reason.clone())),
        }
    }

    async fn open(&self) -> Connection {
        debug!(
            store = %self.store_name,
            partition = %self.partition,
            path = %self.path.display(),
            "opening transactional store"
        );
        let tree = match surrealkv::TreeBuilder::new()
            .with_path(self.path.clone())
            .build()
        {
            Ok(tree) => tree,
            Err(e) => {
                warn!(store = %self.store_name, error = %e, "transactional store failed to open");
                return Connection::Broken(e.to_string());
            }
        };
        match self.ensure_partition(&tree).await {
            Ok(()) => Connection::Ready(tree),
            Err(e) => {
                warn!(store = %self.store_name, error = %e, "partition initialization failed");
                Connection::Broken(e.to_string())
            }
        }
    }

    /// One-time structural step on first connection: record the partition's
    /// schema version under the reserved meta partition. Re-opens at the
    /// same version reuse the existing structure.
    async fn ensure_partition(&self, tree: &surrealkv::Tree) -> StorageResult<()> {
        let meta = composite_key(META_PARTITION, &self.partition);
        let tx = tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|e| StorageError::backend("open", e))?;
        let recorded = tx
            .get(&meta)
            .map_err(|e| StorageError::backend("open", e))?
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|s| s.parse::<u32>().ok());
        if recorded == Some(self.version) {
            return Ok(());
        }

        let mut wtx = tree.begin().map_err(|e| StorageError::backend("open", e))?;
        wtx.set(&meta, self.version.to_string().as_bytes())
            .map_err(|e| StorageError::backend("open", e))?;
        wtx.commit()
            .await
            .map_err(|e| StorageError::backend("open", e))?;
        debug!(
            partition = %self.partition,
            from = recorded,
            to = self.version,
            "partition version recorded"
        );
        Ok(())
    }

    fn encode(&self, value: &Value) -> StorageResult<Vec<u8>> {
        let persisted = if self.wrap_values {
            let mut envelope = serde_json::Map::with_capacity(1);
            envelope.insert(WRAP_FIELD.to_owned(), value.clone());
            Value::Object(envelope)
        } else {
            value.clone()
        };
        serde_json::to_vec(&persisted).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Decode stored bytes, transparently unwrapping the legacy envelope
    /// when the stored shape matches it.
    fn decode(bytes: &[u8], key: &str) -> StorageResult<Value> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            StorageError::Serialization(format!(
                "stored data for key {key:?} is not valid JSON: {e}"
            ))
        })?;
        if let Value::Object(map) = &value
            && map.len() == 1
            && let Some(inner) = map.get(WRAP_FIELD)
        {
            return Ok(inner.clone());
        }
        Ok(value)
    }
}

#[async_trait]
impl Backend for TransactionalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Transactional
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::Transactional {
            store_name: self.store_name.clone(),
            partition: self.partition.clone(),
            version: self.version,
        }
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        validate_key(key)?;
        let tree = self.tree().await?;
        let ck = composite_key(&self.partition, key);
        let tx = tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|e| StorageError::backend("get", e))?;
        match tx.get(&ck).map_err(|e| StorageError::backend("get", e))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes, key)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        validate_key(key)?;
        if value.is_null() {
            return Ok(());
        }
        let bytes = self.encode(value)?;
        let tree = self.tree().await?;
        let ck = composite_key(&self.partition, key);
        // Unconditional upsert: the engine's `set` is insert-or-replace
        // within one transaction, so no existence check is needed.
        let mut tx = tree.begin().map_err(|e| StorageError::backend("set", e))?;
        tx.set(&ck, &bytes)
            .map_err(|e| StorageError::backend("set", e))?;
        tx.commit()
            .await
            .map_err(|e| StorageError::backend("set", e))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let tree = self.tree().await?;
        let ck = composite_key(&self.partition, key);
        let mut tx = tree
            .begin()
            .map_err(|e| StorageError::backend("delete", e))?;
        let existed = tx
            .get(&ck)
            .map_err(|e| StorageError::backend("delete", e))?
            .is_some();
        if existed {
            tx.delete(&ck)
                .map_err(|e| StorageError::backend("delete", e))?;
            tx.commit()
                .await
                .map_err(|e| StorageError::backend("delete", e))?;
        }
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let tree = self.tree().await?;
        let start = partition_range_start(&self.partition);
        let end = partition_range_end(&self.partition);

        let mut tx = tree.begin().map_err(|e| StorageError::backend("clear", e))?;

        // Collect keys first, then delete: the iterator borrows tx
        // immutably.
        let doomed = {
            let mut iter = tx
                .range(&start, &end)
                .map_err(|e| StorageError::backend("clear", e))?;
            iter.seek_first()
                .map_err(|e| StorageError::backend("clear", e))?;
            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key());
                iter.next().map_err(|e| StorageError::backend("clear", e))?;
            }
            keys
        };

        for key in &doomed {
            tx.delete(key)
                .map_err(|e| StorageError::backend("clear", e))?;
        }
        if !doomed.is_empty() {
            tx.commit()
                .await
                .map_err(|e| StorageError::backend("clear", e))?;
        }
        Ok(())
    }

    async fn keys(&self) -> StorageResult<KeyStream> {
        let tree = self.tree().await?;
        let start = partition_range_start(&self.partition);
        let end = partition_range_end(&self.partition);
        let prefix_len = self.partition.len().saturating_add(1);

        let tx = tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|e| StorageError::backend("keys", e))?;
        let mut iter = tx
            .range(&start, &end)
            .map_err(|e| StorageError::backend("keys", e))?;
        iter.seek_first()
            .map_err(|e| StorageError::backend("keys", e))?;

        let mut keys = Vec::new();
        while iter.valid() {
            let raw_key = iter.key();
            if raw_key.len() >= prefix_len
                && let Ok(key) = std::str::from_utf8(&raw_key[prefix_len..])
            {
                keys.push(key.to_owned());
            }
            iter.next().map_err(|e| StorageError::backend("keys", e))?;
        }
        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn has(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let tree = self.tree().await?;
        let ck = composite_key(&self.partition, key);
        let tx = tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|e| StorageError::backend("has", e))?;
        // The engine exposes no key-only lookup, so this is the full-value
        // variant of the existence check.
        Ok(tx
            .get(&ck)
            .map_err(|e| StorageError::backend("has", e))?
            .is_some())
    }

    async fn size(&self) -> StorageResult<u64> {
        let tree = self.tree().await?;
        let start = partition_range_start(&self.partition);
        let end = partition_range_end(&self.partition);

        let tx = tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|e| StorageError::backend("size", e))?;
        let mut iter = tx
            .range(&start, &end)
            .map_err(|e| StorageError::backend("size", e))?;
        iter.seek_first()
            .map_err(|e| StorageError::backend("size", e))?;

        let mut count: u64 = 0;
        while iter.valid() {
            count = count.saturating_add(1);
            iter.next().map_err(|e| StorageError::backend("size", e))?;
        }
        Ok(count)
    }
}
