//! Store selection policy.
//!
//! Probes the runtime in strict order — transactional engine, injected
//! text store, memory — and constructs the first viable backend. Runs once
//! at construction, outside the hot path; the only later re-evaluation is
//! the facade's fallback protocol.

use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::config::StorageConfig;
use crate::memory::MemoryBackend;
use crate::text::{TextBackend, TextStore};
use crate::transactional::TransactionalBackend;

/// Whether the transactional tier is minimally functional: a data directory
/// is configured and the store path can be created.
fn transactional_available(config: &StorageConfig) -> bool {
    config
        .data_dir
        .as_ref()
        .is_some_and(|dir| std::fs::create_dir_all(dir.join(&config.store_name)).is_ok())
}

/// Construct the first viable backend for `config`.
pub fn select_backend(
    config: &StorageConfig,
    text_store: Option<&Arc<dyn TextStore>>,
) -> Arc<dyn Backend> {
    if transactional_available(config)
        && let Ok(backend) = TransactionalBackend::new(config)
    {
        debug!(store = %config.store_name, "selected transactional backend");
        return Arc::new(backend);
    }
    if let Some(store) = text_store {
        debug!(prefix = %config.key_prefix, "selected text backend");
        return Arc::new(TextBackend::new(
            Arc::clone(store),
            config.key_prefix.clone(),
        ));
    }
    debug!("selected memory backend");
    Arc::new(MemoryBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::text::MemoryTextStore;

    #[test]
    fn test_no_capabilities_selects_memory() {
        let backend = select_backend(&StorageConfig::default(), None);
        assert_eq!(backend.kind(), BackendKind::Memory);
    }

    #[test]
    fn test_text_store_outranks_memory() {
        let store: Arc<dyn TextStore> = Arc::new(MemoryTextStore::new());
        let backend = select_backend(&StorageConfig::default(), Some(&store));
        assert_eq!(backend.kind(), BackendKind::Text);
    }

    #[test]
    fn test_transactional_outranks_text() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::default().with_data_dir(dir.path());
        let store: Arc<dyn TextStore> = Arc::new(MemoryTextStore::new());
        let backend = select_backend(&config, Some(&store));
        assert_eq!(backend.kind(), BackendKind::Transactional);
    }

    #[test]
    fn test_unusable_data_dir_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        // Occupy the store path with a file so the directory probe fails.
        std::fs::write(dir.path().join("harbor"), b"occupied").unwrap();
        let config = StorageConfig::default().with_data_dir(dir.path());
        let backend = select_backend(&config, None);
        assert_eq!(backend.kind(), BackendKind::Memory);
    }
}
