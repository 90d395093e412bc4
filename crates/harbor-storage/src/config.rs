//! Storage configuration.
//!
//! Consumed once at construction; none of these knobs are consulted on the
//! hot path.

use std::path::PathBuf;

/// Construction-time configuration for a [`Storage`](crate::Storage)
/// instance and its backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Name of the transactional engine's on-disk store (directory under
    /// [`data_dir`](Self::data_dir)).
    pub store_name: String,
    /// Sub-partition within the store that this instance reads and writes.
    pub partition: String,
    /// Structural schema version of the partition, recorded on first
    /// connection.
    pub version: u32,
    /// Persist values inside a legacy `{"raw": ...}` envelope for
    /// compatibility with stores written by older generations of this
    /// library.
    pub wrap_values: bool,
    /// Prefix prepended to every key in the text backend.
    pub key_prefix: String,
    /// Filesystem root for the transactional engine. `None` disables the
    /// transactional tier entirely.
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_name: "harbor".to_owned(),
            partition: "kv".to_owned(),
            version: 1,
            wrap_values: false,
            key_prefix: String::new(),
            data_dir: None,
        }
    }
}

impl StorageConfig {
    /// Set the transactional store name.
    #[must_use]
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Set the sub-partition name.
    #[must_use]
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Set the structural schema version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable the legacy value-wrapping envelope.
    #[must_use]
    pub fn with_wrapped_values(mut self) -> Self {
        self.wrap_values = true;
        self
    }

    /// Set the text-backend key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the filesystem root for the transactional engine.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }
}
