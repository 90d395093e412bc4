#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Harbor Storage — unified asynchronous key-value storage.
//!
//! One [`Storage`] entry point over three interchangeable backing tiers:
//!
//! - [`TransactionalBackend`] — durable, versioned, transactional engine
//!   (embedded `SurrealKV`), opened lazily on first use
//! - [`TextBackend`] — a synchronous, string-only store (injected
//!   [`TextStore`] handle) wrapped for async parity
//! - [`MemoryBackend`] — in-process map, the terminal fallback
//!
//! The [selection policy](select) picks the best available tier at
//! construction. If the transactional tier later reports itself broken,
//! the facade transparently retries the failed operation on a fallback
//! tier and sticks with it — callers observe nothing but latency.
//!
//! Reads and writes can be validated against a declarative
//! [`harbor_schema::Schema`], and every key can be watched as a
//! replay-latest stream of its values.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use harbor_storage::{Storage, StorageConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> harbor_storage::StorageResult<()> {
//!     let storage = Storage::open(StorageConfig::default().with_data_dir("./data"));
//!
//!     storage.set("user", &json!({ "name": "ada" }), None).await?;
//!     let user = storage.get("user", None).await?;
//!     println!("{user:?}");
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod facade;
pub mod memory;
pub mod select;
pub mod text;
pub mod transactional;
pub mod watch;

pub use backend::{Backend, BackendInfo, BackendKind, KeyStream};
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use facade::{Storage, StorageBuilder};
pub use memory::MemoryBackend;
pub use text::{FileTextStore, MemoryTextStore, TextBackend, TextStore};
pub use transactional::TransactionalBackend;
pub use watch::WatchStream;

// The schema types are part of this crate's public API surface.
pub use harbor_schema as schema;
