//! Key-addressed blob storage with interchangeable backends.
//!
//! Callers program against a small async contract ([`Reader`], [`Writer`],
//! [`Remover`], [`Lister`]) and pick the backend at construction time:
//!
//! - [`FilesystemStorage`]: one file per key under a root directory
//! - [`MemoryStorage`]: process-local, ephemeral
//! - [`KvStorage`]: Redis-compatible server, dedicated or pooled connections
//! - [`ObjectStorage`]: cloud object store behind an [`ObjectStoreClient`]
//!
//! Any store that can be read and written can be wrapped in a [`TtlCache`],
//! which serves recently read or written keys from memory until their
//! time-to-live elapses.
//!
//! A missing key is always [`StorageError::NotFound`], whichever backend
//! produced it.
//!
//! # Example
//!
//! ```ignore
//! use stashkit::{FilesystemStorage, Reader, TtlCache, Writer};
//!
//! let store = TtlCache::from_secs(FilesystemStorage::new("/var/lib/app"), 30);
//! store.write("reports/q1.csv", b"a,b,c", None).await?;
//! let body = store.read("reports/q1.csv").await?;
//! ```
//!
//! Stores can also be described in TOML and opened through [`StoreConfig`].

pub mod backends;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod options;
pub mod storage;

pub use backends::kv::{
    ConnectionSource, Connector, Dedicated, KvConnection, Pool, Reply, RespConnection,
    RespConnector,
};
pub use backends::object_store::{ObjectStoreError, PutObject};
pub use backends::{FilesystemStorage, KvStorage, MemoryStorage, ObjectStorage, ObjectStoreClient};
pub use cache::TtlCache;
pub use config::{BackendConfig, CacheConfig, StoreConfig, ValidationResult};
pub use error::{BoxError, Result, StorageError};
pub use options::Options;
pub use storage::{Lister, ReadWriter, Reader, Remover, Storage, Writer};
