//! Storage adapters.
//!
//! Each adapter translates the storage contract onto one backend and maps
//! that backend's "missing key" signal to `StorageError::NotFound`.
//!
//! - [`FilesystemStorage`]: files under a root directory
//! - [`MemoryStorage`]: process-local map, for tests and ephemeral data
//! - [`KvStorage`]: Redis-compatible server over RESP
//! - [`ObjectStorage`]: cloud object store through an [`ObjectStoreClient`]

pub mod filesystem;
pub mod kv;
pub mod memory;
pub mod object_store;

pub use filesystem::FilesystemStorage;
pub use kv::KvStorage;
pub use memory::MemoryStorage;
pub use object_store::{ObjectStorage, ObjectStoreClient};
