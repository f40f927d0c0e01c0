//! The storage contract.
//!
//! Every backend implements [`Reader`], [`Writer`] and [`Remover`]. Backends
//! that can enumerate their keys also implement [`Lister`]. The TTL cache
//! decorator consumes a [`ReadWriter`] and is itself one, so it can sit in
//! front of any adapter, including another cache.
//!
//! # Missing keys
//!
//! `read` must return [`StorageError::NotFound`](crate::StorageError::NotFound)
//! when nothing is stored under the key. Each adapter maps its backend's own
//! "missing" signal onto that variant so callers branch on one error kind.
//!
//! # Example
//!
//! ```ignore
//! use stashkit::{MemoryStorage, Reader, StorageError, Writer};
//!
//! let store = MemoryStorage::new();
//! store.write("users/42", b"alice", None).await?;
//!
//! match store.read("users/43").await {
//!     Err(StorageError::NotFound) => println!("create path"),
//!     other => println!("update path: {other:?}"),
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::options::Options;

/// Reads a single object.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Returns the bytes last written under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key was never written or has
    /// been removed, and a backend error for any other failure.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;
}

/// Creates or replaces a single object.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Stores `body` under `key`, replacing any previous value.
    ///
    /// `options` of `None` means adapter defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects or fails the write.
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()>;
}

/// Deletes a single object.
///
/// Removing a key that does not exist is backend-specific: some adapters
/// succeed silently, others surface an error. See each adapter's docs.
#[async_trait]
pub trait Remover: Send + Sync {
    /// Removes the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails the delete.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Enumerates keys under a prefix.
#[async_trait]
pub trait Lister: Reader {
    /// Returns every key under `prefix`. Ordering is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing itself fails.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Reads every object under `prefix`.
    ///
    /// A key that disappears between listing and reading is an error, not
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns the listing error, or the first read error.
    async fn all(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        let keys = self.keys(prefix).await?;

        let mut objects = Vec::with_capacity(keys.len());
        for key in &keys {
            objects.push(self.read(key).await?);
        }

        Ok(objects)
    }
}

/// A store that can be read and written.
pub trait ReadWriter: Reader + Writer {}

impl<T: Reader + Writer + ?Sized> ReadWriter for T {}

/// The full per-key contract: read, write and remove.
pub trait Storage: ReadWriter + Remover {}

impl<T: ReadWriter + Remover + ?Sized> Storage for T {}

#[async_trait]
impl<T: Reader + ?Sized> Reader for Arc<T> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        (**self).read(key).await
    }
}

#[async_trait]
impl<T: Writer + ?Sized> Writer for Arc<T> {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        (**self).write(key, body, options).await
    }
}

#[async_trait]
impl<T: Remover + ?Sized> Remover for Arc<T> {
    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}

#[async_trait]
impl<T: Lister + ?Sized> Lister for Arc<T> {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys(prefix).await
    }

    async fn all(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        (**self).all(prefix).await
    }
}

#[async_trait]
impl<T: Reader + ?Sized> Reader for Box<T> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        (**self).read(key).await
    }
}

#[async_trait]
impl<T: Writer + ?Sized> Writer for Box<T> {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        (**self).write(key, body, options).await
    }
}

#[async_trait]
impl<T: Remover + ?Sized> Remover for Box<T> {
    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}

#[async_trait]
impl<T: Lister + ?Sized> Lister for Box<T> {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys(prefix).await
    }

    async fn all(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        (**self).all(prefix).await
    }
}

/// Joins a namespace root and a key with `/`. An empty root leaves the key
/// untouched.
pub(crate) fn namespaced(root: &str, key: &str) -> String {
    if root.is_empty() {
        key.to_string()
    } else {
        format!("{root}{}{key}", crate::constants::KEY_SEPARATOR)
    }
}
