//! In-memory storage adapter.
//!
//! Provides a fast, non-persistent store for tests and ephemeral use. All
//! data is lost when the adapter is dropped.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Result, StorageError};
use crate::options::Options;
use crate::storage::{Lister, Reader, Remover, Writer};

/// In-memory object storage using `DashMap`.
///
/// Data is scoped to this instance. Clones are independent copies, not
/// handles to the same table; share one instance behind an `Arc` instead.
///
/// Write options are ignored.
///
/// # Example
///
/// ```ignore
/// use stashkit::{MemoryStorage, Lister, Writer};
///
/// let store = MemoryStorage::new();
/// store.write("a/b", b"v1", None).await?;
/// store.write("a/c", b"v2", None).await?;
/// assert_eq!(store.keys("a").await?.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clears all objects from the store.
    pub fn clear(&self) {
        self.data.clear();
    }
}

#[async_trait]
impl Reader for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.data
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl Writer for MemoryStorage {
    async fn write(&self, key: &str, body: &[u8], _options: Option<&Options>) -> Result<()> {
        self.data.insert(key.to_string(), body.to_vec());
        Ok(())
    }
}

/// Removing an absent key succeeds.
#[async_trait]
impl Remover for MemoryStorage {
    async fn remove(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }
}

#[async_trait]
impl Lister for MemoryStorage {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}
