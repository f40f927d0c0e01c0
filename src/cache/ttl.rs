//! Time-to-live read cache in front of any store.
//!
//! [`TtlCache`] wraps a backing store and keeps the bytes of recently read or
//! written keys in memory for a fixed duration. Expiry is checked lazily on
//! access; nothing sweeps the table in the background, and nothing bounds it
//! other than the TTL.
//!
//! ## Per-key states
//!
//! - **Absent**: no entry, a read falls through to the backing store
//! - **Fresh**: entry whose expiry is strictly after now, served directly
//! - **Expired**: treated exactly like absent, replaced on the next read
//!
//! ## Locking
//!
//! One reader/writer lock guards the whole table. Lookups take it shared.
//! Installs take it exclusive. A write holds the exclusive lock across both
//! the backing-store write and the install, so a concurrent read sees either
//! the previous entry or the new one, never a half-written state.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::constants;
use crate::error::Result;
use crate::options::Options;
use crate::storage::{Lister, ReadWriter, Reader, Remover, Writer};

#[derive(Debug, Clone)]
struct Entry {
    object: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn new(object: Vec<u8>, ttl: Duration) -> Self {
        Self {
            object,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Read cache with a fixed time-to-live, wrapping a backing store.
///
/// `TtlCache` implements the same contract it consumes, so it can be handed
/// to callers in place of the bare store or nested inside another cache.
///
/// A successful write updates the backing store first and only then installs
/// the entry. Failed reads and writes leave the table untouched and return
/// the backing store's error unchanged.
///
/// The per-write `Options::ttl` is passed to the backing store and has no
/// effect on how long this cache keeps the entry.
///
/// # Example
///
/// ```ignore
/// use stashkit::{MemoryStorage, Reader, TtlCache, Writer};
/// use std::time::Duration;
///
/// let cache = TtlCache::new(MemoryStorage::new(), Duration::from_secs(30));
/// cache.write("k", b"v", None).await?;
/// assert_eq!(cache.read("k").await?, b"v"); // served from memory
/// ```
#[derive(Debug)]
pub struct TtlCache<S> {
    store: S,
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl<S: ReadWriter> TtlCache<S> {
    /// Wraps `store`, caching entries for `ttl`.
    ///
    /// A `ttl` above `MAX_CACHE_TTL_SECS` is clamped to it.
    pub fn new(store: S, ttl: Duration) -> Self {
        let max = Duration::from_secs(constants::MAX_CACHE_TTL_SECS);
        if ttl > max {
            tracing::debug!(requested = ?ttl, clamped = ?max, "Cache TTL clamped");
        }

        Self {
            store,
            entries: RwLock::new(HashMap::new()),
            ttl: ttl.min(max),
        }
    }

    /// Wraps `store`, caching entries for `secs` whole seconds.
    pub fn from_secs(store: S, secs: u64) -> Self {
        Self::new(store, Duration::from_secs(secs))
    }
}

impl<S> TtlCache<S> {
    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the backing store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Number of entries held, including expired ones not yet replaced.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if no entries are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops the cached entry for `key`, returning whether one existed.
    ///
    /// The backing store is not touched.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if entry.is_fresh(Instant::now()) {
            Some(entry.object.clone())
        } else {
            tracing::trace!(key, "Cache entry expired");
            None
        }
    }
}

#[async_trait]
impl<S: Reader> Reader for TtlCache<S> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        if let Some(object) = self.lookup(key).await {
            tracing::trace!(key, "Cache hit");
            return Ok(object);
        }

        tracing::trace!(key, "Cache miss");
        let object = self.store.read(key).await?;

        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry::new(object.clone(), self.ttl));

        Ok(object)
    }
}

#[async_trait]
impl<S: Writer> Writer for TtlCache<S> {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        let mut entries = self.entries.write().await;

        if let Err(e) = self.store.write(key, body, options).await {
            tracing::debug!(key, error = %e, "Backing store write failed; cache unchanged");
            return Err(e);
        }

        entries.insert(key.to_string(), Entry::new(body.to_vec(), self.ttl));
        Ok(())
    }
}

/// Removes from the backing store, then evicts the entry under the same
/// exclusive lock.
#[async_trait]
impl<S: Remover> Remover for TtlCache<S> {
    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;

        self.store.remove(key).await?;
        entries.remove(key);
        Ok(())
    }
}

/// Listing goes straight to the backing store; `all` reads through the cache.
#[async_trait]
impl<S: Lister> Lister for TtlCache<S> {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.store.keys(prefix).await
    }
}
