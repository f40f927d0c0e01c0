//! Shared helpers for integration tests.
//!
//! Provides instrumented stores and in-process stand-ins for the network
//! key-value server and the object-store service, so every adapter can be
//! driven through the same contract without external services.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use stashkit::{
    KvConnection, ObjectStoreClient, ObjectStoreError, Options, PutObject, Reader, Remover, Reply,
    Result, StorageError, Writer,
};

// =============================================================================
// Instrumented backing store
// =============================================================================

/// Wraps a store, counting reads that reach it and optionally failing writes.
pub struct CountingStore<S> {
    pub inner: S,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: Reader> Reader for CountingStore<S> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key).await
    }
}

#[async_trait]
impl<S: Writer> Writer for CountingStore<S> {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("write", "backing store unavailable"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, body, options).await
    }
}

#[async_trait]
impl<S: Remover> Remover for CountingStore<S> {
    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

// =============================================================================
// Key-value server stand-in
// =============================================================================

/// Connection answering `SET`/`GET`/`DEL` from a local map.
#[derive(Default)]
pub struct MapConnection {
    pub data: HashMap<Vec<u8>, Vec<u8>>,
}

#[async_trait]
impl KvConnection for MapConnection {
    async fn execute(&mut self, args: &[&[u8]]) -> Result<Reply> {
        Ok(match args {
            [b"SET", key, value, ..] => {
                self.data.insert(key.to_vec(), value.to_vec());
                Reply::Status("OK".into())
            },
            [b"GET", key] => self
                .data
                .get(*key)
                .map_or(Reply::Nil, |value| Reply::Bulk(value.clone())),
            [b"DEL", key] => Reply::Integer(i64::from(self.data.remove(*key).is_some())),
            _ => Reply::Error("ERR unknown command".into()),
        })
    }
}

// =============================================================================
// Object-store service stand-in
// =============================================================================

/// Object-store client holding objects in memory, keyed by `bucket/key`.
#[derive(Default)]
pub struct MemoryObjectClient {
    pub objects: Mutex<HashMap<String, PutObject>>,
}

#[async_trait]
impl ObjectStoreClient for MemoryObjectClient {
    async fn put_object(&self, request: PutObject) -> std::result::Result<(), ObjectStoreError> {
        let id = format!("{}/{}", request.bucket, request.key);
        self.objects.lock().insert(id, request);
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> std::result::Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .lock()
            .get(&format!("{bucket}/{key}"))
            .map(|object| object.body.clone())
            .ok_or_else(|| ObjectStoreError::no_such_key(key))
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> std::result::Result<(), ObjectStoreError> {
        self.objects
            .lock()
            .remove(&format!("{bucket}/{key}"))
            .map(|_| ())
            .ok_or_else(|| ObjectStoreError::no_such_key(key))
    }
}
