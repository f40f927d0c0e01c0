//! Cloud object-store adapter.
//!
//! The service client itself is an external collaborator behind the
//! [`ObjectStoreClient`] trait; this module only translates the storage
//! contract onto `PutObject`/`GetObject`/`DeleteObject` and normalizes the
//! service's `NoSuchKey` code.
//!
//! Object stores are typically eventually consistent; no stronger guarantee
//! is added here. Key listing is not supported.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::constants;
use crate::error::{Result, StorageError};
use crate::options::Options;
use crate::storage::{Reader, Remover, Writer, namespaced};

/// Error code the service uses for a missing object.
pub const NO_SUCH_KEY: &str = "NoSuchKey";

/// Typed error returned by an object-store client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ObjectStoreError {
    /// Service error code, e.g. `NoSuchKey` or `AccessDenied`.
    pub code: String,
    /// Human-readable message from the service.
    pub message: String,
}

impl ObjectStoreError {
    /// Creates an error with a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates the "no such key" error for `key`.
    pub fn no_such_key(key: &str) -> Self {
        Self::new(NO_SUCH_KEY, format!("The specified key does not exist: {key}"))
    }

    /// Returns true if the service reported a missing object.
    #[must_use]
    pub fn is_no_such_key(&self) -> bool {
        self.code == NO_SUCH_KEY
    }
}

/// A `PutObject` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    /// Absolute expiration time, if any.
    pub expires: Option<DateTime<Utc>>,
}

/// The object-store operations this adapter consumes.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Uploads an object, replacing any existing one.
    async fn put_object(&self, request: PutObject) -> std::result::Result<(), ObjectStoreError>;

    /// Downloads an object's full body.
    async fn get_object(&self, bucket: &str, key: &str)
    -> std::result::Result<Vec<u8>, ObjectStoreError>;

    /// Deletes an object.
    async fn delete_object(&self, bucket: &str, key: &str)
    -> std::result::Result<(), ObjectStoreError>;
}

/// Object storage in one bucket.
///
/// Keys are used as object identifiers, under `root` when it is anything
/// other than empty or `/`. A nonzero `Options::ttl` sets the object's
/// expiration to now plus that many seconds; a ttl too large to express as
/// a timestamp fails the write with `StorageError::Config`.
///
/// `read` and `remove` map `NoSuchKey` to `StorageError::NotFound`; every
/// other service error passes through as `StorageError::Backend`.
pub struct ObjectStorage<C> {
    bucket: String,
    root: String,
    client: C,
}

impl<C: ObjectStoreClient> ObjectStorage<C> {
    /// Creates a store for `bucket` with the default root.
    pub fn new(client: C, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            root: constants::DEFAULT_OBJECT_ROOT.to_string(),
            client,
        }
    }

    /// Places every key under `root`.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Returns the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn object_key(&self, key: &str) -> String {
        namespaced(self.root.trim_matches(constants::KEY_SEPARATOR), key)
    }
}

fn expiry_after(ttl: u64) -> Option<DateTime<Utc>> {
    let ttl = chrono::TimeDelta::try_seconds(i64::try_from(ttl).ok()?)?;
    Utc::now().checked_add_signed(ttl)
}

fn normalize(context: String, err: ObjectStoreError) -> StorageError {
    if err.is_no_such_key() {
        StorageError::NotFound
    } else {
        StorageError::backend(context, err)
    }
}

#[async_trait]
impl<C: ObjectStoreClient> Reader for ObjectStorage<C> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let object_key = self.object_key(key);

        self.client
            .get_object(&self.bucket, &object_key)
            .await
            .map_err(|e| normalize(format!("get object {}/{object_key}", self.bucket), e))
    }
}

#[async_trait]
impl<C: ObjectStoreClient> Writer for ObjectStorage<C> {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        let object_key = self.object_key(key);
        let expires = match options.map_or(0, |options| options.ttl) {
            0 => None,
            ttl => Some(expiry_after(ttl).ok_or_else(|| {
                StorageError::Config(format!(
                    "ttl of {ttl} seconds is out of range for an object expiry"
                ))
            })?),
        };

        let request = PutObject {
            bucket: self.bucket.clone(),
            key: object_key.clone(),
            body: body.to_vec(),
            expires,
        };

        self.client.put_object(request).await.map_err(|e| {
            StorageError::backend(format!("put object {}/{object_key}", self.bucket), e)
        })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %object_key,
            bytes = body.len(),
            expires = ?expires,
            "Wrote object to object store"
        );
        Ok(())
    }
}

/// A missing object maps to `StorageError::NotFound`.
#[async_trait]
impl<C: ObjectStoreClient> Remover for ObjectStorage<C> {
    async fn remove(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key);

        self.client
            .delete_object(&self.bucket, &object_key)
            .await
            .map_err(|e| normalize(format!("delete object {}/{object_key}", self.bucket), e))?;

        tracing::debug!(bucket = %self.bucket, key = %object_key, "Removed object from object store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Bucket-less stand-in for an object-store service.
    #[derive(Default)]
    struct FakeClient {
        objects: Mutex<HashMap<String, PutObject>>,
        fail_with: Option<ObjectStoreError>,
    }

    impl FakeClient {
        fn failing(code: &str) -> Self {
            Self {
                fail_with: Some(ObjectStoreError::new(code, "injected")),
                ..Default::default()
            }
        }

        fn check(&self) -> std::result::Result<(), ObjectStoreError> {
            self.fail_with.clone().map_or(Ok(()), Err)
        }
    }

    #[async_trait]
    impl ObjectStoreClient for FakeClient {
        async fn put_object(&self, request: PutObject) -> std::result::Result<(), ObjectStoreError> {
            self.check()?;
            self.objects.lock().insert(request.key.clone(), request);
            Ok(())
        }

        async fn get_object(
            &self,
            _bucket: &str,
            key: &str,
        ) -> std::result::Result<Vec<u8>, ObjectStoreError> {
            self.check()?;
            self.objects
                .lock()
                .get(key)
                .map(|object| object.body.clone())
                .ok_or_else(|| ObjectStoreError::no_such_key(key))
        }

        async fn delete_object(
            &self,
            _bucket: &str,
            key: &str,
        ) -> std::result::Result<(), ObjectStoreError> {
            self.check()?;
            self.objects
                .lock()
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| ObjectStoreError::no_such_key(key))
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket");

        store.write("reports/q1.csv", b"a,b,c", None).await.unwrap();
        assert_eq!(store.read("reports/q1.csv").await.unwrap(), b"a,b,c");
    }

    #[tokio::test]
    async fn test_no_such_key_is_not_found() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket");

        assert!(store.read("missing").await.unwrap_err().is_not_found());
        assert!(store.remove("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let store = ObjectStorage::new(FakeClient::failing("AccessDenied"), "bucket");

        let err = store.read("secret").await.unwrap_err();
        match err {
            StorageError::Backend { source, .. } => {
                assert_eq!(source.to_string(), "AccessDenied: injected");
            },
            other => panic!("expected Backend error, got {other:?}"),
        }

        let err = store.remove("secret").await.unwrap_err();
        assert!(!err.is_not_found());

        let err = store.write("secret", b"x", None).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_ttl_sets_expiration() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket");

        let before = Utc::now();
        store
            .write("tmp", b"x", Some(&Options::default().with_ttl(60)))
            .await
            .unwrap();
        let after = Utc::now();

        let expires = store.client().objects.lock()["tmp"].expires.unwrap();
        assert!(expires >= before + chrono::Duration::seconds(60));
        assert!(expires <= after + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_rejected() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket");

        let err = store
            .write("forever", b"x", Some(&Options::default().with_ttl(u64::MAX)))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Config(_)));
        assert!(store.client().objects.lock().is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_has_no_expiration() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket");

        store.write("a", b"x", None).await.unwrap();
        store
            .write("b", b"x", Some(&Options::standard()))
            .await
            .unwrap();

        let objects = store.client().objects.lock();
        assert!(objects["a"].expires.is_none());
        assert!(objects["b"].expires.is_none());
    }

    #[tokio::test]
    async fn test_root_prefix() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket").with_root("tenant-a/");

        store.write("doc", b"x", None).await.unwrap();

        assert!(store.client().objects.lock().contains_key("tenant-a/doc"));
        assert_eq!(store.read("doc").await.unwrap(), b"x");
    }

    #[test]
    fn test_default_root_applies_no_prefix() {
        let store = ObjectStorage::new(FakeClient::default(), "bucket");
        assert_eq!(store.object_key("a/b"), "a/b");
        assert_eq!(store.bucket(), "bucket");
    }
}
