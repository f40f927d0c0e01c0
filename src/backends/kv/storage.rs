//! Storage contract over a Redis-compatible key-value server.

use async_trait::async_trait;

use super::connection::{ConnectionSource, Connector, Dedicated, KvConnection, Pool, Reply};
use crate::error::{Result, StorageError};
use crate::options::Options;
use crate::storage::{Reader, Remover, Writer, namespaced};

const CMD_SET: &[u8] = b"SET";
const CMD_GET: &[u8] = b"GET";
const CMD_DEL: &[u8] = b"DEL";
const ARG_EX: &[u8] = b"EX";

/// Network key-value storage.
///
/// Every key is prefixed with `root/` (no prefix when `root` is empty), so
/// several logical stores can share one server. Each operation is a single
/// `SET`, `GET` or `DEL` on a connection taken from the source.
///
/// A nonzero `Options::ttl` is sent as `SET .. EX ttl`; other options are
/// ignored. Removing an absent key succeeds. Key listing is not supported.
///
/// # Example
///
/// ```ignore
/// use stashkit::{KvStorage, Pool, RespConnection, RespConnector};
///
/// // One dedicated connection
/// let conn = RespConnection::connect("127.0.0.1:6379").await?;
/// let store = KvStorage::new(conn, "sessions");
///
/// // Or a pool
/// let store = KvStorage::pooled(Pool::new(RespConnector::new("127.0.0.1:6379")), "sessions");
/// ```
pub struct KvStorage<S> {
    root: String,
    source: S,
}

impl<C: KvConnection> KvStorage<Dedicated<C>> {
    /// Creates a store using one dedicated connection.
    pub fn new(conn: C, root: impl Into<String>) -> Self {
        Self::with_source(Dedicated::new(conn), root)
    }
}

impl<C: Connector> KvStorage<Pool<C>> {
    /// Creates a store borrowing a pooled connection per operation.
    pub fn pooled(pool: Pool<C>, root: impl Into<String>) -> Self {
        Self::with_source(pool, root)
    }
}

impl<S: ConnectionSource> KvStorage<S> {
    /// Creates a store over any connection source.
    pub fn with_source(source: S, root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            source,
        }
    }

    /// Returns the namespace segment prefixed to every key.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns the connection source.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn build_key(&self, key: &str) -> String {
        namespaced(&self.root, key)
    }
}

fn server_error(command: &str, key: &str, message: String) -> StorageError {
    StorageError::backend(format!("{command} {key}"), message)
}

#[async_trait]
impl<S: ConnectionSource> Reader for KvStorage<S> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let k = self.build_key(key);

        match self.source.execute(&[CMD_GET, k.as_bytes()]).await? {
            Reply::Bulk(data) => Ok(data),
            Reply::Nil => Err(StorageError::NotFound),
            Reply::Error(message) => Err(server_error("GET", &k, message)),
            other => Err(StorageError::malformed(format!(
                "expected bulk string reply to GET {k}, got {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl<S: ConnectionSource> Writer for KvStorage<S> {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        let k = self.build_key(key);
        let ttl = options.map_or(0, |options| options.ttl);

        let reply = if ttl > 0 {
            let seconds = ttl.to_string();
            self.source
                .execute(&[CMD_SET, k.as_bytes(), body, ARG_EX, seconds.as_bytes()])
                .await?
        } else {
            self.source.execute(&[CMD_SET, k.as_bytes(), body]).await?
        };

        if let Reply::Error(message) = reply {
            return Err(server_error("SET", &k, message));
        }

        tracing::debug!(key = %k, bytes = body.len(), ttl, "Wrote object to KV server");
        Ok(())
    }
}

#[async_trait]
impl<S: ConnectionSource> Remover for KvStorage<S> {
    async fn remove(&self, key: &str) -> Result<()> {
        let k = self.build_key(key);

        if let Reply::Error(message) = self.source.execute(&[CMD_DEL, k.as_bytes()]).await? {
            return Err(server_error("DEL", &k, message));
        }

        tracing::debug!(key = %k, "Removed object from KV server");
        Ok(())
    }
}
