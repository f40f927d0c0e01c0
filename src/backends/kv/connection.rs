//! Connection seam for the network key-value adapter.
//!
//! A [`KvConnection`] issues one command and returns the server's [`Reply`].
//! A [`ConnectionSource`] decides where that connection comes from: a single
//! [`Dedicated`] connection, or a [`Pool`] that lends one out per request and
//! takes it back afterwards. The adapter only ever sees the source, so both
//! forms expose the same contract.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::constants;
use crate::error::Result;

/// A reply from a Redis-compatible server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Null bulk string or null array: the "missing key" signal.
    Nil,
    /// Simple status line, e.g. `OK`.
    Status(String),
    /// Error line sent by the server.
    Error(String),
    /// Integer reply.
    Integer(i64),
    /// Binary-safe bulk string.
    Bulk(Vec<u8>),
    /// Array of nested replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// Short name of the reply shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Status(_) => "status",
            Self::Error(_) => "error",
            Self::Integer(_) => "integer",
            Self::Bulk(_) => "bulk string",
            Self::Array(_) => "array",
        }
    }
}

/// A single established connection to the key-value server.
#[async_trait]
pub trait KvConnection: Send + 'static {
    /// Sends one command (`args[0]` is the command name) and waits for its reply.
    ///
    /// Server error replies come back as `Ok(Reply::Error(..))`; `Err` means
    /// the connection itself failed and should not be reused.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unparseable reply.
    async fn execute(&mut self, args: &[&[u8]]) -> Result<Reply>;
}

/// Establishes new connections for a [`Pool`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced.
    type Connection: KvConnection;

    /// Opens a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    async fn connect(&self) -> Result<Self::Connection>;
}

/// Where the adapter gets a connection for each request.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Acquires a connection, runs one command, and releases the connection
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired or the command fails
    /// at the transport level.
    async fn execute(&self, args: &[&[u8]]) -> Result<Reply>;
}

/// Lets several namespaced stores share one dedicated connection or pool.
#[async_trait]
impl<T: ConnectionSource + ?Sized> ConnectionSource for Arc<T> {
    async fn execute(&self, args: &[&[u8]]) -> Result<Reply> {
        (**self).execute(args).await
    }
}

/// One connection owned by the adapter, used by one request at a time.
pub struct Dedicated<C> {
    conn: tokio::sync::Mutex<C>,
}

impl<C: KvConnection> Dedicated<C> {
    /// Wraps an established connection.
    pub fn new(conn: C) -> Self {
        Self {
            conn: tokio::sync::Mutex::new(conn),
        }
    }
}

#[async_trait]
impl<C: KvConnection> ConnectionSource for Dedicated<C> {
    async fn execute(&self, args: &[&[u8]]) -> Result<Reply> {
        let mut conn = self.conn.lock().await;
        conn.execute(args).await
    }
}

/// A pool of connections created on demand.
///
/// Each request borrows an idle connection (or opens a new one), and returns
/// it afterwards unless the request failed at the transport level. At most
/// `max_idle` connections are kept between requests.
pub struct Pool<C: Connector> {
    connector: C,
    idle: Mutex<Vec<C::Connection>>,
    max_idle: usize,
}

impl<C: Connector> Pool<C> {
    /// Creates a pool keeping up to `DEFAULT_POOL_SIZE` idle connections.
    pub fn new(connector: C) -> Self {
        Self::with_max_idle(connector, constants::DEFAULT_POOL_SIZE)
    }

    /// Creates a pool keeping up to `max_idle` idle connections.
    pub fn with_max_idle(connector: C, max_idle: usize) -> Self {
        Self {
            connector,
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Number of idle connections currently held.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    async fn acquire(&self) -> Result<C::Connection> {
        let idle = self.idle.lock().pop();
        match idle {
            Some(conn) => Ok(conn),
            None => {
                tracing::trace!("Opening new pooled KV connection");
                self.connector.connect().await
            },
        }
    }

    fn release(&self, conn: C::Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

#[async_trait]
impl<C: Connector> ConnectionSource for Pool<C> {
    async fn execute(&self, args: &[&[u8]]) -> Result<Reply> {
        let mut conn = self.acquire().await?;

        match conn.execute(args).await {
            Ok(reply) => {
                self.release(conn);
                Ok(reply)
            },
            Err(e) => {
                tracing::debug!(error = %e, "Discarding broken KV connection");
                Err(e)
            },
        }
    }
}
