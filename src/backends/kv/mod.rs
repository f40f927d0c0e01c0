//! Network key-value storage adapter.
//!
//! Talks to a Redis-compatible server with `SET`, `GET` and `DEL`. The
//! adapter ([`KvStorage`]) is generic over a [`ConnectionSource`], which is
//! either a [`Dedicated`] connection or a [`Pool`]; both expose the same
//! storage contract.
//!
//! A nil reply to `GET` maps to `StorageError::NotFound`. Any other reply
//! shape that is not a bulk string is a `StorageError::MalformedResponse`.

mod connection;
mod resp;
mod storage;

pub use connection::{ConnectionSource, Connector, Dedicated, KvConnection, Pool, Reply};
pub use resp::{RespConnection, RespConnector};
pub use storage::KvStorage;
