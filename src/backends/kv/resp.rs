//! RESP2 connection over TCP.
//!
//! Speaks the Redis serialization protocol: commands go out as arrays of
//! bulk strings, replies are parsed incrementally from a read buffer.
//!
//! A connection whose last command did not end in a complete, well-formed
//! reply (the caller's future was dropped mid-request, the socket failed, or
//! the reply could not be parsed) is out of step with the server. The next
//! command reconnects to the same peer before it is sent.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::connection::{Connector, KvConnection, Reply};
use crate::error::{Result, StorageError};

const CRLF: &[u8] = b"\r\n";
const READ_BUFFER_SIZE: usize = 4096;

/// Largest reply accepted, matching the server's default `proto-max-bulk-len`.
const MAX_REPLY_SIZE: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted in a reply.
const MAX_REPLY_DEPTH: usize = 32;

/// A dedicated RESP connection to a Redis-compatible server.
#[derive(Debug)]
pub struct RespConnection {
    stream: TcpStream,
    buffer: BytesMut,
    peer: SocketAddr,
    /// Set while a command is outstanding; still set on entry means the
    /// previous exchange never completed.
    needs_reconnect: bool,
}

impl RespConnection {
    /// Connects to `addr`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the TCP connection cannot be established.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::from_stream(open_stream(addr).await?)
    }

    /// Wraps an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the stream has no peer address.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map_err(|e| StorageError::io("resolve KV peer address", e))?;

        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            peer,
            needs_reconnect: false,
        })
    }

    /// Address of the server this connection talks to.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn reconnect(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer, "Reconnecting KV connection after incomplete exchange");

        self.stream = open_stream(self.peer).await?;
        self.buffer.clear();
        self.needs_reconnect = false;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        loop {
            match parse_reply(&self.buffer) {
                Ok(Some((reply, used))) => {
                    self.buffer.advance(used);
                    return Ok(reply);
                },
                Ok(None) => {},
                Err(e) => {
                    self.buffer.clear();
                    return Err(e);
                },
            }

            if self.buffer.len() > MAX_REPLY_SIZE {
                self.buffer.clear();
                return Err(StorageError::malformed(format!(
                    "reply exceeds {MAX_REPLY_SIZE} bytes"
                )));
            }

            let read = self
                .stream
                .read_buf(&mut self.buffer)
                .await
                .map_err(|e| StorageError::io("read KV reply", e))?;
            if read == 0 {
                return Err(StorageError::io(
                    "read KV reply",
                    std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
                ));
            }
        }
    }
}

async fn open_stream<A: ToSocketAddrs>(addr: A) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| StorageError::io("connect to KV server", e))?;
    stream
        .set_nodelay(true)
        .map_err(|e| StorageError::io("configure KV socket", e))?;

    Ok(stream)
}

#[async_trait]
impl KvConnection for RespConnection {
    async fn execute(&mut self, args: &[&[u8]]) -> Result<Reply> {
        if self.needs_reconnect {
            self.reconnect().await?;
        }

        let frame = encode_command(args);
        self.needs_reconnect = true;
        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| StorageError::io("send KV command", e))?;

        let reply = self.read_reply().await?;
        self.needs_reconnect = false;
        Ok(reply)
    }
}

/// Opens [`RespConnection`]s to a fixed address, for use with a pool.
#[derive(Debug, Clone)]
pub struct RespConnector {
    address: String,
}

impl RespConnector {
    /// Creates a connector for `address` (`host:port`).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Returns the target address.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Connector for RespConnector {
    type Connection = RespConnection;

    async fn connect(&self) -> Result<RespConnection> {
        RespConnection::connect(self.address.as_str()).await
    }
}

/// Encodes a command as a RESP array of bulk strings.
pub(crate) fn encode_command(args: &[&[u8]]) -> BytesMut {
    let size = args.iter().map(|arg| arg.len() + 16).sum::<usize>() + 16;
    let mut frame = BytesMut::with_capacity(size);

    frame.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        frame.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        frame.put_slice(arg);
        frame.put_slice(CRLF);
    }

    frame
}

/// Parses one reply from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` does not yet hold a complete reply, and the
/// number of bytes consumed otherwise.
pub(crate) fn parse_reply(buf: &[u8]) -> Result<Option<(Reply, usize)>> {
    parse_nested(buf, 0)
}

fn parse_nested(buf: &[u8], depth: usize) -> Result<Option<(Reply, usize)>> {
    let Some(line_end) = find_crlf(buf) else {
        return Ok(None);
    };
    let Some((&kind, line)) = buf[..line_end].split_first() else {
        return Err(StorageError::malformed("empty reply line"));
    };
    let header = line_end + CRLF.len();

    match kind {
        b'+' => Ok(Some((Reply::Status(text(line)?), header))),
        b'-' => Ok(Some((Reply::Error(text(line)?), header))),
        b':' => Ok(Some((Reply::Integer(integer(line)?), header))),
        b'$' => {
            let Ok(len) = usize::try_from(integer(line)?) else {
                return Ok(Some((Reply::Nil, header)));
            };
            if len > MAX_REPLY_SIZE {
                return Err(StorageError::malformed(format!(
                    "bulk string of {len} bytes exceeds {MAX_REPLY_SIZE}"
                )));
            }
            let end = header + len;
            if buf.len() < end + CRLF.len() {
                return Ok(None);
            }
            if &buf[end..end + CRLF.len()] != CRLF {
                return Err(StorageError::malformed("bulk string missing terminator"));
            }
            Ok(Some((Reply::Bulk(buf[header..end].to_vec()), end + CRLF.len())))
        },
        b'*' => {
            let Ok(count) = usize::try_from(integer(line)?) else {
                return Ok(Some((Reply::Nil, header)));
            };
            if depth >= MAX_REPLY_DEPTH {
                return Err(StorageError::malformed(format!(
                    "reply nested deeper than {MAX_REPLY_DEPTH} arrays"
                )));
            }
            // Every element takes at least three bytes, e.g. `+\r\n`.
            if count > MAX_REPLY_SIZE / 3 {
                return Err(StorageError::malformed(format!(
                    "array of {count} elements exceeds {MAX_REPLY_SIZE} bytes"
                )));
            }
            let mut items = Vec::new();
            let mut pos = header;
            for _ in 0..count {
                match parse_nested(&buf[pos..], depth + 1)? {
                    Some((item, used)) => {
                        items.push(item);
                        pos += used;
                    },
                    None => return Ok(None),
                }
            }
            Ok(Some((Reply::Array(items), pos)))
        },
        other => Err(StorageError::malformed(format!(
            "unexpected reply type byte {other:#04x}"
        ))),
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|window| window == CRLF)
}

fn text(line: &[u8]) -> Result<String> {
    String::from_utf8(line.to_vec()).map_err(|_| StorageError::malformed("reply line is not UTF-8"))
}

fn integer(line: &[u8]) -> Result<i64> {
    text(line)?
        .parse()
        .map_err(|_| StorageError::malformed("invalid integer in reply"))
}
