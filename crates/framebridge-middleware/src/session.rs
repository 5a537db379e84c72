//! Socket Session – the single persistent connection to the peer.
//!
//! [`SocketSession`] dials the peer once, then offers a bounded-wait
//! [`receive`][PeerChannel::receive] so the caller's loop always makes
//! progress, and a line-oriented [`send`][PeerChannel::send].
//!
//! The orchestrator only sees the [`PeerChannel`] trait, so tests can swap
//! the TCP stream for an in-memory channel.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::codec::{DecodeError, FrameBuffer, Inbound, Outbound, encode};

/// Bytes requested from the socket per read.
const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("peer closed the connection")]
    Closed,

    #[error("read from peer failed: {0}")]
    Read(#[source] io::Error),

    #[error("send to peer failed: {0}")]
    Send(#[source] io::Error),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything decoded from one bounded-wait receive.  Empty on timeout.
pub type Received = Vec<Result<Inbound, DecodeError>>;

/// The orchestrator's view of the peer connection.
///
/// # Contract
///
/// * `receive` waits at most `wait` and returns an empty list when nothing
///   arrived.  Per-message decode failures are returned inside the list; an
///   `Err` means the connection itself is unusable.
/// * `send` writes one framed message; an `Err` means the connection is dead.
/// * `reconnect` re-dials the same endpoint and drops any partial frame.
#[async_trait]
pub trait PeerChannel: Send {
    async fn receive(&mut self, wait: Duration) -> Result<Received, SessionError>;

    async fn send(&mut self, message: &Outbound) -> Result<(), SessionError>;

    async fn reconnect(&mut self) -> Result<(), SessionError>;

    /// Close the connection.  Errors are ignored.
    async fn close(&mut self);
}

/// TCP implementation of [`PeerChannel`].
pub struct SocketSession {
    addr: String,
    connect_timeout: Duration,
    stream: TcpStream,
    frames: FrameBuffer,
    read_buf: Vec<u8>,
}

impl SocketSession {
    /// Dial `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// [`SessionError::Connect`] if the peer refuses or is unreachable,
    /// [`SessionError::ConnectTimeout`] if it does not answer in time.
    pub async fn connect(
        addr: impl Into<String>,
        connect_timeout: Duration,
        max_frame_bytes: usize,
    ) -> Result<Self, SessionError> {
        let addr = addr.into();
        let stream = dial(&addr, connect_timeout).await?;
        info!(peer = %addr, "connected to peer");
        Ok(Self {
            addr,
            connect_timeout,
            stream,
            frames: FrameBuffer::new(max_frame_bytes),
            read_buf: vec![0u8; READ_CHUNK],
        })
    }

    /// The `host:port` this session dials.
    pub fn peer(&self) -> &str {
        &self.addr
    }
}

async fn dial(addr: &str, connect_timeout: Duration) -> Result<TcpStream, SessionError> {
    let stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Err(_) => {
            return Err(SessionError::ConnectTimeout {
                addr: addr.to_string(),
                timeout: connect_timeout,
            });
        }
        Ok(result) => result.map_err(|source| SessionError::Connect {
            addr: addr.to_string(),
            source,
        })?,
    };
    // Poses are small and latency matters more than batching.
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "could not disable Nagle");
    }
    Ok(stream)
}

#[async_trait]
impl PeerChannel for SocketSession {
    async fn receive(&mut self, wait: Duration) -> Result<Received, SessionError> {
        match timeout(wait, self.stream.read(&mut self.read_buf)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) => Err(SessionError::Closed),
            Ok(Ok(n)) => {
                self.frames.push(&self.read_buf[..n]);
                Ok(self.frames.drain())
            }
            Ok(Err(e)) => Err(SessionError::Read(e)),
        }
    }

    async fn send(&mut self, message: &Outbound) -> Result<(), SessionError> {
        let line = encode(message)?;
        self.stream
            .write_all(line.as_bytes())
            .await
            .map_err(SessionError::Send)
    }

    async fn reconnect(&mut self) -> Result<(), SessionError> {
        self.stream = dial(&self.addr, self.connect_timeout).await?;
        self.frames.clear();
        info!(peer = %self.addr, "reconnected to peer");
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            warn!(peer = %self.addr, error = %e, "error while closing connection");
        }
    }
}
