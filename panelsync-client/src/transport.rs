//! Transport seam between the connection and the network
//!
//! The connection owns its transport exclusively and drives it from
//! `tick()`. All I/O is non-blocking: a `recv` or `send` returns
//! immediately, and backlog that the kernel would not accept stays buffered
//! until a later tick.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use panelsync_utils::{PanelsyncError, Result};

/// Read at most this many bytes from the wire per `recv` call; anything
/// left stays in the socket buffer for the next poll cycle.
const RECV_BATCH_BYTES: usize = 64 * 1024;

/// A point-to-point byte transport driven by polling.
pub trait Transport {
    /// Begin a connection attempt.
    fn connect(&mut self) -> Result<()>;

    /// Poll an in-flight attempt; `true` once the transport is established.
    fn poll_established(&mut self) -> Result<bool>;

    /// Read one batch of available bytes into `buf`. Returns the number of
    /// bytes read; `0` means nothing was available. A peer close is an
    /// error.
    fn recv(&mut self, buf: &mut BytesMut) -> Result<usize>;

    /// Queue bytes for sending and push them toward the wire.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Push any internally buffered outbound bytes toward the wire.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the transport can accept a fresh flush of outbound work.
    fn is_writable(&self) -> bool;

    /// Tear the transport down. Safe to call repeatedly.
    fn close(&mut self);
}

/// Plaintext TCP transport.
///
/// The connect handshake is bounded by `connect_timeout`; an established
/// socket runs in non-blocking mode. The `tls` configuration flag is the
/// business of TLS-capable `Transport` impls, not this one.
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    /// Outbound bytes the kernel has not yet accepted.
    backlog: BytesMut,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
            stream: None,
            backlog: BytesMut::new(),
        }
    }

    fn drain_backlog(&mut self) -> Result<()> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(PanelsyncError::NotConnected),
        };

        while !self.backlog.is_empty() {
            match stream.write(&self.backlog) {
                Ok(0) => return Err(PanelsyncError::ConnectionClosed),
                Ok(n) => self.backlog.advance(n),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(PanelsyncError::Io(err)),
            }
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let addrs = (self.host.as_str(), self.port).to_socket_addrs().map_err(|e| {
            PanelsyncError::connection(format!(
                "cannot resolve {}:{}: {}",
                self.host, self.port, e
            ))
        })?;

        let mut last_err: Option<io::Error> = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nonblocking(true)?;
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    self.backlog.clear();
                    return Ok(());
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) if err.kind() == io::ErrorKind::TimedOut => PanelsyncError::ConnectTimeout {
                millis: self.connect_timeout.as_millis() as u64,
            },
            Some(err) => PanelsyncError::connection(format!(
                "cannot connect to {}:{}: {}",
                self.host, self.port, err
            )),
            None => PanelsyncError::connection(format!(
                "no addresses for {}:{}",
                self.host, self.port
            )),
        })
    }

    fn poll_established(&mut self) -> Result<bool> {
        Ok(self.stream.is_some())
    }

    fn recv(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(PanelsyncError::NotConnected),
        };

        let mut chunk = [0u8; 4096];
        let mut total = 0;
        while total < RECV_BATCH_BYTES {
            match stream.read(&mut chunk) {
                Ok(0) => return Err(PanelsyncError::ConnectionClosed),
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(PanelsyncError::Io(err)),
            }
        }
        Ok(total)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.backlog.extend_from_slice(data);
        self.drain_backlog()
    }

    fn flush(&mut self) -> Result<()> {
        if self.backlog.is_empty() {
            return Ok(());
        }
        self.drain_backlog()
    }

    fn is_writable(&self) -> bool {
        self.stream.is_some() && self.backlog.is_empty()
    }

    fn close(&mut self) {
        self.stream = None;
        self.backlog.clear();
    }
}
