// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-gelf.
//
// tracing-gelf is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tracing-gelf is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-gelf.  If
// not, see <http://www.gnu.org/licenses/>.

//! The GELF transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, as well
//! as the UDP & TCP implementations.
//!
//! # Examples
//!
//! To send GELF messages over UDP to a Graylog input listening on port 12201 (the default) on
//! localhost:
//!
//! ```rust
//! use tracing_gelf::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! On a non-standard port on another host:
//!
//! ```rust
//! use tracing_gelf::transport::UdpTransport;
//! let transpo = UdpTransport::new("some-host.domain.invalid", 12202);
//! assert!(transpo.is_err()); // no such host, after all
//! ```
//!
//! Over TCP:
//!
//! ```rust
//! use tracing_gelf::transport::TcpTransport;
//! let transpo = TcpTransport::new("some-host.domain.invalid", 12201);
//! assert!(transpo.is_err());
//! ```

use crate::{
    chunker::{Chunker, Datagrams, DEFAULT_MAX_DATAGRAM_SIZE},
    encoder,
    error::{Error, Result},
    message::GelfMessage,
};

use backtrace::Backtrace;
use tracing::{debug, warn};

use std::{
    io::Write,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

/// The port on which Graylog GELF inputs conventionally listen
pub const DEFAULT_PORT: u16 = 12201;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
///
/// Both operations take `&self`: a transport may be shared between threads, and serializes
/// access to its socket internally, so that the datagrams (or frame) of one message are never
/// interleaved with those of another.
pub trait Transport {
    /// Send one message. This blocks until the last byte has been handed to the OS, or fails.
    fn send(&self, message: &GelfMessage) -> Result<()>;
    /// Release the underlying socket. Idempotent; subsequent sends fail with [`Error::Closed`].
    fn close(&self);
}

/// Resolve `host:port`, insisting on at least one address.
fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|err| Error::UnknownHost {
            host: host.to_string(),
            source: Some(err),
            back: Backtrace::new(),
        })?
        .collect();
    if addrs.is_empty() {
        Err(Error::UnknownHost {
            host: host.to_string(),
            source: None,
            back: Backtrace::new(),
        })
    } else {
        Ok(addrs)
    }
}

/// Poisoning only tells us that another sender panicked mid-send; the socket itself is still
/// usable, so carry on.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sending GELF messages via UDP datagrams.
///
/// The remote address is resolved once, at construction; if the Graylog host's DNS mapping
/// changes, the transport will need to be re-built.
pub struct UdpTransport {
    socket: Mutex<Option<UdpSocket>>,
    remote: SocketAddr,
    chunker: Chunker,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `host:port`, with the default datagram
    /// budget.
    pub fn new(host: &str, port: u16) -> Result<UdpTransport> {
        UdpTransport::with_datagram_size(host, port, DEFAULT_MAX_DATAGRAM_SIZE)
    }
    /// Construct a [`Transport`] implementation via UDP at `host:port` that will keep each
    /// datagram to at most `max_datagram_size` bytes.
    pub fn with_datagram_size(
        host: &str,
        port: u16,
        max_datagram_size: usize,
    ) -> Result<UdpTransport> {
        let chunker = Chunker::new(max_datagram_size)?;
        let remote = resolve(host, port)?[0];
        // Bind to any available port on any interface of the right family...
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        // and connect to the Graylog input at `remote`:
        socket.connect(remote)?;
        Ok(UdpTransport {
            socket: Mutex::new(Some(socket)),
            remote,
            chunker,
        })
    }
    /// Construct a [`Transport`] implementation via UDP at localhost:12201
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new("localhost", DEFAULT_PORT)
    }
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }
    pub fn max_datagram_size(&self) -> usize {
        self.chunker.max_datagram_size()
    }
    /// Chunk an already-encoded payload & send it, returning the number of datagrams written.
    ///
    /// Nothing is sent if the payload would need too many chunks. If a write fails part-way
    /// through, the datagrams already written can't be recalled; the receiver will eventually
    /// discard the incomplete message.
    pub fn send_payload(&self, buf: &[u8]) -> Result<usize> {
        let datagrams = self.chunker.chunk(buf).map_err(|err| {
            warn!("Dropping a {} byte GELF message: {}", buf.len(), err);
            err
        })?;
        if datagrams.is_chunked() {
            debug!(
                "Sending a {} byte GELF message in {} chunks",
                buf.len(),
                datagrams.len()
            );
        }

        let (sent, result) = self.write_datagrams(&datagrams);
        match result {
            Ok(()) => Ok(sent),
            Err(err) => {
                if sent > 0 {
                    warn!(
                        "GELF message failed after {} of {} chunks were sent: {}",
                        sent,
                        datagrams.len(),
                        err
                    );
                }
                Err(err)
            }
        }
    }
    /// Write every datagram of one message under a single acquisition of the socket lock,
    /// returning how many went out along with the outcome. Nothing in here may log: the event
    /// could be routed straight back to this transport.
    fn write_datagrams(&self, datagrams: &Datagrams<'_>) -> (usize, Result<()>) {
        let guard = lock(&self.socket);
        let socket = match guard.as_ref() {
            Some(socket) => socket,
            None => {
                return (
                    0,
                    Err(Error::Closed {
                        back: Backtrace::new(),
                    }),
                )
            }
        };

        match datagrams {
            Datagrams::Single(payload) => match socket.send(payload) {
                Ok(_) => (1, Ok(())),
                Err(err) => (0, Err(err.into())),
            },
            Datagrams::Chunked(chunks) => {
                for (sent, chunk) in chunks.iter().enumerate() {
                    if let Err(err) = socket.send(&chunk.to_bytes()) {
                        return (sent, Err(err.into()));
                    }
                }
                (chunks.len(), Ok(()))
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send(&self, message: &GelfMessage) -> Result<()> {
        self.send_payload(&encoder::encode_udp(message)?)
            .map(|_| ())
    }
    fn close(&self) {
        lock(&self.socket).take();
    }
}

enum Connection {
    Open(TcpStream),
    /// Never connected, or the last write failed & reconnecting didn't work
    Disconnected,
    Closed,
}

struct TcpState {
    connection: Connection,
    write_timeout: Option<Duration>,
}

/// Sending GELF messages via a persistent TCP connection.
///
/// Each message is written as uncompressed JSON followed by a NUL byte. Should a write fail, the
/// transport will make one attempt to reconnect & re-send before giving up on that message; if
/// that fails too, the connection is left down, & the next send will begin by reconnecting.
pub struct TcpTransport {
    addrs: Vec<SocketAddr>,
    state: Mutex<TcpState>,
}

fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> std::io::Result<()> {
    stream.write_all(frame)?;
    stream.flush()
}

impl TcpTransport {
    /// Construct a [`Transport`] implementation via TCP at `host:port`.
    pub fn new(host: &str, port: u16) -> Result<TcpTransport> {
        let addrs = resolve(host, port)?;
        let stream = TcpTransport::connect(&addrs, None)?;
        Ok(TcpTransport {
            addrs,
            state: Mutex::new(TcpState {
                connection: Connection::Open(stream),
                write_timeout: None,
            }),
        })
    }
    /// Construct a [`Transport`] implementation via TCP at localhost:12201
    pub fn try_default() -> Result<TcpTransport> {
        TcpTransport::new("localhost", DEFAULT_PORT)
    }
    fn connect(addrs: &[SocketAddr], write_timeout: Option<Duration>) -> Result<TcpStream> {
        let stream = TcpStream::connect(addrs)?;
        stream.set_write_timeout(write_timeout)?;
        Ok(stream)
    }
    /// Bound the time any one write may block; `None` (the default) blocks indefinitely. Applies
    /// to the current connection & any made hereafter.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let mut state = lock(&self.state);
        state.write_timeout = timeout;
        if let Connection::Open(stream) = &state.connection {
            stream.set_write_timeout(timeout)?;
        }
        Ok(())
    }
    /// Write an already-framed message, reconnecting (once) if need be.
    pub fn send_frame(&self, frame: &[u8]) -> Result<()> {
        match self.write_or_reconnect(frame) {
            Ok(None) => Ok(()),
            Ok(Some(first)) => {
                debug!("GELF TCP write failed ({}); reconnected", first);
                Ok(())
            }
            Err(err) => {
                if let Error::Io { .. } = err {
                    warn!("Couldn't deliver a GELF message to Graylog: {}", err);
                }
                Err(err)
            }
        }
    }
    /// Holds the connection lock for the whole attempt; on success, yields the error that forced
    /// a reconnect, if there was one. Nothing in here may log.
    fn write_or_reconnect(&self, frame: &[u8]) -> Result<Option<std::io::Error>> {
        let mut state = lock(&self.state);

        let first = match &mut state.connection {
            Connection::Closed => {
                return Err(Error::Closed {
                    back: Backtrace::new(),
                })
            }
            Connection::Open(stream) => match write_frame(stream, frame) {
                Ok(()) => return Ok(None),
                Err(err) => err,
            },
            Connection::Disconnected => std::io::ErrorKind::NotConnected.into(),
        };

        state.connection = Connection::Disconnected;
        let mut stream = TcpTransport::connect(&self.addrs, state.write_timeout)?;
        write_frame(&mut stream, frame)?;
        state.connection = Connection::Open(stream);
        Ok(Some(first))
    }
}

impl Transport for TcpTransport {
    fn send(&self, message: &GelfMessage) -> Result<()> {
        self.send_frame(&encoder::encode_tcp(message).map_err(|err| {
            warn!("Dropping a GELF message: {}", err);
            err
        })?)
    }
    fn close(&self) {
        let mut state = lock(&self.state);
        if let Connection::Open(stream) = &state.connection {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        state.connection = Connection::Closed;
    }
}
