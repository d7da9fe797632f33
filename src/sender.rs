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

//! The sender facade.
//!
//! Configuration names the Graylog host as a single string, optionally prefixed with the
//! protocol: `"tcp:graylog.example.com"`, `"udp:graylog.example.com"`, or just
//! `"graylog.example.com"` (which means UDP). [`Endpoint`] parses that; [`GelfSender`] picks the
//! matching [`Transport`] once, at construction, and thereafter simply forwards to it.
//!
//! ```rust
//! use tracing_gelf::sender::{Endpoint, Protocol};
//! let ep = Endpoint::parse("tcp:graylog.example.com", 12201).unwrap();
//! assert_eq!(ep.protocol(), Protocol::Tcp);
//! assert_eq!(ep.host(), "graylog.example.com");
//! ```

use crate::{
    chunker::DEFAULT_MAX_DATAGRAM_SIZE,
    config::GelfConfig,
    error::{Error, Result},
    message::GelfMessage,
    transport::{TcpTransport, Transport, UdpTransport},
};

use backtrace::Backtrace;

const TCP_PREFIX: &str = "tcp:";
const UDP_PREFIX: &str = "udp:";

/// How messages are carried to Graylog
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// A parsed Graylog address: protocol, host & port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    protocol: Protocol,
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse a (possibly prefixed) Graylog host.
    ///
    /// The prefix is stripped in its entirety, whatever the length of the name that follows.
    /// IPv6 literals may be given with or without brackets.
    pub fn parse(graylog_host: &str, port: u16) -> Result<Endpoint> {
        let graylog_host = graylog_host.trim();
        let (protocol, host) = if let Some(host) = graylog_host.strip_prefix(TCP_PREFIX) {
            (Protocol::Tcp, host)
        } else if let Some(host) = graylog_host.strip_prefix(UDP_PREFIX) {
            (Protocol::Udp, host)
        } else {
            (Protocol::Udp, graylog_host)
        };
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(Error::EmptyHost {
                back: Backtrace::new(),
            });
        }
        if port == 0 {
            return Err(Error::BadPort {
                port,
                back: Backtrace::new(),
            });
        }
        Ok(Endpoint {
            protocol,
            host: host.to_string(),
            port,
        })
    }
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}:[{}]:{}", self.protocol, self.host, self.port)
        } else {
            write!(f, "{}:{}:{}", self.protocol, self.host, self.port)
        }
    }
}

/// Send GELF messages over whichever protocol the [`Endpoint`] named.
pub enum GelfSender {
    Udp(UdpTransport),
    Tcp(TcpTransport),
}

impl GelfSender {
    /// Connect to `endpoint`, keeping UDP datagrams within the default budget.
    pub fn new(endpoint: &Endpoint) -> Result<GelfSender> {
        GelfSender::with_datagram_size(endpoint, DEFAULT_MAX_DATAGRAM_SIZE)
    }
    /// Connect to `endpoint`; `max_datagram_size` is ignored for TCP.
    pub fn with_datagram_size(endpoint: &Endpoint, max_datagram_size: usize) -> Result<GelfSender> {
        Ok(match endpoint.protocol() {
            Protocol::Udp => GelfSender::Udp(UdpTransport::with_datagram_size(
                endpoint.host(),
                endpoint.port(),
                max_datagram_size,
            )?),
            Protocol::Tcp => GelfSender::Tcp(TcpTransport::new(endpoint.host(), endpoint.port())?),
        })
    }
    pub fn from_config(config: &GelfConfig) -> Result<GelfSender> {
        GelfSender::with_datagram_size(&config.endpoint()?, config.max_datagram_size)
    }
    pub fn protocol(&self) -> Protocol {
        match self {
            GelfSender::Udp(_) => Protocol::Udp,
            GelfSender::Tcp(_) => Protocol::Tcp,
        }
    }
}

impl Transport for GelfSender {
    fn send(&self, message: &GelfMessage) -> Result<()> {
        match self {
            GelfSender::Udp(transport) => transport.send(message),
            GelfSender::Tcp(transport) => transport.send(message),
        }
    }
    fn close(&self) {
        match self {
            GelfSender::Udp(transport) => transport.close(),
            GelfSender::Tcp(transport) => transport.close(),
        }
    }
}
