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

//! [tracing-gelf](crate) errors

use backtrace::Backtrace;

/// [tracing-gelf](crate) error type
///
/// [tracing-gelf](crate) eschews libraries like [thiserror] & [anyhow] in favor of a
/// straightforward enumeration with match arms chosen on the basis of what the caller will need to
/// respond. Broadly, they fall into three groups:
///
/// 1. construction-time failures (`UnknownHost`, `BadPort`, `BadDatagramSize`, `EmptyHost`,
///    `NoHostname`, `BadAdditionalFields`): the sender can't be built
/// 2. per-send transport failures (`Io`, `Closed`): this message was dropped, the next one may
///    fare better
/// 3. encoding-policy violations (`TooManyChunks`, `IllegalTerminator`, `Encoding`): this message
///    can never be sent & was dropped
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
#[non_exhaustive]
pub enum Error {
    /// The configured remote host couldn't be resolved to a socket address
    UnknownHost {
        host: String,
        source: Option<std::io::Error>,
        back: Backtrace,
    },
    /// The configured port was zero
    BadPort { port: u16, back: Backtrace },
    /// The datagram budget can't accomodate a chunk header plus at least one byte of payload
    BadDatagramSize { size: usize, back: Backtrace },
    /// Either the remote host, or a message's origin host, was empty
    EmptyHost { back: Backtrace },
    /// Failed to serialize or compress a message
    Encoding {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A message would have needed more than 128 chunks
    TooManyChunks { count: usize, back: Backtrace },
    /// A TCP payload contained the frame terminator
    IllegalTerminator { back: Backtrace },
    /// I/O error on the underlying socket
    Io {
        source: std::io::Error,
        back: Backtrace,
    },
    /// The sender has been closed
    Closed { back: Backtrace },
    /// Failed to fetch hostname (via libc)
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The additional fields couldn't be parsed as a JSON object
    BadAdditionalFields {
        text: String,
        source: serde_json::Error,
        back: Backtrace,
    },
}

impl std::convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            source: err,
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnknownHost {
                host,
                source: Some(source),
                ..
            } => write!(f, "Unable to resolve Graylog host {}: {}", host, source),
            Error::UnknownHost { host, .. } => {
                write!(f, "Graylog host {} resolved to no addresses", host)
            }
            Error::BadPort { port, .. } => write!(f, "{} is not a usable port", port),
            Error::BadDatagramSize { size, .. } => write!(
                f,
                "A datagram budget of {} bytes can't carry a GELF chunk header",
                size
            ),
            Error::EmptyHost { .. } => write!(f, "Empty hostname"),
            Error::Encoding { source, .. } => {
                write!(f, "While encoding a GELF message, got {}", source)
            }
            Error::TooManyChunks { count, .. } => write!(
                f,
                "The message would need {} chunks (at most 128 are allowed) and was dropped",
                count
            ),
            Error::IllegalTerminator { .. } => write!(
                f,
                "The encoded message contained a NUL byte and can't be framed for TCP"
            ),
            Error::Io { source, .. } => write!(f, "I/O error: {}", source),
            Error::Closed { .. } => write!(f, "The GELF sender has been closed"),
            Error::NoHostname { source, .. } => {
                write!(f, "Unable to determine the local hostname: {}", source)
            }
            Error::BadAdditionalFields { text, source, .. } => {
                write!(f, "Couldn't parse additional fields {:?}: {}", text, source)
            }
            _ => write!(f, "Other tracing-gelf error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnknownHost { back, .. }
            | Error::BadPort { back, .. }
            | Error::BadDatagramSize { back, .. }
            | Error::EmptyHost { back }
            | Error::Encoding { back, .. }
            | Error::TooManyChunks { back, .. }
            | Error::IllegalTerminator { back }
            | Error::Io { back, .. }
            | Error::Closed { back }
            | Error::NoHostname { back, .. }
            | Error::BadAdditionalFields { back, .. } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "tracing-gelf error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnknownHost {
                source: Some(source),
                ..
            } => Some(source),
            Error::Encoding { source, .. } => Some(source.as_ref()),
            Error::Io { source, .. } => Some(source),
            Error::NoHostname { source, .. } => Some(source.as_ref()),
            Error::BadAdditionalFields { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
