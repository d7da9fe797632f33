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

//! GELF encoding.
//!
//! A [`GelfMessage`] goes on the wire as a JSON object:
//!
//! ```text
//! {"_thread":"main","full_message":"...","host":"bree","level":6,"short_message":"...",
//!  "timestamp":1656000123.456,"version":"1.1"}
//! ```
//!
//! Additional fields are prefixed with an underscore. Over UDP the object is gzip'd (Graylog
//! sniffs the gzip magic number to tell compressed from uncompressed payloads); over TCP it is
//! sent as-is, followed by a NUL byte.

use crate::{
    error::{Error, Result},
    message::GelfMessage,
};

use backtrace::Backtrace;
use bytes::{BufMut, Bytes, BytesMut};
use flate2::{write::GzEncoder, Compression};
use serde::Serialize;

use std::{collections::BTreeMap, io::Write};

/// The GELF version this crate speaks
pub const GELF_VERSION: &str = "1.1";

/// Delimits messages on a TCP stream
pub const FRAME_TERMINATOR: u8 = 0;

/// Additional field names Graylog reserves for itself (compared sans leading underscore).
const RESERVED_FIELDS: &[&str] = &["id"];

#[derive(Serialize)]
struct WireMessage<'a> {
    version: &'static str,
    host: &'a str,
    short_message: &'a str,
    full_message: &'a str,
    timestamp: f64,
    level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    facility: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    // Every key in here begins with '_', so none can collide with the fields above.
    #[serde(flatten)]
    additional: BTreeMap<String, &'a str>,
}

/// Map an additional field name to its wire name, or `None` if it mayn't be sent.
fn wire_field_name(name: &str) -> Option<String> {
    let bare = name.strip_prefix('_').unwrap_or(name);
    if bare.is_empty() || RESERVED_FIELDS.contains(&bare) {
        None
    } else {
        Some(format!("_{}", bare))
    }
}

/// Serialize `message` to JSON.
pub fn to_json(message: &GelfMessage) -> Result<Vec<u8>> {
    if !message.is_valid() {
        return Err(Error::EmptyHost {
            back: Backtrace::new(),
        });
    }

    let additional = message
        .additional_fields()
        .iter()
        .filter_map(|(name, value)| wire_field_name(name).map(|name| (name, value.as_str())))
        .collect();

    serde_json::to_vec(&WireMessage {
        version: GELF_VERSION,
        host: message.host(),
        short_message: message.short_message(),
        full_message: message.full_message(),
        timestamp: message.timestamp_secs(),
        level: message.level().severity(),
        facility: message.facility(),
        file: message.file(),
        line: message.line(),
        additional,
    })
    .map_err(encoding_error)
}

fn encoding_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Encoding {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

/// gzip `buf`
pub fn compress(buf: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(buf.len() / 2), Compression::default());
    encoder.write_all(buf).map_err(encoding_error)?;
    encoder.finish().map_err(encoding_error)
}

/// Encode `message` for a UDP transport: compressed JSON.
pub fn encode_udp(message: &GelfMessage) -> Result<Vec<u8>> {
    compress(&to_json(message)?)
}

/// Encode `message` for a TCP transport: uncompressed JSON followed by [`FRAME_TERMINATOR`].
pub fn encode_tcp(message: &GelfMessage) -> Result<Bytes> {
    frame(&to_json(message)?)
}

/// Append the frame terminator to `payload`, which must not itself contain one.
///
/// `serde_json` escapes every control character in string content, so JSON produced by
/// [`to_json`] never trips this check.
pub fn frame(payload: &[u8]) -> Result<Bytes> {
    if payload.contains(&FRAME_TERMINATOR) {
        return Err(Error::IllegalTerminator {
            back: Backtrace::new(),
        });
    }
    let mut buf = BytesMut::with_capacity(payload.len() + 1);
    buf.put_slice(payload);
    buf.put_u8(FRAME_TERMINATOR);
    Ok(buf.freeze())
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::level::Level;

    use flate2::read::GzDecoder;
    use serde_json::Value;

    use std::io::Read;

    fn sample() -> GelfMessage {
        GelfMessage::builder("Hello, 世界!")
            .host("bree.local")
            .level(Level::LOG_WARNING)
            .timestamp_millis(1_656_000_123_456)
            .facility("unit-tests")
            .location("src/encoder.rs", Some(42))
            .field("thread", "main")
            .field("_request_id", "abc123")
            .build()
    }

    fn decode(json: &[u8]) -> Value {
        serde_json::from_slice(json).unwrap()
    }

    #[test]
    fn round_trip() {
        let v = decode(&to_json(&sample()).unwrap());
        assert_eq!(v["version"], "1.1");
        assert_eq!(v["host"], "bree.local");
        assert_eq!(v["short_message"], "Hello, 世界!");
        assert_eq!(v["full_message"], "Hello, 世界!");
        assert_eq!(v["level"], 4);
        assert_eq!(v["facility"], "unit-tests");
        assert_eq!(v["file"], "src/encoder.rs");
        assert_eq!(v["line"], 42);
        assert_eq!(v["_thread"], "main");
        // no double underscore
        assert_eq!(v["_request_id"], "abc123");
        assert!(v.get("__request_id").is_none());
        assert!((v["timestamp"].as_f64().unwrap() - 1_656_000_123.456).abs() < 1e-6);
    }

    #[test]
    fn optional_fields_omitted() {
        let msg = GelfMessage::builder("x").host("bree").build();
        let v = decode(&to_json(&msg).unwrap());
        let obj = v.as_object().unwrap();
        assert!(!obj.contains_key("facility"));
        assert!(!obj.contains_key("file"));
        assert!(!obj.contains_key("line"));
    }

    #[test]
    fn reserved_fields_cannot_be_overridden() {
        let msg = GelfMessage::builder("x")
            .host("bree")
            .field("version", "9.9")
            .field("id", "nope")
            .field("_id", "nope")
            .field("host", "elsewhere")
            .build();
        let v = decode(&to_json(&msg).unwrap());
        assert_eq!(v["version"], "1.1");
        assert_eq!(v["host"], "bree");
        assert!(v.get("_id").is_none());
        assert!(v.get("id").is_none());
        // caller's values travel under their own (prefixed) names
        assert_eq!(v["_version"], "9.9");
        assert_eq!(v["_host"], "elsewhere");
    }

    #[test]
    fn long_messages_are_truncated_on_the_wire() {
        let msg = GelfMessage::builder("a".repeat(300)).host("bree").build();
        let v = decode(&to_json(&msg).unwrap());
        assert_eq!(v["short_message"].as_str().unwrap().len(), 249);
        assert_eq!(v["full_message"].as_str().unwrap().len(), 300);
    }

    #[test]
    fn empty_host_is_rejected() {
        let msg = GelfMessage::builder("x").host("").build();
        assert!(matches!(to_json(&msg), Err(Error::EmptyHost { .. })));
    }

    #[test]
    fn udp_payloads_are_gzipped() {
        let buf = encode_udp(&sample()).unwrap();
        assert_eq!(&buf[..2], &[0x1f, 0x8b]);
        let mut json = Vec::new();
        GzDecoder::new(&buf[..]).read_to_end(&mut json).unwrap();
        assert_eq!(json, to_json(&sample()).unwrap());
    }

    #[test]
    fn tcp_framing() {
        let msg = GelfMessage::builder("embedded\0nul")
            .host("bree")
            .field("k", "v\0v")
            .build();
        let buf = encode_tcp(&msg).unwrap();
        assert_eq!(buf.last(), Some(&FRAME_TERMINATOR));
        assert_eq!(buf.iter().filter(|b| **b == FRAME_TERMINATOR).count(), 1);
        let v = decode(&buf[..buf.len() - 1]);
        assert_eq!(v["short_message"], "embedded\0nul");
        assert_eq!(v["_k"], "v\0v");
    }

    #[test]
    fn frame_rejects_terminator() {
        assert!(matches!(
            frame(b"abc\0def"),
            Err(Error::IllegalTerminator { .. })
        ));
        assert_eq!(&frame(b"abc").unwrap()[..], b"abc\0");
    }
}
