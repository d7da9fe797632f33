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

//! Splitting encoded messages into GELF chunks.
//!
//! # Introduction
//!
//! A UDP datagram can only be so large before it's fragmented at the IP layer (or dropped
//! outright). GELF deals with this by letting the sender split a message into up to 128 chunks,
//! each prefixed with a twelve byte header:
//!
//! ```text
//! +------+------+------+-- ... --+------+-------+-------+-------- ... --------+
//! | 0x1e | 0x0f |     message id (8)    | index | count |  payload slice      |
//! +------+------+------+-- ... --+------+-------+-------+-------- ... --------+
//! ```
//!
//! The message id is shared by every chunk of one message, so the receiver can reassemble
//! chunks from interleaved messages & senders. A payload small enough to fit in one datagram is
//! sent bare, with no header at all.
//!
//! [`Chunker`] decides which case applies & does the arithmetic; it never touches a socket.

use crate::error::{Error, Result};

use backtrace::Backtrace;
use bytes::{BufMut, Bytes, BytesMut};

use std::time::{SystemTime, UNIX_EPOCH};

/// Every chunk header begins with these two bytes
pub const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];

/// Magic (2) + message id (8) + sequence index (1) + sequence count (1)
pub const CHUNK_HEADER_LEN: usize = 12;

/// Graylog discards messages with more chunks than this
pub const MAX_CHUNKS: usize = 128;

/// Default datagram budget; comfortably below the usual 1500 byte Ethernet MTU once IP & UDP
/// headers are accounted for.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1420;

/// Eight bytes identifying one message across all its chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId([u8; 8]);

impl MessageId {
    /// Produce a fresh id from the wall clock (to the nanosecond) mixed with a random `u64`, so
    /// that two messages sent in the same instant by the same process still differ.
    pub fn generate() -> MessageId {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        MessageId((nanos ^ rand::random::<u64>()).to_be_bytes())
    }
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

/// One slice of a chunked message, along with its header metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk<'a> {
    id: MessageId,
    index: u8,
    count: u8,
    payload: &'a [u8],
}

#[allow(clippy::len_without_is_empty)]
impl<'a> Chunk<'a> {
    pub fn id(&self) -> MessageId {
        self.id
    }
    /// Zero-based position of this chunk
    pub fn index(&self) -> u8 {
        self.index
    }
    /// Total number of chunks in this message
    pub fn count(&self) -> u8 {
        self.count
    }
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
    /// Size of this chunk on the wire
    pub fn len(&self) -> usize {
        CHUNK_HEADER_LEN + self.payload.len()
    }
    /// Write header & payload to `dst`
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(&CHUNK_MAGIC);
        dst.put_slice(self.id.as_bytes());
        dst.put_u8(self.index);
        dst.put_u8(self.count);
        dst.put_slice(self.payload);
    }
    /// This chunk as a self-contained datagram
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// The datagrams making up one message.
#[derive(Clone, Debug, PartialEq)]
pub enum Datagrams<'a> {
    /// The whole payload, with no chunk header
    Single(&'a [u8]),
    /// Two or more chunks, in sequence order
    Chunked(Vec<Chunk<'a>>),
}

#[allow(clippy::len_without_is_empty)]
impl<'a> Datagrams<'a> {
    /// The number of datagrams to be sent
    pub fn len(&self) -> usize {
        match self {
            Datagrams::Single(_) => 1,
            Datagrams::Chunked(chunks) => chunks.len(),
        }
    }
    pub fn is_chunked(&self) -> bool {
        matches!(self, Datagrams::Chunked(_))
    }
}

/// Splits encoded payloads against a fixed datagram budget.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chunker {
    max_datagram_size: usize,
}

impl std::default::Default for Chunker {
    fn default() -> Self {
        Chunker {
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

impl Chunker {
    /// `max_datagram_size` must leave room for a chunk header and at least one byte of payload.
    pub fn new(max_datagram_size: usize) -> Result<Chunker> {
        if max_datagram_size <= CHUNK_HEADER_LEN {
            return Err(Error::BadDatagramSize {
                size: max_datagram_size,
                back: Backtrace::new(),
            });
        }
        Ok(Chunker { max_datagram_size })
    }
    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }
    /// The most payload a single chunk can carry
    pub fn max_chunk_payload(&self) -> usize {
        self.max_datagram_size - CHUNK_HEADER_LEN
    }
    /// How many datagrams `len` bytes of payload will need
    pub fn datagram_count(&self, len: usize) -> usize {
        if len <= self.max_datagram_size {
            1
        } else {
            len.div_ceil(self.max_chunk_payload())
        }
    }
    /// Split `buf` under a freshly-generated [`MessageId`].
    pub fn chunk<'a>(&self, buf: &'a [u8]) -> Result<Datagrams<'a>> {
        self.chunk_with_id(buf, MessageId::generate())
    }
    /// Split `buf`, tagging each chunk with `id`.
    ///
    /// Fails with [`Error::TooManyChunks`] (and produces nothing) if more than [`MAX_CHUNKS`]
    /// would be needed.
    pub fn chunk_with_id<'a>(&self, buf: &'a [u8], id: MessageId) -> Result<Datagrams<'a>> {
        if buf.len() <= self.max_datagram_size {
            return Ok(Datagrams::Single(buf));
        }

        let count = self.datagram_count(buf.len());
        if count > MAX_CHUNKS {
            return Err(Error::TooManyChunks {
                count,
                back: Backtrace::new(),
            });
        }

        // `count` <= 128, so both it & every index fit in a `u8`
        Ok(Datagrams::Chunked(
            buf.chunks(self.max_chunk_payload())
                .enumerate()
                .map(|(index, payload)| Chunk {
                    id,
                    index: index as u8,
                    count: count as u8,
                    payload,
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod test {

    use super::*;

    /// Receiver-side view of a chunk datagram: (id, index, count, payload)
    fn parse(datagram: &[u8]) -> Option<([u8; 8], u8, u8, &[u8])> {
        if datagram.len() < CHUNK_HEADER_LEN || datagram[..2] != CHUNK_MAGIC {
            return None;
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&datagram[2..10]);
        Some((id, datagram[10], datagram[11], &datagram[12..]))
    }

    #[test]
    fn rejects_tiny_budgets() {
        assert!(matches!(
            Chunker::new(CHUNK_HEADER_LEN),
            Err(Error::BadDatagramSize { size: 12, .. })
        ));
        assert!(Chunker::new(CHUNK_HEADER_LEN + 1).is_ok());
        assert_eq!(
            Chunker::default().max_datagram_size(),
            DEFAULT_MAX_DATAGRAM_SIZE
        );
    }

    #[test]
    fn small_payloads_go_unchunked() {
        let chunker = Chunker::new(100).unwrap();
        for len in [0usize, 1, 50, 99, 100] {
            let buf = vec![7u8; len];
            match chunker.chunk(&buf).unwrap() {
                Datagrams::Single(out) => assert_eq!(out, &buf[..]),
                other => panic!("{} bytes were chunked: {:?}", len, other),
            }
        }
    }

    #[test]
    fn large_payloads_are_chunked() {
        let chunker = Chunker::new(100).unwrap();
        let buf: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let id = MessageId(*b"\x01\x02\x03\x04\x05\x06\x07\x08");
        let datagrams = chunker.chunk_with_id(&buf, id).unwrap();
        assert!(datagrams.is_chunked());
        // 88 bytes of payload per chunk
        assert_eq!(datagrams.len(), 12);

        let chunks = match datagrams {
            Datagrams::Chunked(chunks) => chunks,
            Datagrams::Single(_) => unreachable!(),
        };
        let mut reassembled = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let wire = chunk.to_bytes();
            assert!(wire.len() <= 100);
            let (wid, index, count, payload) = parse(&wire).unwrap();
            assert_eq!(&wid, id.as_bytes());
            assert_eq!(index as usize, i);
            assert_eq!(count, 12);
            reassembled.extend_from_slice(payload);
        }
        assert_eq!(reassembled, buf);
        assert_eq!(chunks.last().unwrap().payload().len(), 1000 - 11 * 88);
    }

    #[test]
    fn one_byte_over_the_budget() {
        let chunker = Chunker::new(100).unwrap();
        let buf = vec![1u8; 101];
        let datagrams = chunker.chunk(&buf).unwrap();
        assert_eq!(datagrams.len(), 2);
    }

    #[test]
    fn chunk_limit() {
        let chunker = Chunker::new(CHUNK_HEADER_LEN + 10).unwrap();
        // Exactly 128 chunks is fine...
        let buf = vec![0u8; 1280];
        assert_eq!(chunker.chunk(&buf).unwrap().len(), MAX_CHUNKS);
        // one more byte is not.
        let buf = vec![0u8; 1281];
        assert!(matches!(
            chunker.chunk(&buf),
            Err(Error::TooManyChunks { count: 129, .. })
        ));
    }

    #[test]
    fn message_ids_differ() {
        let ids: std::collections::HashSet<MessageId> =
            (0..1000).map(|_| MessageId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
