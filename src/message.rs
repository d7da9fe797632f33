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

//! The GELF message.
//!
//! A [`GelfMessage`] is one log record, ready for the wire. It is assembled once per event via
//! [`GelfMessageBuilder`], handed to a [`Transport`], and discarded; there are no setters.
//!
//! [`Transport`]: crate::transport::Transport
//!
//! # Examples
//!
//! ```rust
//! use tracing_gelf::{level::Level, message::GelfMessage};
//! let msg = GelfMessage::builder("disk is nearly full")
//!     .level(Level::LOG_WARNING)
//!     .host("bree.local")
//!     .facility("storage")
//!     .field("mount", "/var")
//!     .build();
//! assert_eq!(msg.short_message(), "disk is nearly full");
//! assert_eq!(msg.level(), Level::LOG_WARNING);
//! ```

use crate::{host, level::Level};

use chrono::prelude::*;

use std::collections::BTreeMap;

/// Messages longer than this (in characters) get a truncated `short_message`
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 250;

/// An additional field by this name supplies the message's host, rather than being sent along
pub const ORIGIN_HOST_KEY: &str = "originHost";

/// Placed between the rendered message & a stack trace in `full_message`
pub const LINE_SEPARATOR: &str = "\n";

/// One log entry in the GELF data model.
#[derive(Clone, Debug, PartialEq)]
pub struct GelfMessage {
    short_message: String,
    full_message: String,
    timestamp_ms: i64,
    level: Level,
    host: String,
    facility: Option<String>,
    file: Option<String>,
    line: Option<u32>,
    additional_fields: BTreeMap<String, String>,
}

/// Clip `text` to fit the `short_message` field.
///
/// Note that the result is one character shorter than [`MAX_SHORT_MESSAGE_LENGTH`] when
/// truncation occurs, which is what Graylog's Java appenders have always produced.
fn shorten(text: &str) -> String {
    if text.chars().count() > MAX_SHORT_MESSAGE_LENGTH {
        text.chars().take(MAX_SHORT_MESSAGE_LENGTH - 1).collect()
    } else {
        text.to_string()
    }
}

impl GelfMessage {
    /// Begin building a message whose text is `message`
    pub fn builder<S: Into<String>>(message: S) -> GelfMessageBuilder {
        GelfMessageBuilder::new(message)
    }
    /// A message with default settings: the current time, `LOG_INFO`, the default origin host
    pub fn new<S: Into<String>>(message: S) -> GelfMessage {
        GelfMessage::builder(message).build()
    }
    pub fn short_message(&self) -> &str {
        &self.short_message
    }
    pub fn full_message(&self) -> &str {
        &self.full_message
    }
    /// Milliseconds since the Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_ms
    }
    /// The wire representation of the timestamp: seconds since the Unix epoch with a millisecond
    /// fraction
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }
    pub fn level(&self) -> Level {
        self.level
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn facility(&self) -> Option<&str> {
        self.facility.as_deref()
    }
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
    pub fn line(&self) -> Option<u32> {
        self.line
    }
    pub fn additional_fields(&self) -> &BTreeMap<String, String> {
        &self.additional_fields
    }
    /// A message can only be sent if it names its origin
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty()
    }
}

/// Assembles a [`GelfMessage`].
pub struct GelfMessageBuilder {
    message: String,
    stacktrace: Option<String>,
    timestamp_ms: Option<i64>,
    level: Level,
    host: Option<String>,
    facility: Option<String>,
    file: Option<String>,
    line: Option<u32>,
    additional_fields: BTreeMap<String, String>,
}

impl GelfMessageBuilder {
    fn new<S: Into<String>>(message: S) -> GelfMessageBuilder {
        GelfMessageBuilder {
            message: message.into(),
            stacktrace: None,
            timestamp_ms: None,
            level: Level::default(),
            host: None,
            facility: None,
            file: None,
            line: None,
            additional_fields: BTreeMap::new(),
        }
    }
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp_ms = Some(timestamp.timestamp_millis());
        self
    }
    pub fn timestamp_millis(mut self, millis: i64) -> Self {
        self.timestamp_ms = Some(millis);
        self
    }
    /// Name the origin host explicitly; this takes precedence over both an `originHost` field &
    /// the process-wide default.
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }
    pub fn facility<S: Into<String>>(mut self, facility: S) -> Self {
        self.facility = Some(facility.into());
        self
    }
    pub fn location<S: Into<String>>(mut self, file: S, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }
    /// Append a rendered stack trace to the full message (only); repeated calls append in turn.
    pub fn stacktrace<S: Into<String>>(mut self, trace: S) -> Self {
        let trace = trace.into();
        self.stacktrace = Some(match self.stacktrace {
            Some(prior) => prior + LINE_SEPARATOR + &trace,
            None => trace,
        });
        self
    }
    /// Add an additional field; a later value for the same name replaces an earlier one.
    pub fn field<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.additional_fields.insert(name.into(), value.into());
        self
    }
    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.additional_fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
    pub fn build(mut self) -> GelfMessage {
        let origin_field = self.additional_fields.remove(ORIGIN_HOST_KEY);
        let host = self
            .host
            .or(origin_field)
            .unwrap_or_else(host::origin_host);

        let short_message = shorten(&self.message);
        let full_message = match self.stacktrace {
            Some(trace) => self.message + LINE_SEPARATOR + &trace,
            None => self.message,
        };

        GelfMessage {
            short_message,
            full_message,
            timestamp_ms: self
                .timestamp_ms
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            level: self.level,
            host,
            facility: self.facility,
            file: self.file,
            line: self.line,
            additional_fields: self.additional_fields,
        }
    }
}
