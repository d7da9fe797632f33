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

//! [tracing-gelf](crate) configuration.
//!
//! [`GelfConfig`] gathers every knob the sender & layer expose. Build one in code:
//!
//! ```rust
//! use tracing_gelf::config::GelfConfig;
//! let config = GelfConfig::builder()
//!     .graylog_host("tcp:graylog.example.com")
//!     .facility("billing")
//!     .add_extended_information(true)
//!     .field("environment", "staging")
//!     .build();
//! assert_eq!(config.graylog_port, 12201);
//! ```
//!
//! or deserialize it (every field but `graylog_host` has a default):
//!
//! ```rust
//! use tracing_gelf::config::GelfConfig;
//! let config: GelfConfig =
//!     serde_json::from_str(r#"{"graylog_host": "udp:10.0.0.7", "extract_stacktrace": true}"#)
//!         .unwrap();
//! assert!(config.include_location);
//! ```

use crate::{
    chunker::DEFAULT_MAX_DATAGRAM_SIZE,
    error::{Error, Result},
    sender::Endpoint,
    transport::DEFAULT_PORT,
};

use backtrace::Backtrace;
use serde::Deserialize;

use std::collections::BTreeMap;

/// Everything needed to stand-up a GELF sender & layer
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GelfConfig {
    /// Graylog host, optionally prefixed with `tcp:` or `udp:` (the default)
    pub graylog_host: String,
    pub graylog_port: u16,
    /// UDP datagram budget, chunk headers included
    pub max_datagram_size: usize,
    /// Record the source file & line of each event
    pub include_location: bool,
    /// Append errors recorded on an event (and their causes) to the full message
    pub extract_stacktrace: bool,
    /// Add thread, logger & raw timestamp fields, along with every field recorded on the event
    pub add_extended_information: bool,
    pub facility: Option<String>,
    /// Static fields added to every message
    pub additional_fields: BTreeMap<String, String>,
    /// Report this as the origin host rather than looking-up our hostname
    pub origin_host: Option<String>,
}

impl std::default::Default for GelfConfig {
    fn default() -> Self {
        GelfConfig {
            graylog_host: String::new(),
            graylog_port: DEFAULT_PORT,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            include_location: true,
            extract_stacktrace: false,
            add_extended_information: false,
            facility: None,
            additional_fields: BTreeMap::new(),
            origin_host: None,
        }
    }
}

impl GelfConfig {
    pub fn builder() -> GelfConfigBuilder {
        GelfConfigBuilder {
            imp: GelfConfig::default(),
        }
    }
    /// Parse the protocol, host & port out of this configuration
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.graylog_host, self.graylog_port)
    }
}

/// Parse additional fields given as a JSON object.
///
/// Appender configurations traditionally write these with single quotes (`{'env':'prod'}`) to
/// avoid escaping inside XML or properties files, so single quotes are accepted as double quotes.
/// Non-string values are kept in their JSON form.
pub fn parse_additional_fields(text: &str) -> Result<BTreeMap<String, String>> {
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text.replace('\'', "\"")).map_err(|err| {
            Error::BadAdditionalFields {
                text: text.to_string(),
                source: err,
                back: Backtrace::new(),
            }
        })?;
    Ok(map
        .into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect())
}

pub struct GelfConfigBuilder {
    imp: GelfConfig,
}

impl GelfConfigBuilder {
    pub fn graylog_host<S: Into<String>>(mut self, host: S) -> Self {
        self.imp.graylog_host = host.into();
        self
    }
    pub fn graylog_port(mut self, port: u16) -> Self {
        self.imp.graylog_port = port;
        self
    }
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.imp.max_datagram_size = size;
        self
    }
    pub fn include_location(mut self, include_location: bool) -> Self {
        self.imp.include_location = include_location;
        self
    }
    pub fn extract_stacktrace(mut self, extract_stacktrace: bool) -> Self {
        self.imp.extract_stacktrace = extract_stacktrace;
        self
    }
    pub fn add_extended_information(mut self, add_extended_information: bool) -> Self {
        self.imp.add_extended_information = add_extended_information;
        self
    }
    pub fn facility<S: Into<String>>(mut self, facility: S) -> Self {
        self.imp.facility = Some(facility.into());
        self
    }
    pub fn field<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.imp.additional_fields.insert(name.into(), value.into());
        self
    }
    /// Add the fields in `text`; see [`parse_additional_fields`]
    pub fn additional_fields_as_string(mut self, text: &str) -> Result<Self> {
        self.imp
            .additional_fields
            .extend(parse_additional_fields(text)?);
        Ok(self)
    }
    pub fn origin_host<S: Into<String>>(mut self, host: S) -> Self {
        self.imp.origin_host = Some(host.into());
        self
    }
    pub fn build(self) -> GelfConfig {
        self.imp
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::sender::Protocol;

    #[test]
    fn defaults() {
        let config = GelfConfig::default();
        assert_eq!(config.graylog_port, 12201);
        assert_eq!(config.max_datagram_size, 1420);
        assert!(config.include_location);
        assert!(!config.extract_stacktrace);
        assert!(!config.add_extended_information);
        // No host, no endpoint
        assert!(matches!(config.endpoint(), Err(Error::EmptyHost { .. })));
    }

    #[test]
    fn builder() {
        let config = GelfConfig::builder()
            .graylog_host("tcp:graylog.example.com")
            .graylog_port(12202)
            .max_datagram_size(8192)
            .include_location(false)
            .facility("billing")
            .field("env", "prod")
            .additional_fields_as_string("{'region':'us-west-2', 'shard': 7}")
            .unwrap()
            .origin_host("billing-01")
            .build();
        let ep = config.endpoint().unwrap();
        assert_eq!(ep.protocol(), Protocol::Tcp);
        assert_eq!(ep.host(), "graylog.example.com");
        assert_eq!(ep.port(), 12202);
        assert!(!config.include_location);
        assert_eq!(config.facility.as_deref(), Some("billing"));
        assert_eq!(config.additional_fields.len(), 3);
        assert_eq!(config.additional_fields["region"], "us-west-2");
        assert_eq!(config.additional_fields["shard"], "7");
        assert_eq!(config.origin_host.as_deref(), Some("billing-01"));
    }

    #[test]
    fn bad_additional_fields() {
        assert!(matches!(
            parse_additional_fields("{'unterminated"),
            Err(Error::BadAdditionalFields { .. })
        ));
        assert!(parse_additional_fields("['not', 'an', 'object']").is_err());
    }

    #[test]
    fn deserialize() {
        let config: GelfConfig = serde_json::from_str(
            r#"{
                 "graylog_host": "udp:10.0.0.7",
                 "graylog_port": 5555,
                 "add_extended_information": true,
                 "additional_fields": {"team": "payments"}
               }"#,
        )
        .unwrap();
        assert_eq!(config.graylog_host, "udp:10.0.0.7");
        assert_eq!(config.graylog_port, 5555);
        assert!(config.add_extended_information);
        assert!(config.include_location);
        assert_eq!(config.additional_fields["team"], "payments");
        assert_eq!(config.max_datagram_size, DEFAULT_MAX_DATAGRAM_SIZE);
    }
}
