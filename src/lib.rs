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
//! A [`tracing-subscriber`] [`Layer`] implementation for shipping [`tracing`] [`Event`]s to a
//! [Graylog] server as [GELF] messages
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [Graylog]: https://graylog.org/
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! # Introduction
//!
//! GELF, the Graylog Extended Log Format, is a JSON object carrying a short & full message, a
//! syslog severity, a timestamp, the origin host, and any number of additional fields. It may be
//! sent over UDP or TCP:
//!
//! - over UDP each message is gzip'd and, if still too large for one datagram, split into as many
//!   as 128 chunks, each tagged with a shared message id & its sequence number so that the server
//!   can reassemble it
//!
//! - over TCP each message is written uncompressed, followed by a NUL byte, on a persistent
//!   connection
//!
//! The translation from a [`tracing`] event to bytes on the wire happens in four steps:
//!
//! 1. [`layer::Layer`] maps the event onto a [`message::GelfMessage`]
//! 2. [`encoder`] serializes (and for UDP, compresses) the message
//! 3. for UDP, [`chunker::Chunker`] splits the payload into datagrams
//! 4. a [`transport::Transport`] writes the result to its socket
//!
//! Each step may be used on its own; applications with their own logging pipeline can build
//! [`message::GelfMessage`]s directly & hand them to a [`sender::GelfSender`].
//!
//! # Usage
//!
//! ```no_run
//! use tracing::info;
//! use tracing_gelf::{config::GelfConfig, layer::Layer};
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! let config = GelfConfig::builder()
//!     .graylog_host("tcp:graylog.example.com")
//!     .facility("billing")
//!     .build();
//! let subscriber = Registry::default().with(Layer::new(&config).unwrap());
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(user = "alice", "Hello, world!");
//! ```
//!
//! Sending without [`tracing`]:
//!
//! ```no_run
//! use tracing_gelf::{
//!     level::Level,
//!     message::GelfMessage,
//!     sender::{Endpoint, GelfSender},
//!     transport::Transport,
//! };
//!
//! let sender = GelfSender::new(&Endpoint::parse("graylog.example.com", 12201).unwrap()).unwrap();
//! sender
//!     .send(&GelfMessage::builder("disk nearly full").level(Level::LOG_WARNING).build())
//!     .unwrap();
//! sender.close();
//! ```
//!
//! Delivery is fire-and-forget: a failed send is reported to the caller, but never retried beyond
//! the TCP transport's single reconnect.

pub mod chunker;
pub mod config;
pub mod encoder;
pub mod error;
pub mod host;
pub mod layer;
pub mod level;
pub mod message;
pub mod sender;
pub mod transport;
