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

//! [tracing-gelf](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! [`Layer`] maps each [`tracing`] [`Event`] onto a [`GelfMessage`] & hands it to a
//! [`Transport`]. By default that's a [`GelfSender`], but consumers of this crate are of course
//! free to implement [`Transport`] for themselves.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html

use crate::{
    config::GelfConfig,
    error::Result,
    level::Level,
    message::{GelfMessage, LINE_SEPARATOR},
    sender::GelfSender,
    transport::{Transport, UdpTransport},
};

use chrono::prelude::*;
use tracing::Event;
use tracing_subscriber::layer::Context;

use std::{cell::Cell, collections::BTreeMap};

// Recovers the caller's file & line for records bridged in from the `log` crate
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

/// Extended-information field naming the thread that emitted the event
pub const THREAD_NAME: &str = "thread";
/// Extended-information field naming the event's target
pub const LOGGER_NAME: &str = "logger";
/// Extended-information field carrying the event time in raw milliseconds
pub const TIMESTAMP_MS: &str = "timestampMs";

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        event visitation                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Collects the message, the other fields, and any errors recorded on an [`Event`].
#[derive(Default)]
struct GelfEventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
    errors: Vec<String>,
}

impl GelfEventVisitor {
    fn record(&mut self, field: &tracing::field::Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            // tracing-log's bookkeeping; surfaced through normalized metadata instead
            name if name.starts_with("log.") => (),
            name => self.fields.push((name.to_string(), value)),
        }
    }
}

impl tracing::field::Visit for GelfEventVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // The tracing macros take care to "pre-format" the `message` field so that `value`
        // actually refers to a `std::fmt::Arguments` instance, which will print to a debug format
        // without enclosing double-quotes.
        self.record(field, format!("{:?}", value));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record(field, value.to_string());
    }
    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        let mut rendered = value.to_string();
        let mut cause = value.source();
        while let Some(err) = cause {
            rendered.push_str(LINE_SEPARATOR);
            rendered.push_str("Caused by: ");
            rendered.push_str(&err.to_string());
            cause = err.source();
        }
        self.errors.push(rendered);
        self.record(field, value.to_string());
    }
}

thread_local! {
    static HANDLING_EVENT: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside [`Layer::on_event`] for as long as it lives.
///
/// Events emitted while a message is being sent (the transports' own diagnostics, or the report
/// of a failed send) may be dispatched right back to this layer; sending those would deadlock on
/// the transport's lock, or recurse without bound when every send fails. They are left to the
/// other layers in the stack.
struct HandlingEvent;

impl HandlingEvent {
    fn enter() -> Option<HandlingEvent> {
        HANDLING_EVENT.with(|flag| {
            if flag.replace(true) {
                None
            } else {
                Some(HandlingEvent)
            }
        })
    }
}

impl Drop for HandlingEvent {
    fn drop(&mut self) {
        HANDLING_EVENT.with(|flag| flag.set(false));
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will send [`Event`]s to a
/// Graylog GELF input.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// Sends are synchronous: the thread that emits an event blocks until the message has been handed
/// to the OS. Applications that can't tolerate that should dispatch from a background worker.
pub struct Layer<T: Transport = GelfSender> {
    transport: T,
    include_location: bool,
    extract_stacktrace: bool,
    add_extended_information: bool,
    facility: Option<String>,
    fields: BTreeMap<String, String>,
    origin_host: Option<String>,
}

impl Layer<GelfSender> {
    /// Build a [`GelfSender`] from `config` & wrap it in a [`Layer`]
    pub fn new(config: &GelfConfig) -> Result<Self> {
        Ok(Layer::with_transport_and_config(
            GelfSender::from_config(config)?,
            config,
        ))
    }
    /// Attempt to construct a [`Layer`] that will send GELF messages via UDP to port 12201 on
    /// localhost
    pub fn try_default() -> Result<Self> {
        Ok(Layer::with_transport(GelfSender::Udp(UdpTransport::local()?)))
    }
}

impl<T: Transport> Layer<T> {
    /// Construct a Layer that will send messages via transport `transport`, with default settings
    pub fn with_transport(transport: T) -> Self {
        Layer::with_transport_and_config(transport, &GelfConfig::default())
    }
    /// Construct a Layer that will send messages via transport `transport`; the connection
    /// settings in `config` are ignored.
    pub fn with_transport_and_config(transport: T, config: &GelfConfig) -> Self {
        Layer {
            transport,
            include_location: config.include_location,
            extract_stacktrace: config.extract_stacktrace,
            add_extended_information: config.add_extended_information,
            facility: config.facility.clone(),
            fields: config.additional_fields.clone(),
            origin_host: config.origin_host.clone().filter(|h| !h.is_empty()),
        }
    }
    pub fn transport(&self) -> &T {
        &self.transport
    }
    /// Release the underlying transport; events arriving afterward are dropped.
    pub fn close(&self) {
        self.transport.close()
    }
    /// Map `event` onto a [`GelfMessage`].
    pub fn make_message(&self, event: &Event<'_>) -> GelfMessage {
        // When the tracing-log feature is enabled, use normalized_metadata() to get
        // file/line info for events that originated from the `log` crate.
        // For native tracing events, normalized_metadata() returns None and we use
        // the event's own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let mut visitor = GelfEventVisitor::default();
        event.record(&mut visitor);

        let now = Utc::now();
        let mut builder = GelfMessage::builder(visitor.message.unwrap_or_default())
            .level(Level::from(meta.level()))
            .timestamp(now);

        if let Some(host) = &self.origin_host {
            builder = builder.host(host.as_str());
        }
        if let Some(facility) = &self.facility {
            builder = builder.facility(facility.as_str());
        }
        if self.include_location {
            if let Some(file) = meta.file() {
                builder = builder.location(file, meta.line());
            }
        }
        if self.extract_stacktrace {
            for trace in visitor.errors {
                builder = builder.stacktrace(trace);
            }
        }

        builder = builder.fields(self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if self.add_extended_information {
            let thread = std::thread::current();
            let thread_name = thread
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", thread.id()));
            builder = builder
                .field(THREAD_NAME, thread_name)
                .field(LOGGER_NAME, meta.target())
                .field(TIMESTAMP_MS, now.timestamp_millis().to_string())
                .fields(visitor.fields);
        }

        builder.build()
    }
}

/// The [`Layer`] implementation proper.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, T> tracing_subscriber::layer::Layer<S> for Layer<T>
where
    S: tracing::Subscriber,
    T: Transport + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let _guard = match HandlingEvent::enter() {
            Some(guard) => guard,
            None => return,
        };
        let message = self.make_message(event);
        if let Err(err) = self.transport.send(&message) {
            ::tracing::error!("Failed to send a GELF message: {}", err);
        }
    }
}
