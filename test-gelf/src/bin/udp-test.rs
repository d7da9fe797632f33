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

//! Test writing to a GELF UDP input on port 12201 on the local host.

use tracing::{debug, error, info, trace, warn};
use tracing_gelf::{config::GelfConfig, layer::Layer};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let config = GelfConfig::builder()
        .graylog_host("udp:localhost")
        .facility("udp-test")
        .add_extended_information(true)
        .build();
    // Setup the real subsriber...
    let subscriber = Registry::default().with(Layer::new(&config).unwrap());
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, 世界!");
    debug!("Hello, 世界!");
    info!(answer = 42, "Hello, 世界!");
    warn!("Hello, 世界!");
    error!("Hello, 世界!");
    // Large enough to need chunking, even after compression
    let big: String = (0..20_000u32)
        .map(|i| char::from(b'!' + ((i * 7919) % 94) as u8))
        .collect();
    info!("{}", big);
}
