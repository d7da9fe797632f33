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


//! A chunked UDP send with the GELF layer installed as the global default subscriber. The
//! transport logs while it works; those events must not come back through the same transport.

use tracing::info;
use tracing_gelf::{chunker::CHUNK_MAGIC, config::GelfConfig, layer::Layer};
use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

use rand::{distributions::Alphanumeric, Rng};

use std::{net::UdpSocket, sync::mpsc, time::Duration};

#[test]
fn chunked_send_under_global_default() {
    let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
    rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let config = GelfConfig::builder()
        .graylog_host("udp:127.0.0.1")
        .graylog_port(rx.local_addr().unwrap().port())
        .max_datagram_size(64)
        .origin_host("bree.local")
        .build();
    tracing::subscriber::set_global_default(Registry::default().with(Layer::new(&config).unwrap()))
        .unwrap();

    let text: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(2000)
        .map(char::from)
        .collect();
    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        info!("{}", text);
        done_tx.send(()).unwrap();
    });
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("the logging thread never returned");

    let mut buf = [0u8; 1024];
    let n = rx.recv(&mut buf).unwrap();
    assert!(n <= 64);
    assert_eq!(&buf[..2], &CHUNK_MAGIC);
}
