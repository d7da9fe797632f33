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

//! The origin host.
//!
//! Every GELF message names the host that produced it. By default that's this machine's hostname,
//! looked-up once per process & cached thereafter. Applications may override it (for instance, to
//! report a container or service name instead); the override is process-wide as well, and may be
//! cleared to return to the looked-up value.

use crate::error::{Error, Result};

use backtrace::Backtrace;

use std::sync::{OnceLock, RwLock};

static LOCAL_HOSTNAME: OnceLock<String> = OnceLock::new();
static ORIGIN_HOST_OVERRIDE: RwLock<Option<String>> = RwLock::new(None);

/// Ask the OS for our hostname.
fn lookup_hostname() -> Result<String> {
    let name = hostname::get().map_err(|err| Error::NoHostname {
        source: Box::new(err),
        back: Backtrace::new(),
    })?;
    let name = name.to_string_lossy().trim().to_string();
    if name.is_empty() {
        Err(Error::EmptyHost {
            back: Backtrace::new(),
        })
    } else {
        Ok(name)
    }
}

/// Figure-out a name for this host: the hostname if we can get it, else our IP address, else
/// "localhost".
fn resolve_local_hostname() -> String {
    lookup_hostname()
        .or_else(|_err| {
            local_ip_address::local_ip()
                .map(|ip| ip.to_string())
                .map_err(|err| Error::NoHostname {
                    source: Box::new(err),
                    back: Backtrace::new(),
                })
        })
        .unwrap_or_else(|_| String::from("localhost"))
}

/// This host's name, resolved on first use
pub fn local_hostname() -> &'static str {
    LOCAL_HOSTNAME.get_or_init(resolve_local_hostname)
}

/// The origin host override, if one has been set
pub fn origin_host_override() -> Option<String> {
    // A poisoned lock only means some other thread panicked while holding it; the `Option` inside
    // is still coherent.
    ORIGIN_HOST_OVERRIDE
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// The host name to be placed in outgoing messages: the override, if one has been set, else
/// [`local_hostname`].
pub fn origin_host() -> String {
    origin_host_override().unwrap_or_else(|| local_hostname().to_string())
}

/// Override the origin host for the remainder of the process (or until cleared by passing
/// `None`). Empty names are treated as `None`.
pub fn set_origin_host(host: Option<String>) {
    let mut guard = ORIGIN_HOST_OVERRIDE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = host.filter(|h| !h.is_empty());
}
