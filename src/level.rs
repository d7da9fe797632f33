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

//! GELF severity levels.
//!
//! GELF borrowed its `level` field from syslog: an integer on the `0` (emergency) through `7`
//! (debug) scale documented in the `syslog()` manual [page]. [`Level`] replicates the names used
//! in `<syslog.h>` so that code written against the syslog constants reads naturally here.
//!
//! [page]: https://man7.org/linux/man-pages/man3/syslog.3.html

type StdResult<T, E> = std::result::Result<T, E>;

/// The eight syslog severities, in wire order.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// system is unusable
    LOG_EMERG = 0,
    /// action must be take immediately
    LOG_ALERT = 1,
    /// critical conditions
    LOG_CRIT = 2,
    /// error conditions
    LOG_ERR = 3,
    /// warning conditions
    LOG_WARNING = 4,
    /// normal, but significant condition
    LOG_NOTICE = 5,
    /// informational message
    LOG_INFO = 6,
    /// debug-level message
    LOG_DEBUG = 7,
}

impl Level {
    /// The integer that goes on the wire
    pub fn severity(self) -> u8 {
        self as u8
    }
}

impl std::default::Default for Level {
    fn default() -> Self {
        Level::LOG_INFO
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Level::LOG_EMERG => "LOG_EMERG",
                Level::LOG_ALERT => "LOG_ALERT",
                Level::LOG_CRIT => "LOG_CRIT",
                Level::LOG_ERR => "LOG_ERR",
                Level::LOG_WARNING => "LOG_WARNING",
                Level::LOG_NOTICE => "LOG_NOTICE",
                Level::LOG_INFO => "LOG_INFO",
                Level::LOG_DEBUG => "LOG_DEBUG",
            }
        )
    }
}

impl std::convert::From<&tracing::Level> for Level {
    /// `tracing` has no notion of anything more severe than `ERROR`, nor anything between `INFO`
    /// and `WARN`, so four of the eight syslog severities are never produced.
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::LOG_DEBUG,
            tracing::Level::INFO => Level::LOG_INFO,
            tracing::Level::WARN => Level::LOG_WARNING,
            tracing::Level::ERROR => Level::LOG_ERR,
        }
    }
}

impl std::convert::TryFrom<u8> for Level {
    type Error = u8;
    fn try_from(x: u8) -> StdResult<Self, Self::Error> {
        match x {
            0 => Ok(Level::LOG_EMERG),
            1 => Ok(Level::LOG_ALERT),
            2 => Ok(Level::LOG_CRIT),
            3 => Ok(Level::LOG_ERR),
            4 => Ok(Level::LOG_WARNING),
            5 => Ok(Level::LOG_NOTICE),
            6 => Ok(Level::LOG_INFO),
            7 => Ok(Level::LOG_DEBUG),
            x => Err(x),
        }
    }
}

#[cfg(test)]
mod level_tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert_eq!(0, Level::LOG_EMERG.severity());
        assert_eq!(3, Level::LOG_ERR.severity());
        assert_eq!(7, Level::LOG_DEBUG.severity());
        assert_eq!(format!("{}", Level::LOG_WARNING), "LOG_WARNING".to_string());
        assert_eq!(Level::try_from(5u8), Ok(Level::LOG_NOTICE));
        assert_eq!(Level::try_from(8u8), Err(8));
    }

    #[test]
    fn test_tracing_mapping() {
        assert_eq!(Level::from(&tracing::Level::TRACE), Level::LOG_DEBUG);
        assert_eq!(Level::from(&tracing::Level::DEBUG), Level::LOG_DEBUG);
        assert_eq!(Level::from(&tracing::Level::INFO), Level::LOG_INFO);
        assert_eq!(Level::from(&tracing::Level::WARN), Level::LOG_WARNING);
        assert_eq!(Level::from(&tracing::Level::ERROR), Level::LOG_ERR);
    }
}
