use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Logging level, ordered from most severe (`Bug`) to most verbose (`Dbg`).
///
/// The numeric values are part of the packed [`Log`](super::Log) encoding;
/// a log passes messages whose level is less than or equal to its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i8)]
pub enum Level {
    Bug = -3,
    Crit = -2,
    Err = -1,
    Warn = 0,
    Notice = 1,
    Info = 2,
    Dbg = 3,
}

/// Level names, kept in sync with the `Level` discriminants.
const LEVEL_NAMES: [&str; 7] = ["BUG", "CRIT", "ERR", "WARN", "NOTICE", "INFO", "DBG"];

impl Level {
    /// Most severe level.
    pub const MIN: Level = Level::Bug;
    /// Most verbose level.
    pub const MAX: Level = Level::Dbg;

    #[inline]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    /// Decode a level from its numeric value.
    pub const fn from_i8(v: i8) -> Option<Level> {
        match v {
            -3 => Some(Level::Bug),
            -2 => Some(Level::Crit),
            -1 => Some(Level::Err),
            0 => Some(Level::Warn),
            1 => Some(Level::Notice),
            2 => Some(Level::Info),
            3 => Some(Level::Dbg),
            _ => None,
        }
    }

    /// The level name as it appears in line prefixes.
    pub const fn name(self) -> &'static str {
        LEVEL_NAMES[(self as i8 - Level::MIN.as_i8()) as usize]
    }

    /// The prefix tag written ahead of messages at this level.
    pub(crate) const fn tag(self) -> &'static str {
        match self {
            Level::Bug => "BUG: ",
            Level::Crit => "CRIT: ",
            Level::Err => "ERROR: ",
            Level::Warn => "WARN: ",
            Level::Notice => "NOTICE: ",
            Level::Info => "INFO: ",
            Level::Dbg => "DBG: ",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "bug" => Ok(Level::Bug),
            "crit" | "critical" => Ok(Level::Crit),
            "err" | "error" => Ok(Level::Err),
            "warn" | "warning" => Ok(Level::Warn),
            "notice" => Ok(Level::Notice),
            "info" => Ok(Level::Info),
            "dbg" | "debug" => Ok(Level::Dbg),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}
