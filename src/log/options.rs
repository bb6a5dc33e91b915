use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::Error;

/// Bit set of per-log formatting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options(u8);

/// Option names, one per bit, used by `Display` and parsing.
const OPTION_NAMES: [&str; 5] = [
    "location_short",
    "location_long",
    "timestamp",
    "backtrace_short",
    "backtrace_long",
];

impl Options {
    /// No options.
    pub const NONE: Options = Options(0);
    /// Prefix lines with the trailing components of the call-site path.
    pub const LOC_SHORT: Options = Options(1 << 0);
    /// Prefix lines with the full call-site path.
    pub const LOC_LONG: Options = Options(1 << 1);
    /// Prefix lines with a Unix-epoch timestamp.
    pub const TIMESTAMP: Options = Options(1 << 2);
    /// Append a condensed backtrace of the call.
    pub const BACKTRACE_SHORT: Options = Options(1 << 3);
    /// Append a full backtrace of the call.
    pub const BACKTRACE_LONG: Options = Options(1 << 4);

    const KNOWN: u8 = 0x1f;

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstruct from raw bits; unknown bits are preserved but render
    /// as unknown.
    #[inline]
    pub const fn from_bits(bits: u8) -> Options {
        Options(bits)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Options) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set in `self`.
    #[inline]
    pub const fn intersects(self, other: Options) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Options {
    type Output = Options;

    fn bitor(self, rhs: Options) -> Options {
        Options(self.0 | rhs.0)
    }
}

/// Renders the set option names separated by `|`, `none` when empty.
impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (i, name) in OPTION_NAMES.iter().enumerate() {
            if self.0 & (1 << i) != 0 {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if self.0 & !Options::KNOWN != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "unknown(0x{:02x})", self.0 & !Options::KNOWN)?;
        }
        Ok(())
    }
}

impl FromStr for Options {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(Options::NONE);
        }
        let mut opts = Options::NONE;
        for part in s.split('|') {
            let part = part.trim();
            let bit = OPTION_NAMES
                .iter()
                .position(|name| part.eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::InvalidOptions(part.to_string()))?;
            opts = opts | Options(1 << bit);
        }
        Ok(opts)
    }
}
