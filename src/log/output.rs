use std::fmt;

/// Output stream selector, packed into the [`Log`](super::Log) descriptor.
///
/// `Default` is deliberately distinct from `Stderr` in the encoding even
/// though it currently writes there too, so redirecting the default later
/// does not change existing descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Output {
    #[default]
    Default = 0,
    Stdout = 1,
    Stderr = 2,
    Disabled = 9,
}

impl Output {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode an output selector; unknown values map to `Default`.
    #[inline]
    pub const fn from_u8(v: u8) -> Output {
        match v {
            1 => Output::Stdout,
            2 => Output::Stderr,
            9 => Output::Disabled,
            _ => Output::Default,
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Output::Default => "default",
            Output::Stdout => "stdout",
            Output::Stderr => "stderr",
            Output::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for out in [Output::Default, Output::Stdout, Output::Stderr, Output::Disabled] {
            assert_eq!(Output::from_u8(out.as_u8()), out);
        }
        assert_eq!(Output::from_u8(7), Output::Default);
    }
}
