use std::fmt;

/// Unified error type for buflog operations.
///
/// Pool full/empty and log-gate outcomes are not errors; they are
/// expected results expressed in the pool and log APIs directly. This
/// type covers configuration parsing only.
#[derive(Debug)]
pub enum Error {
    /// Unrecognized log level name.
    InvalidLevel(String),

    /// Unrecognized log option name.
    InvalidOptions(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidLevel(name) => write!(f, "invalid log level: {}", name),
            Error::InvalidOptions(name) => write!(f, "invalid log option: {}", name),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias for buflog operations.
pub type Result<T> = std::result::Result<T, Error>;
