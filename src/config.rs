use clap::Parser;

use crate::error::Result;
use crate::log::{Level, Options, Output};

/// buflog - pool stress driver for the buffered leveled logger
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of worker threads hammering the pool
    #[arg(short, long, default_value = "8")]
    pub threads: usize,

    /// Pop/push iterations per thread
    #[arg(short, long, default_value = "10000")]
    pub iterations: usize,

    /// Log level (bug, crit, err, warn, notice, info, dbg)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log options, |-separated (location_short, location_long,
    /// timestamp, backtrace_short, backtrace_long)
    #[arg(long, default_value = "none")]
    pub log_options: String,

    /// Send log output to stderr instead of stdout
    #[arg(long)]
    pub stderr: bool,

    /// Drive the mutex baseline pool instead of the lock-free one
    #[arg(long)]
    pub locked: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse_args() -> Self {
        Config::parse()
    }

    /// Parsed log level
    pub fn level(&self) -> Result<Level> {
        self.log_level.parse()
    }

    /// Parsed log options
    pub fn options(&self) -> Result<Options> {
        self.log_options.parse()
    }

    /// Selected log output
    pub fn output(&self) -> Output {
        if self.stderr {
            Output::Stderr
        } else {
            Output::Stdout
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 8,
            iterations: 10_000,
            log_level: "info".to_string(),
            log_options: "none".to_string(),
            stderr: false,
            locked: false,
        }
    }
}
