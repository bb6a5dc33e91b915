//! Level-based logging on recycled scratch buffers.
//!
//! A [`Log`] is a single `u64` packing the output selector, the option
//! bits, and the maximum enabled level, so a descriptor is copied and
//! inspected without indirection. Formatting happens into a buffer taken
//! from the process-wide scratch pool, so steady-state logging does not
//! allocate.

mod level;
mod options;
mod output;

pub use level::Level;
pub use options::Options;
pub use output::Output;

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};

use crate::pool::scratch_pool;

/// Descriptor layout: `output << 16 | options << 8 | level` (low 3 bytes
/// used, 5 free).
const LEVEL_MASK: u64 = 0xff;
const OPT_MASK: u64 = 0xff00;
const OUTPUT_MASK: u64 = 0xff_0000;
const OPT_SHIFT: u32 = 8;
const OUTPUT_SHIFT: u32 = 16;

/// Frames rendered per backtrace.
const BACKTRACE_FRAMES: usize = 10;

/// Compiled-in switch for debug-level logging.
///
/// With the `debug-logs` feature off this is `false` at compile time, so
/// every `log_dbg!` call site folds away.
#[inline]
pub const fn debug_enabled() -> bool {
    cfg!(feature = "debug-logs")
}

/// Call-site location, captured by the logging macros.
#[derive(Debug, Clone, Copy)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

/// A packed log descriptor: level, options, and output in one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Log(u64);

impl Log {
    /// Build a descriptor from its parts.
    pub const fn new(level: Level, options: Options, output: Output) -> Self {
        Log(((output.as_u8() as u64) << OUTPUT_SHIFT)
            | ((options.bits() as u64) << OPT_SHIFT)
            | (level.as_i8() as u8 as u64))
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Log(bits)
    }

    #[inline]
    const fn level_i8(self) -> i8 {
        (self.0 & LEVEL_MASK) as u8 as i8
    }

    /// Current maximum enabled level. Invalid encodings clamp to `Warn`.
    #[inline]
    pub fn level(self) -> Level {
        Level::from_i8(self.level_i8()).unwrap_or(Level::Warn)
    }

    #[inline]
    pub const fn options(self) -> Options {
        Options::from_bits(((self.0 & OPT_MASK) >> OPT_SHIFT) as u8)
    }

    #[inline]
    pub const fn output(self) -> Output {
        Output::from_u8(((self.0 & OUTPUT_MASK) >> OUTPUT_SHIFT) as u8)
    }

    #[inline]
    pub const fn with_level(self, level: Level) -> Self {
        Log((self.0 & !LEVEL_MASK) | (level.as_i8() as u8 as u64))
    }

    #[inline]
    pub const fn with_options(self, options: Options) -> Self {
        Log((self.0 & !OPT_MASK) | ((options.bits() as u64) << OPT_SHIFT))
    }

    #[inline]
    pub const fn with_output(self, output: Output) -> Self {
        Log((self.0 & !OUTPUT_MASK) | ((output.as_u8() as u64) << OUTPUT_SHIFT))
    }

    /// True if messages at `level` pass this descriptor's gate.
    ///
    /// Cheap enough to guard expensive argument construction before
    /// calling a logging function.
    #[inline]
    pub const fn enabled(self, level: Level) -> bool {
        self.level_i8() >= level.as_i8()
    }

    /// Log without any level tag (gate and options still apply).
    pub fn log(&self, level: Level, args: fmt::Arguments) {
        self.log_with(level, "", None, args);
    }

    /// Log with an explicit tag and optional call site.
    ///
    /// This is the full pipeline the leveled macros and convenience
    /// methods funnel into: gate, render into a pooled buffer, write to
    /// the selected stream, recycle the buffer.
    pub fn log_with(&self, level: Level, tag: &str, site: Option<CallSite>, args: fmt::Arguments) {
        if !self.enabled(level) {
            return;
        }
        let mut buf = scratch_pool().acquire();
        self.render(tag, site, args, &mut buf);
        self.emit(&buf);
        scratch_pool().release(buf);
    }

    /// Log and additionally copy the bare message to `w` when `wcond`.
    ///
    /// The copy is independent of the level gate; it also gives tests a
    /// capture point.
    pub fn log_mux<W: io::Write>(&self, w: &mut W, wcond: bool, level: Level, args: fmt::Arguments) {
        self.log_with(level, "", None, args);
        if wcond {
            let _ = w.write_fmt(args);
        }
    }

    /// Log at `Bug` with a PANIC tag, then panic with the same message.
    pub fn log_panic(&self, site: Option<CallSite>, args: fmt::Arguments) -> ! {
        let msg = fmt::format(args);
        self.log_with(Level::Bug, "BUG: PANIC: ", site, format_args!("{msg}\n"));
        panic!("{msg}");
    }

    pub fn dbg(&self, args: fmt::Arguments) {
        if debug_enabled() {
            self.log_with(Level::Dbg, Level::Dbg.tag(), None, args);
        }
    }

    pub fn info(&self, args: fmt::Arguments) {
        self.log_with(Level::Info, Level::Info.tag(), None, args);
    }

    pub fn notice(&self, args: fmt::Arguments) {
        self.log_with(Level::Notice, Level::Notice.tag(), None, args);
    }

    pub fn warn(&self, args: fmt::Arguments) {
        self.log_with(Level::Warn, Level::Warn.tag(), None, args);
    }

    pub fn err(&self, args: fmt::Arguments) {
        self.log_with(Level::Err, Level::Err.tag(), None, args);
    }

    pub fn crit(&self, args: fmt::Arguments) {
        self.log_with(Level::Crit, Level::Crit.tag(), None, args);
    }

    pub fn bug(&self, args: fmt::Arguments) {
        self.log_with(Level::Bug, Level::Bug.tag(), None, args);
    }

    /// Assemble the full line: optional timestamp, optional call site,
    /// optional backtrace, the tag, then the message. No newline is
    /// appended; callers terminate lines themselves.
    fn render(&self, tag: &str, site: Option<CallSite>, args: fmt::Arguments, out: &mut BytesMut) {
        let opts = self.options();
        let mut w = (&mut *out).writer();

        if opts.contains(Options::TIMESTAMP) {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            let _ = write!(w, "{}.{:03}: ", now.as_secs(), now.subsec_millis());
        }
        if opts.intersects(Options::LOC_SHORT | Options::LOC_LONG) {
            if let Some(site) = site {
                let file = if opts.contains(Options::LOC_SHORT) {
                    trailing_path(site.file, 2)
                } else {
                    site.file
                };
                let _ = write!(w, "{}:{}: ", file, site.line);
            }
        }
        if opts.intersects(Options::BACKTRACE_SHORT | Options::BACKTRACE_LONG) {
            let long = opts.contains(Options::BACKTRACE_LONG);
            append_backtrace(&mut w, long);
        }
        let _ = w.write_all(tag.as_bytes());
        let _ = w.write_fmt(args);
    }

    /// Write a finished line to the selected stream. Write errors are
    /// swallowed; a logger has nowhere to report them.
    fn emit(&self, line: &[u8]) {
        match self.output() {
            Output::Stdout => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(line);
            }
            Output::Disabled => {}
            Output::Default | Output::Stderr => {
                let mut err = io::stderr().lock();
                let _ = err.write_all(line);
            }
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Log::new(Level::MAX, Options::NONE, Output::Stdout)
    }
}

/// The process-wide default log descriptor.
///
/// One atomic word rather than ambient mutable state: readers take a
/// relaxed snapshot, setters store a whole new descriptor.
static DEFAULT_LOG: AtomicU64 = AtomicU64::new(Log::new(Level::MAX, Options::NONE, Output::Stdout).bits());

/// Snapshot the default log descriptor.
#[inline]
pub fn default_log() -> Log {
    Log::from_bits(DEFAULT_LOG.load(Ordering::Relaxed))
}

/// Replace the default log descriptor.
pub fn set_default_log(log: Log) {
    DEFAULT_LOG.store(log.bits(), Ordering::Relaxed);
}

/// Change only the default log's level.
pub fn set_default_level(level: Level) {
    let _ = DEFAULT_LOG.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        Some(Log::from_bits(bits).with_level(level).bits())
    });
}

/// Change only the default log's options.
pub fn set_default_options(options: Options) {
    let _ = DEFAULT_LOG.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        Some(Log::from_bits(bits).with_options(options).bits())
    });
}

/// Change only the default log's output.
pub fn set_default_output(output: Output) {
    let _ = DEFAULT_LOG.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        Some(Log::from_bits(bits).with_output(output).bits())
    });
}

/// The last `n` path components of `path` (the whole path when it has
/// fewer separators).
fn trailing_path(path: &str, n: usize) -> &str {
    let bytes = path.as_bytes();
    let mut hits = 0;
    for i in (1..bytes.len()).rev() {
        if bytes[i] == b'/' {
            hits += 1;
            if hits == n {
                return &path[i + 1..];
            }
        }
    }
    path
}

/// Append up to [`BACKTRACE_FRAMES`] frames of the current backtrace,
/// bracketed Go-style: `[frame:frame:...]: `. Short form lists symbols
/// only; long form keeps each frame's source location.
fn append_backtrace<W: io::Write>(w: &mut W, long: bool) {
    let bt = std::backtrace::Backtrace::force_capture().to_string();
    let _ = w.write_all(b"[");
    let mut frames = 0;
    let mut first = true;
    let mut lines = bt.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        // Frame lines look like "12: symbol"; location lines follow as
        // "at file:line".
        let Some((idx, symbol)) = trimmed.split_once(": ") else {
            continue;
        };
        if idx.parse::<u32>().is_err() {
            continue;
        }
        if frames == BACKTRACE_FRAMES {
            break;
        }
        if !first {
            let _ = w.write_all(b":");
        }
        let _ = w.write_all(symbol.as_bytes());
        if long {
            if let Some(next) = lines.peek() {
                if let Some(loc) = next.trim_start().strip_prefix("at ") {
                    let _ = write!(w, "({})", trailing_path(loc, 1));
                }
            }
        }
        first = false;
        frames += 1;
    }
    let _ = w.write_all(b"]: ");
}

/// Log at debug level through the default log. Compiles to nothing when
/// the `debug-logs` feature is off.
#[macro_export]
macro_rules! log_dbg {
    ($($arg:tt)*) => {
        if $crate::log::debug_enabled() {
            $crate::log::default_log().log_with(
                $crate::log::Level::Dbg,
                "DBG: ",
                ::core::option::Option::Some($crate::log::CallSite {
                    file: ::core::file!(),
                    line: ::core::line!(),
                }),
                ::core::format_args!($($arg)*),
            )
        }
    };
}

/// Log at info level through the default log.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_with(
            $crate::log::Level::Info,
            "INFO: ",
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// Log at notice level through the default log.
#[macro_export]
macro_rules! log_notice {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_with(
            $crate::log::Level::Notice,
            "NOTICE: ",
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// Log at warning level through the default log.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_with(
            $crate::log::Level::Warn,
            "WARN: ",
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// Log at error level through the default log.
#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_with(
            $crate::log::Level::Err,
            "ERROR: ",
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// Log at critical level through the default log.
#[macro_export]
macro_rules! log_crit {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_with(
            $crate::log::Level::Crit,
            "CRIT: ",
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// Log at bug level through the default log.
#[macro_export]
macro_rules! log_bug {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_with(
            $crate::log::Level::Bug,
            "BUG: ",
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// Log the message at bug level through the default log, then panic
/// with it.
#[macro_export]
macro_rules! log_panic {
    ($($arg:tt)*) => {
        $crate::log::default_log().log_panic(
            ::core::option::Option::Some($crate::log::CallSite {
                file: ::core::file!(),
                line: ::core::line!(),
            }),
            ::core::format_args!($($arg)*),
        )
    };
}

/// True if the default log would pass messages at `$lev`. Use to skip
/// expensive argument construction.
#[macro_export]
macro_rules! log_enabled {
    ($lev:expr) => {
        $crate::log::default_log().enabled($lev)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_round_trip() {
        let log = Log::new(
            Level::Notice,
            Options::TIMESTAMP | Options::LOC_SHORT,
            Output::Stderr,
        );
        assert_eq!(log.level(), Level::Notice);
        assert_eq!(log.options(), Options::TIMESTAMP | Options::LOC_SHORT);
        assert_eq!(log.output(), Output::Stderr);
    }

    #[test]
    fn test_with_setters_touch_only_their_field() {
        let log = Log::new(Level::Info, Options::TIMESTAMP, Output::Stdout);

        let log = log.with_level(Level::Err);
        assert_eq!(log.level(), Level::Err);
        assert_eq!(log.options(), Options::TIMESTAMP);
        assert_eq!(log.output(), Output::Stdout);

        let log = log.with_output(Output::Disabled);
        assert_eq!(log.level(), Level::Err);
        assert_eq!(log.output(), Output::Disabled);

        let log = log.with_options(Options::NONE);
        assert_eq!(log.options(), Options::NONE);
        assert_eq!(log.level(), Level::Err);
    }

    #[test]
    fn test_level_gate() {
        let log = Log::new(Level::Warn, Options::NONE, Output::Disabled);
        assert!(log.enabled(Level::Bug));
        assert!(log.enabled(Level::Err));
        assert!(log.enabled(Level::Warn));
        assert!(!log.enabled(Level::Notice));
        assert!(!log.enabled(Level::Dbg));
    }

    #[test]
    fn test_render_tag_and_message() {
        let log = Log::new(Level::Dbg, Options::NONE, Output::Disabled);
        let mut out = BytesMut::new();
        log.render("ERROR: ", None, format_args!("boom {}\n", 42), &mut out);
        assert_eq!(&out[..], b"ERROR: boom 42\n");
    }

    #[test]
    fn test_render_location_short_and_long() {
        let log = Log::new(Level::Dbg, Options::LOC_SHORT, Output::Disabled);
        let site = CallSite {
            file: "deep/tree/src/log/mod.rs",
            line: 7,
        };
        let mut out = BytesMut::new();
        log.render("", Some(site), format_args!("x"), &mut out);
        assert_eq!(&out[..], b"log/mod.rs:7: x");

        let log = log.with_options(Options::LOC_LONG);
        let mut out = BytesMut::new();
        log.render("", Some(site), format_args!("x"), &mut out);
        assert_eq!(&out[..], b"deep/tree/src/log/mod.rs:7: x");
    }

    #[test]
    fn test_render_timestamp_prefix() {
        let log = Log::new(Level::Dbg, Options::TIMESTAMP, Output::Disabled);
        let mut out = BytesMut::new();
        log.render("INFO: ", None, format_args!("m"), &mut out);
        let line = std::str::from_utf8(&out).unwrap();
        let (ts, rest) = line.split_once(": ").unwrap();
        let (secs, millis) = ts.split_once('.').unwrap();
        assert!(secs.parse::<u64>().unwrap() > 0);
        assert_eq!(millis.len(), 3);
        assert_eq!(rest, "INFO: m");
    }

    #[test]
    fn test_render_backtrace_brackets() {
        let log = Log::new(Level::Dbg, Options::BACKTRACE_SHORT, Output::Disabled);
        let mut out = BytesMut::new();
        log.render("", None, format_args!("m"), &mut out);
        let line = std::str::from_utf8(&out).unwrap();
        assert!(line.starts_with('['));
        assert!(line.contains("]: m"));
    }

    #[test]
    fn test_mux_copies_message_regardless_of_gate() {
        let log = Log::new(Level::Err, Options::NONE, Output::Disabled);
        let mut captured = Vec::new();
        // Dbg is gated off for the log itself, but the mux writer still
        // receives the bare message.
        log.log_mux(&mut captured, true, Level::Dbg, format_args!("muxed {}\n", 1));
        assert_eq!(&captured[..], b"muxed 1\n");

        let mut captured = Vec::new();
        log.log_mux(&mut captured, false, Level::Err, format_args!("gone"));
        assert!(captured.is_empty());
    }

    #[test]
    fn test_default_log_mutation() {
        let saved = default_log();

        set_default_log(Log::new(Level::Info, Options::NONE, Output::Disabled));
        assert_eq!(default_log().level(), Level::Info);
        assert!(log_enabled!(Level::Warn));
        assert!(!log_enabled!(Level::Dbg));

        set_default_level(Level::Crit);
        assert_eq!(default_log().level(), Level::Crit);
        assert_eq!(default_log().output(), Output::Disabled);

        set_default_options(Options::TIMESTAMP);
        assert_eq!(default_log().options(), Options::TIMESTAMP);
        assert_eq!(default_log().level(), Level::Crit);

        set_default_output(Output::Stderr);
        assert_eq!(default_log().output(), Output::Stderr);

        set_default_log(saved);
    }

    #[test]
    fn test_trailing_path() {
        assert_eq!(trailing_path("a/b/c/d.rs", 1), "d.rs");
        assert_eq!(trailing_path("a/b/c/d.rs", 2), "c/d.rs");
        assert_eq!(trailing_path("d.rs", 2), "d.rs");
        assert_eq!(trailing_path("", 1), "");
    }

    #[test]
    fn test_disabled_output_still_runs_pipeline() {
        let log = Log::new(Level::Dbg, Options::TIMESTAMP, Output::Disabled);
        log.info(format_args!("swallowed\n"));
        log.log(Level::Dbg, format_args!("also swallowed\n"));
    }
}
