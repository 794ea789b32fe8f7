//! A simple logging utility for emitting messages based on severity levels.
//!
//! Standard output is reserved for packet summaries, so every level is written
//! to `stderr`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time;

/// Source of the log message.
const SOURCE: &str = "ipsniff";

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Logs a message at the [Level::Error] level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {{
        $crate::log::log($crate::log::Level::Error, format_args!($($arg)+));
    }};
}

/// Logs a message at the [Level::Warn] level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {{
        $crate::log::log($crate::log::Level::Warn, format_args!($($arg)+));
    }};
}

/// Logs a message at the [Level::Info] level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {{
        $crate::log::log($crate::log::Level::Info, format_args!($($arg)+));
    }};
}

/// Logs a message at the [Level::Debug] level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {{
        if $crate::log::enabled($crate::log::Level::Debug) {
            $crate::log::log($crate::log::Level::Debug, format_args!($($arg)+));
        }
    }};
}

/// Severity levels for log messages, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Designates very serious errors.
    Error = 0,
    /// Designates hazardous situations.
    Warn = 1,
    /// Designates useful information.
    Info = 2,
    /// Designates lower priority information.
    Debug = 3,
}

impl Level {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            _ => Level::Debug,
        }
    }
}

/// Sets the most verbose [Level] that will be emitted.
pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the most verbose [Level] that will be emitted.
pub fn max_level() -> Level {
    Level::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Returns `true` if messages at `level` pass the current filter.
pub fn enabled(level: Level) -> bool {
    level <= max_level()
}

/// Logs a message with the specified severity level.
///
/// Messages more verbose than [max_level] are discarded. The log message will
/// include a timestamp, severity level, and the source of the log (`ipsniff`).
pub fn log(level: Level, msg: impl std::fmt::Display) {
    if !enabled(level) {
        return;
    }

    let timestamp = timestamp();

    let tag = match level {
        Level::Error => "\x1b[1;31mERROR\x1b[0m",
        Level::Warn => "\x1b[1;33mWARN \x1b[0m",
        Level::Info => "\x1b[1;32mINFO \x1b[0m",
        Level::Debug => "\x1b[1;34mDEBUG\x1b[0m",
    };

    eprintln!("[\x1b[1;37m{timestamp}\x1b[0m] {tag} [\x1b[1;37m{SOURCE}\x1b[0m] {msg}");
}

fn timestamp() -> String {
    let now = time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let time = now as libc::time_t;
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };

    // SAFETY: both pointers are valid for the duration of the call, and the
    // reentrant variant writes only into `tm`.
    if unsafe { libc::localtime_r(&time, &mut tm) }.is_null() {
        return "UNKNOWN".to_string();
    }

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        tm.tm_year + 1900,
        tm.tm_mon + 1,
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec
    )
}
