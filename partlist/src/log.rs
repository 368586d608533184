// SPDX-License-Identifier: MIT

use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Quiet = 0,
    Normal = 1,
    Verbose = 2,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        2 => LogLevel::Verbose,
        _ => LogLevel::Normal,
    }
}

/// Prints `args` when the current level is at least `min`.
/// Warnings pass `None` and are printed at every level.
#[doc(hidden)]
#[cfg(feature = "std")]
pub fn emit(min: Option<LogLevel>, args: core::fmt::Arguments<'_>) {
    match min {
        None => eprintln!("[partlist] warning: {args}"),
        Some(min) if log_level() >= min => eprintln!("[partlist] {args}"),
        Some(_) => {}
    }
}

#[doc(hidden)]
#[cfg(not(feature = "std"))]
pub fn emit(_min: Option<LogLevel>, _args: core::fmt::Arguments<'_>) {}

macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log::emit(Some($crate::log::LogLevel::Normal), format_args!($($arg)*))
    };
}

macro_rules! log_verbose {
    ($($arg:tt)*) => {
        $crate::log::emit(Some($crate::log::LogLevel::Verbose), format_args!($($arg)*))
    };
}

macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log::emit(None, format_args!($($arg)*))
    };
}
