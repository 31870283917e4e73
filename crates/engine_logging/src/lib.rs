#![deny(missing_docs)]
//! Shared logging utilities for the scout workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the per-thread poll tick that the progress reporter stamps into its log
//! lines, and a minimal test initializer for the global logger.

use std::cell::Cell;
use std::fmt;

thread_local! {
    /// Thread-local storage for the current reporter poll tick.
    static POLL_TICK: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Sets the poll tick for the current thread.
/// The progress reporter calls this once per polling iteration.
pub fn set_poll_tick(tick: u64) {
    POLL_TICK.with(|v| v.set(Some(tick)));
}

/// Retrieves the poll tick for the current thread.
/// Returns 0 on threads that never poll (e.g. runtime workers).
pub fn get_poll_tick() -> u64 {
    POLL_TICK.with(|v| v.get()).unwrap_or(0)
}

/// Stops stamping the current thread's log lines.
pub fn clear_poll_tick() {
    POLL_TICK.with(|v| v.set(None));
}

/// Displays as `[tick N] ` while the current thread is polling, otherwise as nothing.
pub struct PollTickStamp;

impl fmt::Display for PollTickStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match POLL_TICK.with(|v| v.get()) {
            Some(tick) => write!(f, "[tick {tick}] "),
            None => Ok(()),
        }
    }
}

/// Log target shared by every `engine_*` macro.
pub const LOG_TARGET: &str = "scout";

/// Logs a trace-level message under the workspace log target.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::LOG_TARGET, "{}{}", $crate::PollTickStamp, format_args!($($arg)*));
    }};
}

/// Logs an info-level message under the workspace log target.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!(target: $crate::LOG_TARGET, "{}{}", $crate::PollTickStamp, format_args!($($arg)*));
    }};
}

/// Logs a debug-level message under the workspace log target.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::LOG_TARGET, "{}{}", $crate::PollTickStamp, format_args!($($arg)*));
    }};
}

/// Logs a warn-level message under the workspace log target.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::LOG_TARGET, "{}{}", $crate::PollTickStamp, format_args!($($arg)*));
    }};
}

/// Logs an error-level message under the workspace log target.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!(target: $crate::LOG_TARGET, "{}{}", $crate::PollTickStamp, format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may have installed the logger first.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
