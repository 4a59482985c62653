#![deny(unsafe_code)]
//! Verbosity configuration and an injected logging sink for the rsync
//! transfer engine.
//!
//! Upstream rsync keeps its `INFO_*`/`DEBUG_*` flag tables and a
//! module-wide logger. This crate keeps the flag vocabulary (it is a
//! faithful, useful piece of the verbosity model) but drops the implicit
//! global state: callers build a [`Logger`] from a [`VerbosityConfig`] and
//! a [`Sink`], then hand the `Logger` to whichever component needs it.
//! Nothing here reaches for a `static` or thread-local.

mod flags;
mod sink;

pub use flags::{DebugFlag, InfoFlag, VerbosityConfig};
pub use sink::{CollectingSink, LogEvent, LogLevel, Sink};
#[cfg(feature = "tracing")]
pub use sink::TracingSink;

use std::sync::Arc;

/// A logger bound to one verbosity configuration and one sink.
///
/// Cloning a `Logger` is cheap: the sink is reference-counted and the
/// configuration is a small copy-able struct.
#[derive(Clone)]
pub struct Logger {
    config: VerbosityConfig,
    sink: Arc<dyn Sink>,
}

impl Logger {
    /// Builds a logger from a verbosity configuration and a sink.
    pub fn new(config: VerbosityConfig, sink: Arc<dyn Sink>) -> Self {
        Self { config, sink }
    }

    /// Returns the verbosity configuration this logger was built with.
    pub fn config(&self) -> &VerbosityConfig {
        &self.config
    }

    /// Emits an info-class message if `flag` is enabled at `level`.
    pub fn info(&self, flag: InfoFlag, level: u8, message: impl Into<String>) {
        if self.config.info_enabled(flag, level) {
            self.sink.emit(LogEvent {
                level: LogLevel::Info,
                flag_name: flag.name(),
                verbosity: level,
                message: message.into(),
            });
        }
    }

    /// Emits a debug-class message if `flag` is enabled at `level`.
    pub fn debug(&self, flag: DebugFlag, level: u8, message: impl Into<String>) {
        if self.config.debug_enabled(flag, level) {
            self.sink.emit(LogEvent {
                level: LogLevel::Debug,
                flag_name: flag.name(),
                verbosity: level,
                message: message.into(),
            });
        }
    }

    /// Emits an unconditional warning (surfaced to the user regardless of
    /// verbosity, matching upstream rsync's non-fatal warnings).
    pub fn warning(&self, message: impl Into<String>) {
        self.sink.emit(LogEvent {
            level: LogLevel::Warning,
            flag_name: "warning",
            verbosity: 0,
            message: message.into(),
        });
    }

    /// Emits an unconditional error (non-fatal, per-file).
    pub fn error(&self, message: impl Into<String>) {
        self.sink.emit(LogEvent {
            level: LogLevel::Error,
            flag_name: "error",
            verbosity: 0,
            message: message.into(),
        });
    }
}
