//! The [`Sink`] trait that receives log events from a [`crate::Logger`].

use std::sync::Mutex;

/// Severity/class of a [`LogEvent`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LogLevel {
    /// Routine informational message (`INFO_*` flags).
    Info,
    /// Developer-facing diagnostic (`DEBUG_*` flags).
    Debug,
    /// Non-fatal warning, always surfaced regardless of verbosity.
    Warning,
    /// Non-fatal per-file error, always surfaced regardless of verbosity.
    Error,
}

/// A single emitted log record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    /// Severity/class of the event.
    pub level: LogLevel,
    /// Name of the `INFO_*`/`DEBUG_*` flag that produced it, or a fixed
    /// tag (`"warning"`/`"error"`) for unconditional events.
    pub flag_name: &'static str,
    /// The `-v` level the message was logged at (0 for unconditional
    /// warnings/errors).
    pub verbosity: u8,
    /// Rendered message text.
    pub message: String,
}

/// Destination for log events produced by a [`crate::Logger`].
///
/// Implementations are expected to be cheap to call and safe to invoke
/// from any thread: the transfer engine shares one sink across the
/// sender, generator and receiver.
pub trait Sink: Send + Sync {
    /// Records a single event.
    fn emit(&self, event: LogEvent);
}

/// A [`Sink`] that collects events in memory, for tests and for
/// embedding rrsync inside another program that wants to inspect output
/// before deciding how to present it.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl Sink for CollectingSink {
    fn emit(&self, event: LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}

impl CollectingSink {
    /// Removes and returns all events collected so far, in emission order.
    pub fn drain(&self) -> Vec<LogEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }
}

/// A [`Sink`] that forwards events to the `tracing` ecosystem.
///
/// `INFO_*` events become `tracing::info!`, `DEBUG_*` events become
/// `tracing::debug!`, and unconditional warnings/errors map onto the
/// matching `tracing` macros. The flag name is attached as a field so a
/// subscriber can filter or group by it.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl Sink for TracingSink {
    fn emit(&self, event: LogEvent) {
        match event.level {
            LogLevel::Info => {
                tracing::info!(flag = event.flag_name, verbosity = event.verbosity, "{}", event.message);
            }
            LogLevel::Debug => {
                tracing::debug!(flag = event.flag_name, verbosity = event.verbosity, "{}", event.message);
            }
            LogLevel::Warning => {
                tracing::warn!(flag = event.flag_name, "{}", event.message);
            }
            LogLevel::Error => {
                tracing::error!(flag = event.flag_name, "{}", event.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order_and_drains_once() {
        let sink = CollectingSink::default();
        sink.emit(LogEvent {
            level: LogLevel::Info,
            flag_name: "name",
            verbosity: 1,
            message: "first".into(),
        });
        sink.emit(LogEvent {
            level: LogLevel::Warning,
            flag_name: "warning",
            verbosity: 0,
            message: "second".into(),
        });

        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "first");
        assert_eq!(events[1].message, "second");
        assert!(sink.drain().is_empty());
    }
}
