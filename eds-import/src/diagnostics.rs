//! Sinks for the notes produced during an import
//!
//! Every note the importer records is also passed to a [`DiagnosticSink`]. The `activity` names
//! the import step that produced the message.
use std::sync::Mutex;

/// Receiver for import diagnostics
pub trait DiagnosticSink {
    /// Something was skipped or could not be imported as described by the file
    fn warn(&self, activity: &str, message: &str);
    /// A value was converted or defaulted
    fn info(&self, activity: &str, message: &str);
}

/// Forwards diagnostics to the `log` crate
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn warn(&self, activity: &str, message: &str) {
        log::warn!("{activity}: {message}");
    }

    fn info(&self, activity: &str, message: &str) {
        log::info!("{activity}: {message}");
    }
}

/// Discards all diagnostics
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn warn(&self, _activity: &str, _message: &str) {}
    fn info(&self, _activity: &str, _message: &str) {}
}

/// Severity of a collected diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Reported through [`DiagnosticSink::warn`]
    Warn,
    /// Reported through [`DiagnosticSink::info`]
    Info,
}

/// A diagnostic stored by [`CollectingSink`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub level: Level,
    /// The import step which produced it
    pub activity: String,
    /// The message text
    pub message: String,
}

/// Stores all diagnostics in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all collected diagnostics, leaving the sink empty
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push(&self, level: Level, activity: &str, message: &str) {
        let diag = Diagnostic {
            level,
            activity: activity.to_string(),
            message: message.to_string(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diag),
            Err(poisoned) => poisoned.into_inner().push(diag),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn warn(&self, activity: &str, message: &str) {
        self.push(Level::Warn, activity, message);
    }

    fn info(&self, activity: &str, message: &str) {
        self.push(Level::Info, activity, message);
    }
}
