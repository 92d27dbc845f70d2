//! Loggers threaded through the bundled middleware.
//!
//! There is no process-wide logger: each middleware receives one through its
//! constructor, [`NoopLogger`] when the caller does not care.

use std::fmt;

use tracing::{debug, info};

/// Sink for structured log entries.
pub trait Logger: Send + Sync + 'static {
    /// Record one entry.
    fn log(&self, entry: &LogEntry);
}

impl<L: Logger + ?Sized> Logger for std::sync::Arc<L> {
    fn log(&self, entry: &LogEntry) {
        (**self).log(entry);
    }
}

/// A message with named fields, in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    message: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    /// New entry without fields.
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self {
            message,
            fields: Vec::new(),
        }
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    /// The message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// Value of the last field named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    /// All fields, in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _entry: &LogEntry) {}
}

/// Log level for [`TracingLogger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Emit at debug level.
    Debug,
    /// Emit at info level.
    #[default]
    Info,
}

/// Logger forwarding entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    level: LogLevel,
}

impl TracingLogger {
    /// Logger emitting at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger emitting at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Logger emitting at `level`.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Logger for TracingLogger {
    fn log(&self, entry: &LogEntry) {
        let fields = Fields(entry.fields());
        match self.level {
            LogLevel::Debug => debug!(fields = %fields, "{}", entry.message()),
            LogLevel::Info => info!(fields = %fields, "{}", entry.message()),
        }
    }
}

struct Fields<'a>(&'a [(&'static str, String)]);

impl fmt::Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
