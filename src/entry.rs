//! Log entry snapshot handed over by the logging facade.

use std::collections::HashMap;
use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Fields of a [`LogEntry`] a writer can ask the facade to fill in.
///
/// Computing some values (location info in particular) is expensive, so the facade
/// only populates what at least one active writer declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogEntryValue {
    Timestamp,
    Thread,
    Context,
    Class,
    Method,
    File,
    Line,
    Level,
    Message,
    Exception,
    RenderedText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub name: Option<String>,
    pub id: u64,
}

/// Exception with its cause chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throwable {
    pub class_name: String,
    pub message: Option<String>,
    pub cause: Option<Box<Throwable>>,
}

impl Throwable {
    pub fn new(class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterates this throwable followed by its causes.
    pub fn chain(&self) -> impl Iterator<Item = &Throwable> {
        std::iter::successors(Some(self), |t| t.cause.as_deref())
    }
}

/// Immutable snapshot of a single logging call.
///
/// Every field is optional: the facade fills in only the values required by the
/// active writers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub thread: Option<ThreadInfo>,
    pub level: Option<Level>,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
    pub message: Option<String>,
    pub exception: Option<Throwable>,
    pub context: HashMap<String, String>,
    pub rendered_text: Option<String>,
}

impl LogEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry carrying nothing but its final rendered text.
    pub fn rendered(text: impl Into<String>) -> Self {
        Self {
            rendered_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_thread(mut self, thread: ThreadInfo) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_location(
        mut self,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file_name: impl Into<String>,
        line_number: u32,
    ) -> Self {
        self.class_name = Some(class_name.into());
        self.method_name = Some(method_name.into());
        self.file_name = Some(file_name.into());
        self.line_number = Some(line_number);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_exception(mut self, exception: Throwable) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_rendered_text(mut self, text: impl Into<String>) -> Self {
        self.rendered_text = Some(text.into());
        self
    }
}
