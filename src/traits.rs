use std::collections::HashSet;
use std::io;

use crate::entry::{LogEntry, LogEntryValue};

/// Output target consumed by the logging facade.
///
/// Implementations serialize `log`, `flush` and `close` internally, so a writer can
/// be shared between threads behind an `Arc`.
pub trait Writer: Send + Sync {
    /// Entry values this writer reads; all other fields may be left unset.
    fn required_log_entry_values(&self) -> HashSet<LogEntryValue>;

    fn log(&self, entry: &LogEntry) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;

    /// Flushes and releases the underlying file. Further `log` calls fail.
    fn close(&self) -> io::Result<()>;
}

/// Turns a log entry into text. Provided by the format pattern collaborator.
pub trait Placeholder: Send + Sync {
    fn required_log_entry_values(&self) -> HashSet<LogEntryValue>;

    /// Appends the rendered form of `entry` to `out`.
    fn render(&self, out: &mut String, entry: &LogEntry);
}

/// Copies the already rendered text of an entry verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderedText;

impl Placeholder for RenderedText {
    fn required_log_entry_values(&self) -> HashSet<LogEntryValue> {
        HashSet::from([LogEntryValue::RenderedText])
    }

    fn render(&self, out: &mut String, entry: &LogEntry) {
        if let Some(text) = &entry.rendered_text {
            out.push_str(text);
        }
    }
}

/// Process level lookups used while resolving configured paths.
pub trait Environment: Send + Sync {
    /// Value of a named variable or system property.
    fn lookup(&self, name: &str) -> Option<String>;

    fn process_id(&self) -> u32;
}
