use std::collections::HashSet;

use logroll::{LogEntry, LogEntryValue, Placeholder};

/// Renders `LEVEL message` lines, the way a format pattern collaborator would.
pub struct LevelMessage;

impl Placeholder for LevelMessage {
    fn required_log_entry_values(&self) -> HashSet<LogEntryValue> {
        HashSet::from([LogEntryValue::Level, LogEntryValue::Message])
    }

    fn render(&self, out: &mut String, entry: &LogEntry) {
        if let Some(level) = entry.level {
            out.push_str(&level.to_string());
            out.push(' ');
        }
        if let Some(message) = &entry.message {
            out.push_str(message);
        }
        out.push('\n');
    }
}
