//! Naming of the live log file and its backups.
//!
//! Backups live next to the live file. Directory scans only pick up regular files
//! whose names the labeler itself could have produced, optionally compressed, so
//! unrelated files and links are never touched.

mod count;
mod pid;
mod timestamp;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

pub use count::CountLabeler;
pub use pid::ProcessIdLabeler;
pub use timestamp::{TimestampLabeler, DEFAULT_TIMESTAMP_PATTERN};

use crate::convert::GZIP_SUFFIX;
use crate::error::ConfigError;
use crate::traits::Environment;

const LABEL_KEY: &str = "label";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Labeler {
    Count(CountLabeler),
    Timestamp(TimestampLabeler),
    ProcessId(ProcessIdLabeler),
}

impl Default for Labeler {
    fn default() -> Self {
        Labeler::Count(CountLabeler::new())
    }
}

impl Labeler {
    /// Path of the file currently written for the configured `base` path.
    pub fn live_path(&self, base: &Path) -> PathBuf {
        match self {
            Labeler::ProcessId(labeler) => labeler.live_path(base),
            Labeler::Count(_) | Labeler::Timestamp(_) => base.to_path_buf(),
        }
    }

    /// Existing backups, newest first.
    pub fn backups(&self, base: &Path) -> io::Result<Vec<PathBuf>> {
        match self {
            Labeler::Count(labeler) => labeler.backups(base),
            Labeler::Timestamp(labeler) => labeler.backups(base),
            Labeler::ProcessId(labeler) => labeler.backups(base),
        }
    }

    /// Position of the oldest retained backup, or `None` when there are no backups.
    pub fn discover_current_index(&self, base: &Path) -> io::Result<Option<usize>> {
        Ok(self.backups(base)?.len().checked_sub(1))
    }

    /// Turns the live file into the newest backup, keeping at most `retention`
    /// backups, and returns that backup. With a retention of zero the live file is
    /// deleted instead.
    pub fn roll(&self, base: &Path, retention: Option<usize>) -> io::Result<Option<PathBuf>> {
        match self {
            Labeler::Count(labeler) => labeler.roll(base, retention),
            Labeler::Timestamp(labeler) => labeler.roll(base, retention),
            Labeler::ProcessId(labeler) => labeler.roll(base, retention),
        }
    }

    /// Deletes backups beyond the `retention` newest ones.
    pub fn prune(&self, base: &Path, retention: Option<usize>) -> io::Result<()> {
        match self {
            Labeler::Count(labeler) => labeler.prune(base, retention),
            Labeler::Timestamp(labeler) => labeler.prune(base, retention),
            Labeler::ProcessId(labeler) => labeler.prune(base, retention),
        }
    }

    /// Parses `count`, `timestamp[:<strftime pattern>]` or `pid`.
    pub fn parse(text: &str, env: &dyn Environment) -> Result<Self, ConfigError> {
        let text = text.trim();
        let (name, argument) = match text.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (text, None),
        };

        match (name.to_ascii_lowercase().as_str(), argument) {
            ("count", None) => Ok(Labeler::Count(CountLabeler::new())),
            ("timestamp", None) => Ok(Labeler::Timestamp(TimestampLabeler::default())),
            ("timestamp", Some(pattern)) => TimestampLabeler::new(pattern)
                .map(Labeler::Timestamp)
                .ok_or_else(|| {
                    ConfigError::invalid(LABEL_KEY, text, "invalid timestamp pattern")
                }),
            ("pid", None) => Ok(Labeler::ProcessId(ProcessIdLabeler::new(env.process_id()))),
            _ => Err(ConfigError::invalid(LABEL_KEY, text, "unknown labeler")),
        }
    }
}

/// Splits a file name at the first dot after its first character, so `app.tar.gz`
/// yields `("app", ".tar.gz")` and `.hidden` has no extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.char_indices().skip(1).find(|(_, c)| *c == '.') {
        Some((index, _)) => name.split_at(index),
        None => (name, ""),
    }
}

/// Splits a trailing `.gz` off a backup name.
pub(crate) fn strip_compression(name: &str) -> (&str, &'static str) {
    match name.strip_suffix(GZIP_SUFFIX) {
        Some(plain) => (plain, GZIP_SUFFIX),
        None => (name, ""),
    }
}

/// `path` with `suffix` appended to its file name.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Regular files in the directory of `live`, by name. Symbolic links are skipped. A
/// missing directory has no files.
pub(crate) fn sibling_files(live: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let dir = match live.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        if entry.file_type().is_ok_and(|t| t.is_symlink()) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
    Ok(files)
}

/// Deletes a file that is no longer retained. Failures are only reported.
pub(crate) fn remove_backup(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete log file {:?}: {}", path, e),
    }
}
