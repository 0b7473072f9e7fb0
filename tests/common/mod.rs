#![allow(dead_code)]

pub mod test_placeholder;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use logroll::{Labeler, Level, LogEntry};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn entry(level: Level, message: &str) -> LogEntry {
    LogEntry::new().with_level(level).with_message(message)
}

pub fn properties(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Backups oldest first, followed by the live file.
pub fn files_in_write_order(labeler: &Labeler, base: &Path) -> Vec<PathBuf> {
    let mut files = labeler.backups(base).unwrap();
    files.reverse();
    files.push(labeler.live_path(base));
    files
}

pub fn read_lines(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter(|path| path.exists())
        .flat_map(|path| {
            fs::read_to_string(path)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
