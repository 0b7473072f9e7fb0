use std::fs;
use std::path::Path;

use tracing::debug;

/// Rotates before a write would push the current file past `max_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizePolicy {
    max_size: u64,
    written: u64,
    // Bytes of the charset header at the start of the current file
    header: u64,
}

impl SizePolicy {
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            written: 0,
            header: 0,
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Bytes counted for the current file.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn check_file(&self, path: &Path) -> bool {
        file_len(path) >= self.max_size
    }

    /// True if `len` more bytes would overflow a file that already holds entries. An
    /// entry bigger than the limit still goes whole into a fresh file.
    pub(crate) fn check_text(&self, len: usize) -> bool {
        self.written > self.header && self.written.saturating_add(len as u64) > self.max_size
    }

    pub(crate) fn commit(&mut self, len: usize) {
        self.written = self.written.saturating_add(len as u64);
    }

    pub(crate) fn reset(&mut self, path: &Path, header_len: usize) {
        self.written = file_len(path);
        self.header = header_len as u64;
        debug!("Size policy adopted {:?} with {} bytes", path, self.written);
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Parses `1024`, `10KB`, `5 MB` or `1gb` (1024 based units).
pub(crate) fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits.parse().ok()?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" | "k" => 1024,
        "mb" | "m" => 1024 * 1024,
        "gb" | "g" => 1024 * 1024 * 1024,
        _ => return None,
    };

    value.checked_mul(multiplier)
}
