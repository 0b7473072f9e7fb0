use std::io;
use std::path::{Path, PathBuf};

use super::{split_extension, CountLabeler};

/// Gives every process its own live file, `app.<pid>.log`, with numbered backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdLabeler {
    pid: u32,
    count: CountLabeler,
}

impl ProcessIdLabeler {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            count: CountLabeler::new(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn live_path(&self, base: &Path) -> PathBuf {
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, extension) = split_extension(&name);
        base.with_file_name(format!("{}.{}{}", stem, self.pid, extension))
    }

    pub fn resolve_backup_path(&self, base: &Path, index: usize) -> PathBuf {
        self.count.resolve_backup_path(&self.live_path(base), index)
    }

    pub(crate) fn backups(&self, base: &Path) -> io::Result<Vec<PathBuf>> {
        self.count.backups(&self.live_path(base))
    }

    pub(crate) fn roll(&self, base: &Path, retention: Option<usize>) -> io::Result<Option<PathBuf>> {
        self.count.roll(&self.live_path(base), retention)
    }

    pub(crate) fn prune(&self, base: &Path, retention: Option<usize>) -> io::Result<()> {
        self.count.prune(&self.live_path(base), retention)
    }
}
