use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{remove_backup, sibling_files, strip_compression, with_suffix};

/// Numbers backups `<file>.0`, `<file>.1`, ... with `.0` the most recent. Compressed
/// backups keep their `.gz` suffix behind the number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountLabeler;

impl CountLabeler {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_backup_path(&self, live: &Path, index: usize) -> PathBuf {
        let mut name = OsString::from(live.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    /// Existing backups with their slot numbers, lowest (newest) first.
    pub(crate) fn indexed_backups(&self, live: &Path) -> io::Result<Vec<(usize, PathBuf)>> {
        let Some(live_name) = live.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{}.", live_name);

        let mut backups: Vec<(usize, PathBuf)> = sibling_files(live)?
            .into_iter()
            .filter_map(|(name, path)| {
                let (index, _) = strip_compression(name.strip_prefix(&prefix)?);
                if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                index.parse::<usize>().ok().map(|index| (index, path))
            })
            .collect();

        backups.sort_by_key(|(index, _)| *index);
        Ok(backups)
    }

    pub(crate) fn backups(&self, live: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .indexed_backups(live)?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    /// Shifts every backup one slot up, dropping slots past `retention`, and moves
    /// the live file into slot 0.
    pub(crate) fn roll(&self, live: &Path, retention: Option<usize>) -> io::Result<Option<PathBuf>> {
        if retention == Some(0) {
            remove_backup(live);
            return Ok(None);
        }

        for (index, path) in self.indexed_backups(live)?.into_iter().rev() {
            // Shifting past slot `keep - 1` would exceed the retention
            if retention.is_some_and(|keep| index >= keep - 1) {
                remove_backup(&path);
                continue;
            }
            let Some(next) = index.checked_add(1) else {
                debug!("Leaving backup {:?} in its last slot", path);
                continue;
            };
            let suffix = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or("", |name| strip_compression(name).1);
            let target = with_suffix(&self.resolve_backup_path(live, next), suffix);
            debug!("Shifting backup {:?} -> {:?}", path, target);
            fs::rename(&path, &target)?;
        }

        if !live.exists() {
            return Ok(None);
        }
        let target = self.resolve_backup_path(live, 0);
        fs::rename(live, &target)?;
        info!("Rotated log file: {:?} -> {:?}", live, target);
        Ok(Some(target))
    }

    pub(crate) fn prune(&self, live: &Path, retention: Option<usize>) -> io::Result<()> {
        let Some(keep) = retention else {
            return Ok(());
        };
        for (index, path) in self.indexed_backups(live)? {
            if index >= keep {
                remove_backup(&path);
            }
        }
        Ok(())
    }
}
