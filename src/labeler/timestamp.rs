use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::info;

use super::{remove_backup, sibling_files, split_extension, strip_compression};

/// Default backup stamp, sortable and free of path separators.
pub const DEFAULT_TIMESTAMP_PATTERN: &str = "%Y-%m-%d_%H-%M-%S";

/// Labels backups with the local time they were rotated, as in
/// `app.2024-05-10_12-00-00.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampLabeler {
    pattern: String,
}

impl Default for TimestampLabeler {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TIMESTAMP_PATTERN.to_string(),
        }
    }
}

impl TimestampLabeler {
    /// Returns `None` if `pattern` is not a valid strftime pattern or could produce
    /// a path separator.
    pub fn new(pattern: impl Into<String>) -> Option<Self> {
        let pattern = pattern.into();
        let invalid = pattern.is_empty()
            || pattern.contains(['/', '\\'])
            || StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error));
        if invalid {
            None
        } else {
            Some(Self { pattern })
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Backup path for a rotation at `at`. The stamp goes before the extension, and
    /// a `-<n>` suffix, above any already taken, keeps rotations within the same
    /// second apart. Fails if the directory cannot be listed.
    pub fn resolve_backup_path(&self, live: &Path, at: DateTime<Local>) -> io::Result<PathBuf> {
        let name = live
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, extension) = split_extension(&name);
        let stamp = at.format(&self.pattern).to_string();
        let prefix = format!("{}.", stem);

        let taken = sibling_files(live)?
            .into_iter()
            .filter_map(|(name, _)| {
                let (name, _) = strip_compression(&name);
                let label = name.strip_prefix(&prefix)?.strip_suffix(extension)?;
                if label == stamp {
                    return Some(0);
                }
                label.strip_prefix(&stamp)?.strip_prefix('-')?.parse::<u32>().ok()
            })
            .max();

        Ok(match taken {
            None => live.with_file_name(format!("{}.{}{}", stem, stamp, extension)),
            Some(n) => live.with_file_name(format!(
                "{}.{}-{}{}",
                stem,
                stamp,
                n.saturating_add(1),
                extension
            )),
        })
    }

    /// Backups ordered by their stamps, newest first.
    pub(crate) fn backups(&self, live: &Path) -> io::Result<Vec<PathBuf>> {
        let Some(live_name) = live.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let (stem, extension) = split_extension(live_name);
        let prefix = format!("{}.", stem);

        let mut stamped: Vec<((NaiveDateTime, u32), PathBuf)> = sibling_files(live)?
            .into_iter()
            .filter_map(|(name, path)| {
                let (name, _) = strip_compression(&name);
                let label = name.strip_prefix(&prefix)?.strip_suffix(extension)?;
                self.parse_label(label).map(|key| (key, path))
            })
            .collect();

        stamped.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(stamped.into_iter().map(|(_, path)| path).collect())
    }

    pub(crate) fn roll(&self, live: &Path, retention: Option<usize>) -> io::Result<Option<PathBuf>> {
        self.roll_at(live, retention, Local::now())
    }

    pub(crate) fn roll_at(
        &self,
        live: &Path,
        retention: Option<usize>,
        at: DateTime<Local>,
    ) -> io::Result<Option<PathBuf>> {
        if retention == Some(0) {
            remove_backup(live);
            return Ok(None);
        }

        let mut newest = None;
        if live.exists() {
            let target = self.resolve_backup_path(live, at)?;
            fs::rename(live, &target)?;
            info!("Rotated log file: {:?} -> {:?}", live, target);
            newest = Some(target);
        }
        self.prune(live, retention)?;
        Ok(newest)
    }

    pub(crate) fn prune(&self, live: &Path, retention: Option<usize>) -> io::Result<()> {
        let Some(keep) = retention else {
            return Ok(());
        };
        for path in self.backups(live)?.iter().skip(keep) {
            remove_backup(path);
        }
        Ok(())
    }

    /// Parses `<stamp>` or `<stamp>-<n>` into a sort key.
    fn parse_label(&self, label: &str) -> Option<(NaiveDateTime, u32)> {
        if let Some(time) = self.parse_stamp(label) {
            return Some((time, 0));
        }
        let (stamp, n) = label.rsplit_once('-')?;
        let n = n.parse::<u32>().ok()?;
        self.parse_stamp(stamp).map(|time| (time, n))
    }

    fn parse_stamp(&self, stamp: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(stamp, &self.pattern)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(stamp, &self.pattern)
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 10, hour, minute, second)
            .earliest()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_patterns() {
        assert!(TimestampLabeler::new("%Y-%m-%d").is_some());
        assert!(TimestampLabeler::new("%Y/%m").is_none());
        assert!(TimestampLabeler::new("%Q").is_none());
        assert!(TimestampLabeler::new("").is_none());
    }

    #[test]
    fn test_stamp_goes_before_extension() {
        let temp_dir = TempDir::new().unwrap();
        let labeler = TimestampLabeler::default();

        let live = temp_dir.path().join("app.log");
        assert_eq!(
            labeler.resolve_backup_path(&live, at(12, 0, 0)).unwrap(),
            temp_dir.path().join("app.2024-05-10_12-00-00.log")
        );

        let live = temp_dir.path().join("app.tar.gz");
        assert_eq!(
            labeler.resolve_backup_path(&live, at(12, 0, 0)).unwrap(),
            temp_dir.path().join("app.2024-05-10_12-00-00.tar.gz")
        );

        let live = temp_dir.path().join(".hidden");
        assert_eq!(
            labeler.resolve_backup_path(&live, at(12, 0, 0)).unwrap(),
            temp_dir.path().join(".hidden.2024-05-10_12-00-00")
        );
    }

    #[test]
    fn test_same_second_rotations_get_disambiguated() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("app.log");
        let labeler = TimestampLabeler::default();

        for content in ["one", "two", "three"] {
            fs::write(&live, content).unwrap();
            labeler.roll_at(&live, None, at(12, 0, 0)).unwrap();
        }

        assert!(temp_dir.path().join("app.2024-05-10_12-00-00.log").exists());
        assert!(temp_dir.path().join("app.2024-05-10_12-00-00-1.log").exists());
        assert!(temp_dir.path().join("app.2024-05-10_12-00-00-2.log").exists());

        let backups = labeler.backups(&live).unwrap();
        let newest: Vec<String> = backups
            .iter()
            .map(|path| fs::read_to_string(path).unwrap())
            .collect();
        assert_eq!(newest, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_disambiguator_continues_after_pruning() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("app.log");
        let labeler = TimestampLabeler::default();

        for content in ["one", "two", "three"] {
            fs::write(&live, content).unwrap();
            labeler.roll_at(&live, Some(2), at(12, 0, 0)).unwrap();
        }

        let backups = labeler.backups(&live).unwrap();
        assert_eq!(
            backups,
            vec![
                temp_dir.path().join("app.2024-05-10_12-00-00-2.log"),
                temp_dir.path().join("app.2024-05-10_12-00-00-1.log"),
            ]
        );
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "three");
    }

    #[test]
    fn test_compressed_backups_count_for_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("app.log");
        let labeler = TimestampLabeler::default();
        fs::write(temp_dir.path().join("app.2024-05-10_12-00-00.log.gz"), "").unwrap();

        fs::write(&live, "next").unwrap();
        let newest = labeler.roll_at(&live, None, at(12, 0, 0)).unwrap();
        assert_eq!(
            newest,
            Some(temp_dir.path().join("app.2024-05-10_12-00-00-1.log"))
        );
        assert_eq!(labeler.backups(&live).unwrap().len(), 2);
    }

    #[test]
    fn test_unlistable_directory_fails_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let occupied = temp_dir.path().join("occupied");
        fs::write(&occupied, "").unwrap();

        let live = occupied.join("app.log");
        assert!(
            TimestampLabeler::default()
                .resolve_backup_path(&live, at(12, 0, 0))
                .is_err()
        );
    }

    #[test]
    fn test_backups_sorted_by_time_and_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("app.log");
        let labeler = TimestampLabeler::default();

        for (hour, content) in [(9, "nine"), (11, "eleven"), (10, "ten")] {
            fs::write(&live, content).unwrap();
            labeler.roll_at(&live, None, at(hour, 0, 0)).unwrap();
        }
        fs::write(temp_dir.path().join("app.not-a-date.log"), "").unwrap();

        let backups = labeler.backups(&live).unwrap();
        assert_eq!(backups.len(), 3);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "eleven");
        assert_eq!(fs::read_to_string(&backups[2]).unwrap(), "nine");

        labeler.prune(&live, Some(1)).unwrap();
        let backups = labeler.backups(&live).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "eleven");
    }

    #[test]
    fn test_date_only_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("app.log");
        let labeler = TimestampLabeler::new("%Y-%m-%d").unwrap();

        fs::write(&live, "a").unwrap();
        labeler.roll_at(&live, None, at(8, 0, 0)).unwrap();
        fs::write(&live, "b").unwrap();
        labeler.roll_at(&live, None, at(9, 0, 0)).unwrap();

        let backups = labeler.backups(&live).unwrap();
        assert_eq!(
            backups,
            vec![
                temp_dir.path().join("app.2024-05-10-1.log"),
                temp_dir.path().join("app.2024-05-10.log"),
            ]
        );
    }
}
