use std::fs;
use std::path::Path;

/// Starts every process run with a fresh file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupPolicy {
    checked: bool,
}

impl StartupPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers once, and only if the previous run left a non-empty file.
    pub(crate) fn check_file(&mut self, path: &Path) -> bool {
        if self.checked {
            return false;
        }
        self.checked = true;
        fs::metadata(path).is_ok_and(|m| m.len() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_triggers_once_for_non_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, "previous run\n").unwrap();

        let mut policy = StartupPolicy::new();
        assert!(policy.check_file(&path));
        assert!(!policy.check_file(&path));
    }

    #[test]
    fn test_ignores_missing_and_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        assert!(!StartupPolicy::new().check_file(&path));

        fs::write(&path, "").unwrap();
        assert!(!StartupPolicy::new().check_file(&path));
    }
}
