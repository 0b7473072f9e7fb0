//! Advisory file locks shared between cooperating processes.
//!
//! Locks are released by guards on every exit path, including unwinding.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Blocks until `file` is locked in `mode`.
///
/// Returns an error of kind [`io::ErrorKind::Unsupported`] when the operating
/// system or filesystem offers no advisory locks.
pub fn lock(file: &File, mode: LockMode) -> io::Result<LockGuard<'_>> {
    sys::lock(file, mode, true)?;
    Ok(LockGuard { file })
}

/// Like [`lock`] but returns `Ok(None)` instead of waiting when another holder
/// conflicts.
pub fn try_lock(file: &File, mode: LockMode) -> io::Result<Option<LockGuard<'_>>> {
    if sys::lock(file, mode, false)? {
        Ok(Some(LockGuard { file }))
    } else {
        Ok(None)
    }
}

/// Releases its lock when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    file: &'a File,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = sys::unlock(self.file) {
            debug!("Failed to release file lock: {}", e);
        }
    }
}

/// A lock held on a dedicated lock file for as long as this value lives.
pub struct HeldLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl HeldLock {
    /// Opens (or creates) `path` and blocks until it is locked in `mode`.
    pub fn acquire(path: &Path, mode: LockMode) -> io::Result<Self> {
        let file = open_lock_file(path)?;
        sys::lock(&file, mode, true)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if let Err(e) = sys::unlock(&self.file) {
            debug!("Failed to release lock on {:?}: {}", self.path, e);
        }
    }
}

pub(crate) fn open_lock_file(path: &Path) -> io::Result<File> {
    std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
}

/// File whose every write holds an exclusive lock for the duration of the append.
///
/// The file must be opened in append mode so each locked write lands at the
/// current end of file, whatever other processes appended meanwhile. Where the
/// platform has no advisory locks, writes proceed unlocked after a one-time warning.
pub struct LockedFile {
    file: File,
    locking: bool,
}

impl LockedFile {
    pub fn new(file: File) -> Self {
        Self {
            file,
            locking: true,
        }
    }

    pub fn get_ref(&self) -> &File {
        &self.file
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let guard = lock_for_write(&self.file, &mut self.locking)?;
        (&self.file).write_all(buf)?;
        drop(guard);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        (&self.file).flush()
    }
}

fn lock_for_write<'a>(file: &'a File, locking: &mut bool) -> io::Result<Option<LockGuard<'a>>> {
    if !*locking {
        return Ok(None);
    }
    match sys::lock(file, LockMode::Exclusive, true) {
        Ok(_) => Ok(Some(LockGuard { file })),
        Err(e) if e.kind() == io::ErrorKind::Unsupported => {
            warn_locks_unsupported(&e);
            *locking = false;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

static UNSUPPORTED_WARNING: Once = Once::new();

/// Reports missing advisory lock support once per process.
pub(crate) fn warn_locks_unsupported(err: &io::Error) {
    UNSUPPORTED_WARNING.call_once(|| {
        warn!(
            "File locks are not supported ({}), shared log files are appended without coordination",
            err
        );
    });
}

mod sys {
    use std::fs::{File, TryLockError};
    use std::io;

    use super::LockMode;

    /// Returns `Ok(false)` if a non-blocking request would have to wait.
    pub(super) fn lock(file: &File, mode: LockMode, blocking: bool) -> io::Result<bool> {
        loop {
            let result = match (mode, blocking) {
                (LockMode::Shared, true) => file.lock_shared().map_err(TryLockError::Error),
                (LockMode::Exclusive, true) => file.lock().map_err(TryLockError::Error),
                (LockMode::Shared, false) => file.try_lock_shared(),
                (LockMode::Exclusive, false) => file.try_lock(),
            };
            return match result {
                Ok(()) => Ok(true),
                Err(TryLockError::WouldBlock) => Ok(false),
                Err(TryLockError::Error(err)) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(TryLockError::Error(err)) => Err(classify(err)),
            };
        }
    }

    pub(super) fn unlock(file: &File) -> io::Result<()> {
        file.unlock()
    }

    /// Reports filesystems without advisory locks as [`io::ErrorKind::Unsupported`].
    pub(super) fn classify(err: io::Error) -> io::Error {
        if err.kind() != io::ErrorKind::Unsupported && lacks_lock_support(&err) {
            io::Error::new(io::ErrorKind::Unsupported, err)
        } else {
            err
        }
    }

    #[cfg(unix)]
    fn lacks_lock_support(err: &io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::ENOLCK || code == libc::EOPNOTSUPP)
    }

    #[cfg(not(unix))]
    fn lacks_lock_support(_err: &io::Error) -> bool {
        false
    }
}
