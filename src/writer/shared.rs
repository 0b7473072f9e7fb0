use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{FileOptions, create_parent_dirs, new_sink, render};
use crate::charset::Charset;
use crate::entry::{LogEntry, LogEntryValue};
use crate::environment::expand_variables;
use crate::error::Result;
use crate::lock::{self, HeldLock, LockMode, LockedFile, open_lock_file, warn_locks_unsupported};
use crate::sink::ByteBufferedSink;
use crate::traits::{Environment, Placeholder, Writer};

/// Appends to a file that several processes write at the same time.
///
/// Every write locks the file exclusively, so entries from different processes
/// never interleave. A companion `<file>.lock` tells a starting writer whether other
/// writers are live: the file is only overwritten when none are.
pub struct SharedFileWriter {
    path: PathBuf,
    charset: Charset,
    appending: bool,
    placeholder: Box<dyn Placeholder>,
    sink: Mutex<ByteBufferedSink<LockedFile>>,
    // Released on close, after the sink has flushed.
    usage: Mutex<Option<HeldLock>>,
}

impl SharedFileWriter {
    pub fn open(
        options: FileOptions,
        placeholder: Box<dyn Placeholder>,
        env: &dyn Environment,
    ) -> Result<Self> {
        let path = PathBuf::from(expand_variables(&options.file, env));
        create_parent_dirs(&path)?;

        let lock_path = lock_path_for(&path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                warn!("Failed to open shared log file {:?}: {}", path, e);
                e
            })?;

        let mut locking = true;
        let mut overwritten = false;
        if !options.append {
            let lock_file = open_lock_file(&lock_path)?;
            match lock::try_lock(&lock_file, LockMode::Exclusive) {
                Ok(Some(_exclusive)) => {
                    prepare(&file, true, options.charset)?;
                    overwritten = true;
                }
                Ok(None) => {
                    debug!("{:?} is in use by another writer, appending", path);
                }
                Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                    warn_locks_unsupported(&e);
                    locking = false;
                }
                Err(e) => return Err(e.into()),
            }
        }
        if !overwritten {
            prepare(&file, false, options.charset)?;
        }

        let usage = if locking {
            match HeldLock::acquire(&lock_path, LockMode::Shared) {
                Ok(held) => Some(held),
                Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                    warn_locks_unsupported(&e);
                    None
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };

        info!("Opened shared log file {:?} (overwritten={})", path, overwritten);

        Ok(Self {
            path,
            charset: options.charset,
            appending: !overwritten,
            placeholder,
            sink: Mutex::new(new_sink(
                LockedFile::new(file),
                options.buffered,
                options.buffer_capacity,
            )),
            usage: Mutex::new(usage),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if existing content was kept when this writer opened the file.
    pub fn is_appending(&self) -> bool {
        self.appending
    }
}

impl Writer for SharedFileWriter {
    fn required_log_entry_values(&self) -> HashSet<LogEntryValue> {
        self.placeholder.required_log_entry_values()
    }

    fn log(&self, entry: &LogEntry) -> io::Result<()> {
        let mut sink = self.sink.lock();
        let bytes = render(self.placeholder.as_ref(), entry, self.charset);
        sink.write(&bytes)
    }

    fn flush(&self) -> io::Result<()> {
        self.sink.lock().flush()
    }

    /// Closes the file and gives up the usage lock, even if the final flush fails.
    fn close(&self) -> io::Result<()> {
        let result = self.sink.lock().close();
        if let Some(usage) = self.usage.lock().take() {
            debug!("Releasing usage lock {:?}", usage.path());
        }
        result
    }
}

/// `<file>.lock` next to the log file.
pub(crate) fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Truncates the file if asked and writes the charset header into an empty file,
/// holding the file lock so no other writer appends in between.
fn prepare(file: &File, truncate: bool, charset: Charset) -> io::Result<()> {
    let _guard = match lock::lock(file, LockMode::Exclusive) {
        Ok(guard) => Some(guard),
        Err(e) if e.kind() == io::ErrorKind::Unsupported => {
            warn_locks_unsupported(&e);
            None
        }
        Err(e) => return Err(e),
    };

    if truncate {
        file.set_len(0)?;
    }
    if file.metadata()?.len() == 0 {
        let mut output = file;
        output.write_all(charset.header())?;
    }
    Ok(())
}
