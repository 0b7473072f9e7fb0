//! File writers implementing the [`Writer`](crate::traits::Writer) contract.

mod config;
mod file;
mod rolling;
mod shared;


use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

pub use config::{FileOptions, RollingFileOptions};
pub use file::FileWriter;
pub use rolling::RollingFileWriter;
pub use shared::SharedFileWriter;

use crate::charset::Charset;
use crate::entry::LogEntry;
use crate::error::{Result, WriterError};
use crate::sink::ByteBufferedSink;
use crate::traits::Placeholder;

/// Creates the directory that will hold `path`.
pub(crate) fn create_parent_dirs(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|source| {
        warn!("Failed to create log directory {:?}: {}", parent, source);
        WriterError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        }
    })
}

/// Opens `path` for writing and writes the charset header if the file starts out
/// empty.
pub(crate) fn open_log_file(path: &Path, append: bool, charset: Charset) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    let mut file = options.open(path).map_err(|e| {
        warn!("Failed to open log file {:?}: {}", path, e);
        e
    })?;
    if file.metadata()?.len() == 0 {
        file.write_all(charset.header())?;
    }
    Ok(file)
}

/// Points the symbolic link at `link` to `live`, replacing whatever was there.
/// Failures are only reported.
pub(crate) fn link_latest(link: &Path, live: &Path) {
    // Relative targets keep working when the directory is moved
    let target = match (link.parent(), live.parent(), live.file_name()) {
        (Some(a), Some(b), Some(name)) if a == b => PathBuf::from(name),
        _ => live.to_path_buf(),
    };

    match fs::remove_file(link) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!("Failed to replace link {:?}: {}", link, e);
            return;
        }
    }
    if let Err(e) = symlink(&target, link) {
        warn!("Failed to create link {:?} to {:?}: {}", link, live, e);
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}

pub(crate) fn new_sink<W: Write>(output: W, buffered: bool, capacity: usize) -> ByteBufferedSink<W> {
    if buffered {
        ByteBufferedSink::new(output, capacity)
    } else {
        ByteBufferedSink::unbuffered(output)
    }
}

/// Renders `entry` and encodes the text in `charset`.
pub(crate) fn render(placeholder: &dyn Placeholder, entry: &LogEntry, charset: Charset) -> Vec<u8> {
    let mut text = String::new();
    placeholder.render(&mut text, entry);
    charset.encode(&text).into_owned()
}
