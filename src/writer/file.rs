use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::info;

use super::{FileOptions, create_parent_dirs, new_sink, open_log_file, render};
use crate::charset::Charset;
use crate::entry::{LogEntry, LogEntryValue};
use crate::environment::expand_variables;
use crate::error::Result;
use crate::sink::ByteBufferedSink;
use crate::traits::{Environment, Placeholder, Writer};

/// Writes every entry to a single file owned by this process.
pub struct FileWriter {
    path: PathBuf,
    charset: Charset,
    placeholder: Box<dyn Placeholder>,
    sink: Mutex<ByteBufferedSink<File>>,
}

impl FileWriter {
    pub fn open(
        options: FileOptions,
        placeholder: Box<dyn Placeholder>,
        env: &dyn Environment,
    ) -> Result<Self> {
        let path = PathBuf::from(expand_variables(&options.file, env));
        create_parent_dirs(&path)?;

        let file = open_log_file(&path, options.append, options.charset)?;
        info!("Opened log file {:?} (append={})", path, options.append);

        Ok(Self {
            path,
            charset: options.charset,
            placeholder,
            sink: Mutex::new(new_sink(file, options.buffered, options.buffer_capacity)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Writer for FileWriter {
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

    fn close(&self) -> io::Result<()> {
        self.sink.lock().close()
    }
}
