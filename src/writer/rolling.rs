use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{RollingFileOptions, create_parent_dirs, link_latest, new_sink, open_log_file, render};
use crate::charset::Charset;
use crate::convert::Converter;
use crate::entry::{LogEntry, LogEntryValue};
use crate::environment::expand_variables;
use crate::error::{ConfigError, Result};
use crate::labeler::Labeler;
use crate::policy::{self, Policy};
use crate::sink::ByteBufferedSink;
use crate::traits::{Environment, Placeholder, Writer};

enum State {
    Open(ByteBufferedSink<File>),
    Closed,
    /// A rotation failed; the reason is reported by every later call.
    Failed(String),
}

struct Inner {
    state: State,
    policies: Vec<Policy>,
}

/// Writes to a live file that is rolled over into labeled backups whenever one of
/// its policies asks for it.
pub struct RollingFileWriter {
    /// Configured path after variable expansion
    base: PathBuf,
    /// File currently written to, derived from `base` by the labeler
    live: PathBuf,
    /// Link refreshed after every open and rotation
    latest: Option<PathBuf>,
    labeler: Labeler,
    converter: Converter,
    /// Backups to keep, `None` keeps all of them
    backups: Option<usize>,
    charset: Charset,
    buffered: bool,
    buffer_capacity: usize,
    placeholder: Box<dyn Placeholder>,
    /// Sink and policies, guarded together so render-check-rotate-write is atomic
    inner: Mutex<Inner>,
}

impl RollingFileWriter {
    /// Resolves the configured path, prunes surplus backups and adopts the live
    /// file, rolling it over first if any policy rejects it.
    pub fn open(
        options: RollingFileOptions,
        placeholder: Box<dyn Placeholder>,
        env: &dyn Environment,
    ) -> Result<Self> {
        let base = PathBuf::from(expand_variables(&options.file, env));
        let live = options.labeler.live_path(&base);
        let latest = options
            .latest
            .as_deref()
            .map(|template| PathBuf::from(expand_variables(template, env)));
        if latest.as_deref() == Some(live.as_path()) {
            return Err(ConfigError::invalid(
                "latest",
                &live.to_string_lossy(),
                "link must not replace the log file",
            )
            .into());
        }

        create_parent_dirs(&live)?;
        if let Some(link) = &latest {
            create_parent_dirs(link)?;
        }

        options.labeler.prune(&base, options.backups)?;

        let mut policies = options.policies;
        if policies.is_empty() {
            policies.push(Policy::startup());
        }

        let rotate = policy::check_file_all(&mut policies, &live);
        if rotate {
            if let Some(backup) = options.labeler.roll(&base, options.backups)? {
                options.converter.convert(&backup);
            }
        }

        let file = open_log_file(&live, !rotate, options.charset)?;
        policy::reset_all(&mut policies, &live, options.charset.header().len());
        if let Some(link) = &latest {
            link_latest(link, &live);
        }
        info!("Opened rolling log file {:?} (rotated={})", live, rotate);

        Ok(Self {
            base,
            live,
            latest,
            labeler: options.labeler,
            converter: options.converter,
            backups: options.backups,
            charset: options.charset,
            buffered: options.buffered,
            buffer_capacity: options.buffer_capacity,
            placeholder,
            inner: Mutex::new(Inner {
                state: State::Open(new_sink(file, options.buffered, options.buffer_capacity)),
                policies,
            }),
        })
    }

    /// The file currently written to.
    pub fn path(&self) -> &Path {
        &self.live
    }

    /// The configured path after variable expansion, before labeling.
    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// The link kept pointing at the live file, if one is configured.
    pub fn latest_path(&self) -> Option<&Path> {
        self.latest.as_deref()
    }

    /// Nothing is rolled if the old file cannot be flushed completely.
    fn rotate(&self, inner: &mut Inner) -> io::Result<()> {
        let flushed = match &mut inner.state {
            State::Open(sink) => sink.close(),
            State::Closed | State::Failed(_) => Ok(()),
        };
        if let Err(e) = flushed {
            warn!("Failed to flush {:?} before rotation: {}", self.live, e);
            inner.state = State::Failed(e.to_string());
            return Err(e);
        }
        inner.state = State::Failed("rotation did not complete".to_string());

        let reopened = self.labeler.roll(&self.base, self.backups).and_then(|rolled| {
            if let Some(backup) = rolled {
                self.converter.convert(&backup);
            }
            open_log_file(&self.live, false, self.charset)
        });

        match reopened {
            Ok(file) => {
                inner.state = State::Open(new_sink(file, self.buffered, self.buffer_capacity));
                policy::reset_all(&mut inner.policies, &self.live, self.charset.header().len());
                if let Some(link) = &self.latest {
                    link_latest(link, &self.live);
                }
                debug!("Started new log file {:?}", self.live);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to rotate log file {:?}: {}", self.live, e);
                inner.state = State::Failed(e.to_string());
                Err(e)
            }
        }
    }
}

impl Writer for RollingFileWriter {
    fn required_log_entry_values(&self) -> HashSet<LogEntryValue> {
        self.placeholder.required_log_entry_values()
    }

    fn log(&self, entry: &LogEntry) -> io::Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        open_sink(&mut inner.state)?;

        let bytes = render(self.placeholder.as_ref(), entry, self.charset);
        if policy::check_text_any(&inner.policies, bytes.len()) {
            self.rotate(inner)?;
        }

        open_sink(&mut inner.state)?.write(&bytes)?;
        policy::commit_all(&mut inner.policies, bytes.len());
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        open_sink(&mut self.inner.lock().state)?.flush()
    }

    /// Closing twice, or closing a writer whose rotation failed, succeeds.
    fn close(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        match std::mem::replace(&mut inner.state, State::Closed) {
            State::Open(mut sink) => {
                debug!("Closing rolling log file {:?}", self.live);
                sink.close()
            }
            State::Closed | State::Failed(_) => Ok(()),
        }
    }
}

/// The sink of an open writer, or the error explaining why there is none.
fn open_sink(state: &mut State) -> io::Result<&mut ByteBufferedSink<File>> {
    match state {
        State::Open(sink) => Ok(sink),
        State::Closed => Err(io::Error::other("writer is closed")),
        State::Failed(reason) => Err(io::Error::other(format!(
            "writer failed after an unsuccessful rotation: {}",
            reason
        ))),
    }
}
