//! File writers for an embedded logging framework.
//!
//! Writers take log entries that a format pattern has already turned into text and
//! persist them: [`FileWriter`] to one plain file, [`RollingFileWriter`] to a file
//! that is rolled over into numbered or time stamped backups, and
//! [`SharedFileWriter`] to a file appended by several processes at once.

pub mod charset;
pub mod convert;
pub mod entry;
pub mod environment;
pub mod error;
pub mod labeler;
pub mod lock;
pub mod policy;
pub mod sink;
pub mod traits;
pub mod writer;

pub use charset::Charset;
pub use convert::Converter;
pub use entry::{Level, LogEntry, LogEntryValue, ThreadInfo, Throwable};
pub use environment::{StaticEnvironment, SystemEnvironment, expand_variables};
pub use error::{ConfigError, Result, WriterError};
pub use labeler::{CountLabeler, Labeler, ProcessIdLabeler, TimestampLabeler};
pub use policy::{DatePolicy, Period, Policy, SizePolicy, StartupPolicy};
pub use sink::ByteBufferedSink;
pub use traits::{Environment, Placeholder, RenderedText, Writer};
pub use writer::{FileOptions, FileWriter, RollingFileOptions, RollingFileWriter, SharedFileWriter};
