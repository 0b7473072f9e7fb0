use std::collections::HashMap;

use crate::charset::Charset;
use crate::convert::Converter;
use crate::error::ConfigError;
use crate::labeler::Labeler;
use crate::policy::Policy;
use crate::sink::DEFAULT_BUFFER_CAPACITY;
use crate::traits::Environment;

/// Configuration options for [`FileWriter`](super::FileWriter) and
/// [`SharedFileWriter`](super::SharedFileWriter)
#[derive(Clone, Debug, PartialEq)]
pub struct FileOptions {
    /// Path of the log file, may contain `${NAME}` variables
    pub file: String,
    /// Encoding of the written text
    pub charset: Charset,
    /// Whether output is collected in memory before it reaches the file
    pub buffered: bool,
    /// Buffer size in bytes when `buffered` is set
    pub buffer_capacity: usize,
    /// Continue an existing file instead of overwriting it
    pub append: bool,
}

impl FileOptions {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            charset: Charset::default(),
            buffered: false,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            append: false,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Reads `file`, `charset`, `buffered` and `append`.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            file: required(properties, "file")?,
            charset: Charset::resolve(properties.get("charset").map(String::as_str)),
            buffered: flag(properties, "buffered")?,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            append: flag(properties, "append")?,
        })
    }
}

/// Configuration options for [`RollingFileWriter`](super::RollingFileWriter)
#[derive(Clone, Debug, PartialEq)]
pub struct RollingFileOptions {
    /// Base path of the log file, may contain `${NAME}` variables
    pub file: String,
    /// Encoding of the written text
    pub charset: Charset,
    /// Whether output is collected in memory before it reaches the file
    pub buffered: bool,
    /// Buffer size in bytes when `buffered` is set
    pub buffer_capacity: usize,
    /// Number of backups to keep, `None` keeps all of them
    pub backups: Option<usize>,
    /// Naming scheme for the live file and its backups
    pub labeler: Labeler,
    /// Conditions that roll the live file over
    pub policies: Vec<Policy>,
    /// Symbolic link kept pointing at the live file, may contain `${NAME}` variables
    pub latest: Option<String>,
    /// Treatment of freshly rolled backups
    pub converter: Converter,
}

impl RollingFileOptions {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            charset: Charset::default(),
            buffered: false,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            backups: None,
            labeler: Labeler::default(),
            policies: vec![Policy::startup()],
            latest: None,
            converter: Converter::None,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_backups(mut self, backups: usize) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn with_labeler(mut self, labeler: Labeler) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn with_policies(mut self, policies: Vec<Policy>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_latest(mut self, latest: impl Into<String>) -> Self {
        self.latest = Some(latest.into());
        self
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    /// Reads `file`, `charset`, `buffered`, `backups`, `label`, `policies`, `latest`
    /// and `convert`.
    ///
    /// The environment supplies the process id for the `pid` labeler.
    pub fn from_properties(
        properties: &HashMap<String, String>,
        env: &dyn Environment,
    ) -> Result<Self, ConfigError> {
        let backups = match properties.get("backups") {
            Some(value) => Some(value.trim().parse::<usize>().map_err(|_| {
                ConfigError::invalid("backups", value, "expected a non-negative integer")
            })?),
            None => None,
        };

        let labeler = match properties.get("label") {
            Some(value) => Labeler::parse(value, env)?,
            None => Labeler::default(),
        };

        let policies = match properties.get("policies") {
            Some(value) => Policy::parse_list(value)?,
            None => vec![Policy::startup()],
        };

        let converter = match properties.get("convert") {
            Some(value) => Converter::parse(value)?,
            None => Converter::None,
        };

        Ok(Self {
            file: required(properties, "file")?,
            charset: Charset::resolve(properties.get("charset").map(String::as_str)),
            buffered: flag(properties, "buffered")?,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            backups,
            labeler,
            policies,
            latest: properties
                .get("latest")
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            converter,
        })
    }
}

fn required(properties: &HashMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
    match properties.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingKey(key)),
    }
}

fn flag(properties: &HashMap<String, String>, key: &'static str) -> Result<bool, ConfigError> {
    let Some(value) = properties.get(key) else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected true or false")),
    }
}
