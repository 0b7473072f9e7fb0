//! Conversion of rolled over backups.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Suffix of gzip compressed backups.
pub const GZIP_SUFFIX: &str = ".gz";

const CONVERT_KEY: &str = "convert";

/// What happens to a backup right after it has been rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Converter {
    /// Backups stay as written.
    #[default]
    None,
    /// Backups are replaced by `<backup>.gz`.
    Gzip,
}

impl Converter {
    /// Parses `gzip`. Blank text means no conversion.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Converter::None),
            "gzip" => Ok(Converter::Gzip),
            _ => Err(ConfigError::invalid(CONVERT_KEY, text, "unknown converter")),
        }
    }

    /// Suffix appended to converted backups.
    pub fn backup_suffix(&self) -> &'static str {
        match self {
            Converter::None => "",
            Converter::Gzip => GZIP_SUFFIX,
        }
    }

    /// Converts a freshly rolled backup and returns where it ended up.
    ///
    /// A failed conversion keeps the plain backup in place.
    pub(crate) fn convert(&self, backup: &Path) -> PathBuf {
        match self {
            Converter::None => backup.to_path_buf(),
            Converter::Gzip => match gzip(backup) {
                Ok(target) => target,
                Err(e) => {
                    warn!("Failed to compress backup {:?}: {}", backup, e);
                    backup.to_path_buf()
                }
            },
        }
    }
}

fn gzip(source: &Path) -> io::Result<PathBuf> {
    let mut name = OsString::from(source.as_os_str());
    name.push(GZIP_SUFFIX);
    let target = PathBuf::from(name);

    if let Err(e) = compress(source, &target) {
        let _ = fs::remove_file(&target);
        return Err(e);
    }
    fs::remove_file(source)?;
    debug!("Compressed backup {:?} -> {:?}", source, target);
    Ok(target)
}

fn compress(source: &Path, target: &Path) -> io::Result<()> {
    let mut input = BufReader::new(File::open(source)?);
    let mut encoder = GzEncoder::new(File::create(target)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()
}
