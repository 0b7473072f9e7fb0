//! Rotation policies deciding when the current log file is rolled over.
//!
//! A writer holds a list of policies and treats them as one: a check that is true
//! for any policy triggers rotation, and every policy is reset once a new file is
//! adopted.

mod date;
mod size;
mod startup;


use std::path::Path;

use chrono::{NaiveTime, Weekday};

pub use date::{DatePolicy, Period};
pub use size::SizePolicy;
pub use startup::StartupPolicy;

use crate::error::ConfigError;

const POLICIES_KEY: &str = "policies";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Size(SizePolicy),
    Date(DatePolicy),
    Startup(StartupPolicy),
}

impl Policy {
    pub fn size(max_size: u64) -> Self {
        Policy::Size(SizePolicy::new(max_size))
    }

    pub fn daily(time: NaiveTime) -> Self {
        Policy::Date(DatePolicy::daily(time))
    }

    pub fn weekly(day: Weekday) -> Self {
        Policy::Date(DatePolicy::weekly(day))
    }

    pub fn monthly(time: NaiveTime) -> Self {
        Policy::Date(DatePolicy::monthly(time))
    }

    pub fn startup() -> Self {
        Policy::Startup(StartupPolicy::new())
    }

    /// Decides whether an existing file may be continued when a writer opens it.
    pub fn check_file(&mut self, path: &Path) -> bool {
        match self {
            Policy::Size(policy) => policy.check_file(path),
            Policy::Date(policy) => policy.check_file(path),
            Policy::Startup(policy) => policy.check_file(path),
        }
    }

    /// Decides whether the current file must be rolled before `len` more bytes are
    /// written to it.
    pub fn check_text(&self, len: usize) -> bool {
        match self {
            Policy::Size(policy) => policy.check_text(len),
            Policy::Date(policy) => policy.check_text(),
            Policy::Startup(_) => false,
        }
    }

    /// Accounts for `len` bytes that reached the current file.
    pub fn commit(&mut self, len: usize) {
        if let Policy::Size(policy) = self {
            policy.commit(len);
        }
    }

    /// Starts tracking `path` as the current file, whose first `header_len` bytes
    /// are the charset header.
    pub fn reset(&mut self, path: &Path, header_len: usize) {
        match self {
            Policy::Size(policy) => policy.reset(path, header_len),
            Policy::Date(policy) => policy.reset(),
            Policy::Startup(_) => {}
        }
    }

    /// Parses one policy: `startup`, `daily[:HH[:mm]]`, `weekly[:day]`,
    /// `monthly[:HH[:mm]]` or `size:<bytes>[KB|MB|GB]`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        let (name, argument) = match text.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (text, None),
        };

        match (name.to_ascii_lowercase().as_str(), argument) {
            ("startup", None) => Ok(Policy::startup()),
            ("daily", None) => Ok(Policy::daily(NaiveTime::MIN)),
            ("daily", Some(time)) => date::parse_time(time)
                .map(Policy::daily)
                .ok_or_else(|| {
                    ConfigError::invalid(POLICIES_KEY, text, "expected time as HH or HH:mm")
                }),
            ("weekly", None) => Ok(Policy::weekly(Weekday::Mon)),
            ("weekly", Some(day)) => date::parse_weekday(day)
                .map(Policy::weekly)
                .ok_or_else(|| {
                    ConfigError::invalid(POLICIES_KEY, text, "expected a day name or 1-7")
                }),
            ("monthly", None) => Ok(Policy::monthly(NaiveTime::MIN)),
            ("monthly", Some(time)) => date::parse_time(time)
                .map(Policy::monthly)
                .ok_or_else(|| {
                    ConfigError::invalid(POLICIES_KEY, text, "expected time as HH or HH:mm")
                }),
            ("size", Some(limit)) => match size::parse_size(limit) {
                Some(0) => Err(ConfigError::invalid(POLICIES_KEY, text, "size must be positive")),
                Some(max_size) => Ok(Policy::size(max_size)),
                None => Err(ConfigError::invalid(
                    POLICIES_KEY,
                    text,
                    "expected a byte count with optional KB, MB or GB unit",
                )),
            },
            ("size", None) => Err(ConfigError::invalid(POLICIES_KEY, text, "size requires a limit")),
            ("startup", Some(_)) => Err(ConfigError::invalid(
                POLICIES_KEY,
                text,
                "startup takes no argument",
            )),
            _ => Err(ConfigError::invalid(POLICIES_KEY, text, "unknown policy")),
        }
    }

    /// Parses a comma separated list. An empty list yields a single startup policy.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, ConfigError> {
        let policies = text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Policy::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if policies.is_empty() {
            Ok(vec![Policy::startup()])
        } else {
            Ok(policies)
        }
    }
}

/// Runs `check_file` on every policy, without short circuiting, so each one records
/// that the file was inspected.
pub(crate) fn check_file_all(policies: &mut [Policy], path: &Path) -> bool {
    policies
        .iter_mut()
        .fold(false, |rotate, policy| policy.check_file(path) | rotate)
}

pub(crate) fn check_text_any(policies: &[Policy], len: usize) -> bool {
    policies.iter().any(|policy| policy.check_text(len))
}

pub(crate) fn commit_all(policies: &mut [Policy], len: usize) {
    for policy in policies {
        policy.commit(len);
    }
}

pub(crate) fn reset_all(policies: &mut [Policy], path: &Path, header_len: usize) {
    for policy in policies {
        policy.reset(path, header_len);
    }
}
