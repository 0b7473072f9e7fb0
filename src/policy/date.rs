use std::fs;
use std::path::Path;

use chrono::{
    DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly(Weekday),
    /// On the first day of every month.
    Monthly,
}

impl Period {
    fn forward(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date + Days::new(1),
            Period::Weekly(_) => date + Days::new(7),
            Period::Monthly => date + Months::new(1),
        }
    }

    fn back(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date - Days::new(1),
            Period::Weekly(_) => date - Days::new(7),
            Period::Monthly => date - Months::new(1),
        }
    }
}

/// Rotates when the local clock passes a recurring time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePolicy {
    period: Period,
    time: NaiveTime,
    boundary: DateTime<Local>,
}

impl DatePolicy {
    pub fn daily(time: NaiveTime) -> Self {
        Self::new_at(Period::Daily, time, Local::now())
    }

    pub fn weekly(day: Weekday) -> Self {
        Self::new_at(Period::Weekly(day), NaiveTime::MIN, Local::now())
    }

    pub fn monthly(time: NaiveTime) -> Self {
        Self::new_at(Period::Monthly, time, Local::now())
    }

    pub(crate) fn new_at(period: Period, time: NaiveTime, now: DateTime<Local>) -> Self {
        let mut policy = Self {
            period,
            time,
            boundary: now,
        };
        policy.boundary = policy.next_boundary_after(now);
        policy
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Next moment at which the current file is rotated away.
    pub fn boundary(&self) -> DateTime<Local> {
        self.boundary
    }

    pub(crate) fn check_file(&self, path: &Path) -> bool {
        self.check_file_at(path, Local::now())
    }

    /// A file last modified before the most recent boundary belongs to an earlier
    /// period.
    pub(crate) fn check_file_at(&self, path: &Path, now: DateTime<Local>) -> bool {
        let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        let modified = DateTime::<Local>::from(modified);
        let last_boundary = self.previous(self.next_boundary_after(now));
        debug!(
            "Date policy: {:?} modified at {}, last boundary {}",
            path, modified, last_boundary
        );
        modified < last_boundary
    }

    pub(crate) fn check_text(&self) -> bool {
        self.check_text_at(Local::now())
    }

    pub(crate) fn check_text_at(&self, now: DateTime<Local>) -> bool {
        now >= self.boundary
    }

    pub(crate) fn reset(&mut self) {
        self.reset_at(Local::now());
    }

    pub(crate) fn reset_at(&mut self, now: DateTime<Local>) {
        self.boundary = self.next_boundary_after(now);
    }

    fn next_boundary_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        let mut date = self.period_start(now.date_naive());
        loop {
            let candidate = to_local(date.and_time(self.time));
            if candidate > now {
                return candidate;
            }
            date = self.period.forward(date);
        }
    }

    fn previous(&self, boundary: DateTime<Local>) -> DateTime<Local> {
        to_local(self.period.back(boundary.date_naive()).and_time(self.time))
    }

    fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self.period {
            Period::Daily => date - Days::new(1),
            Period::Weekly(day) => {
                let back = (7 + date.weekday().num_days_from_monday()
                    - day.num_days_from_monday())
                    % 7;
                date - Days::new(u64::from(back) + 7)
            }
            Period::Monthly => {
                let first = date - Days::new(u64::from(date.day0()));
                first - Months::new(1)
            }
        }
    }
}

/// Local time for a wall clock reading, skipping forward over DST gaps.
fn to_local(naive: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Parses `HH` or `HH:mm`.
pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    let (hour, minute) = match text.split_once(':') {
        Some((hour, minute)) => (hour, minute),
        None => (text, "0"),
    };
    NaiveTime::from_hms_opt(hour.trim().parse().ok()?, minute.trim().parse().ok()?, 0)
}

/// Parses an English day name or a number from 1 (Monday) to 7 (Sunday).
pub(crate) fn parse_weekday(text: &str) -> Option<Weekday> {
    const DAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    let text = text.trim();
    match text.parse::<usize>() {
        Ok(number @ 1..=7) => Some(DAYS[number - 1]),
        Ok(_) => None,
        Err(_) => text.parse::<Weekday>().ok(),
    }
}
