//! Calendar dates whose year may be unknown.
//!
//! Birthdays are frequently stored without a year, and yearly occasions only
//! care about month/day. `PartialDate` keeps the raw numbers as stored so
//! malformed rows survive decoding and are rejected where they are resolved.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

// 2000 is a leap year, so Feb 29 counts as a valid month/day pair.
const LEAP_REFERENCE_YEAR: i32 = 2000;

/// Month/day pair with an optional year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl PartialDate {
    /// Creates a month/day pair without a year.
    pub fn month_day(month: u32, day: u32) -> Self {
        Self {
            year: None,
            month,
            day,
        }
    }

    /// Creates a fully specified date.
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            year: Some(year),
            month,
            day,
        }
    }

    /// Returns whether month/day can exist in at least one year.
    pub fn is_valid_month_day(&self) -> bool {
        NaiveDate::from_ymd_opt(LEAP_REFERENCE_YEAR, self.month, self.day).is_some()
    }

    /// Returns whether this value is calendar-valid, including the year when set.
    pub fn is_valid(&self) -> bool {
        match self.year {
            Some(year) => NaiveDate::from_ymd_opt(year, self.month, self.day).is_some(),
            None => self.is_valid_month_day(),
        }
    }

    /// Returns the full date when the year is known and valid.
    pub fn to_full_date(&self) -> Option<NaiveDate> {
        self.year
            .and_then(|year| NaiveDate::from_ymd_opt(year, self.month, self.day))
    }

    /// Returns whether this is the Feb 29 leap day.
    pub fn is_leap_day(&self) -> bool {
        self.month == 2 && self.day == 29
    }
}

impl From<NaiveDate> for PartialDate {
    fn from(value: NaiveDate) -> Self {
        Self::ymd(value.year(), value.month(), value.day())
    }
}

impl Display for PartialDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{year:04}-{:02}-{:02}", self.month, self.day),
            None => write!(f, "--{:02}-{:02}", self.month, self.day),
        }
    }
}

/// Error returned when parsing a `PartialDate` from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDateParseError(pub String);

impl Display for PartialDateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid date `{}`; expected YYYY-MM-DD, MM-DD or --MM-DD",
            self.0
        )
    }
}

impl Error for PartialDateParseError {}

impl FromStr for PartialDate {
    type Err = PartialDateParseError;

    /// Accepts `YYYY-MM-DD`, `MM-DD` and `--MM-DD`. Only shape is checked here;
    /// calendar validity is checked by `is_valid`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let err = || PartialDateParseError(trimmed.to_string());
        let parts: Vec<&str> = trimmed.trim_start_matches("--").split('-').collect();
        match parts.as_slice() {
            [year, month, day] => Ok(Self::ymd(
                year.parse().map_err(|_| err())?,
                month.parse().map_err(|_| err())?,
                day.parse().map_err(|_| err())?,
            )),
            [month, day] => Ok(Self::month_day(
                month.parse().map_err(|_| err())?,
                day.parse().map_err(|_| err())?,
            )),
            _ => Err(err()),
        }
    }
}
