//! ISO week periods (`YYYY-Www`) used to key weekly return distributions.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::CoreError;

/// Earliest and latest ISO years a period may name.
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 9999;

/// An ISO 8601 week, e.g. `2026-W07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    week: u32,
}

impl Period {
    /// Build a period, rejecting weeks that do not exist in `year`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` when the year is outside
    /// [`MIN_YEAR`]..=[`MAX_YEAR`] or the week is outside the ISO year.
    pub fn new(year: i32, week: u32) -> Result<Self, CoreError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CoreError::Validation(format!(
                "year {year} is outside {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| Self { year, week })
            .ok_or_else(|| CoreError::Validation(format!("{year}-W{week:02} is not an ISO week")))
    }

    /// The ISO week containing `at`.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        let iso = at.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// The current UTC week.
    #[must_use]
    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn week(self) -> u32 {
        self.week
    }

    /// Monday of this week.
    #[must_use]
    pub fn starts_on(self) -> NaiveDate {
        // Validated on construction.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("invalid period '{s}', expected YYYY-Www"));
        let (year, week) = s.trim().split_once("-W").ok_or_else(invalid)?;
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || week.len() != 2 || !all_digits(year) || !all_digits(week) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        Self::new(year, week)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl JsonSchema for Period {
    fn schema_name() -> Cow<'static, str> {
        "Period".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "pattern": "^[0-9]{4}-W[0-9]{2}$"
        })
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
