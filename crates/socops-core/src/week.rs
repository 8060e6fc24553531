//! ISO-8601 week identifiers (`YYYY-Www`).

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// An ISO week. Week 1 is the week containing January 4th; days are
/// Monday-based (`1 = Monday .. 7 = Sunday`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

impl IsoWeek {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidWeek`] if `week` does not exist in `year`.
    pub fn new(year: i32, week: u32) -> Result<Self, CoreError> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| Self { year, week })
            .ok_or_else(|| CoreError::InvalidWeek(format!("{year}-W{week:02}")))
    }

    /// Parse the strict `YYYY-Www` form, e.g. `2026-W09`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidWeek`] for any other shape or for a week
    /// number the ISO year does not have.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidWeek(raw.to_string());
        let bytes = raw.as_bytes();
        if bytes.len() != 8 || bytes[4] != b'-' || bytes[5] != b'W' {
            return Err(invalid());
        }
        let (year_part, week_part) = (&raw[..4], &raw[6..]);
        if !year_part.bytes().all(|b| b.is_ascii_digit())
            || !week_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let week: u32 = week_part.parse().map_err(|_| invalid())?;
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| Self { year, week })
            .ok_or_else(invalid)
    }

    /// The ISO week containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn week(&self) -> u32 {
        self.week
    }

    /// Lower-case form without the dash, used in campaign names: `2026w09`.
    #[must_use]
    pub fn compact(&self) -> String {
        format!("{}w{:02}", self.year, self.week)
    }

    /// Monday of this week.
    #[must_use]
    pub fn monday(&self) -> NaiveDate {
        // Validity was checked at construction.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default()
    }

    /// Calendar date of `day` (1 = Monday .. 7 = Sunday).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDay`] outside `1..=7`.
    pub fn date_for_day(&self, day: u8) -> Result<NaiveDate, CoreError> {
        if !(1..=7).contains(&day) {
            return Err(CoreError::InvalidDay(day));
        }
        Ok(self.monday() + chrono::Days::new(u64::from(day - 1)))
    }
}

impl std::fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl std::str::FromStr for IsoWeek {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for IsoWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsoWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        IsoWeek::parse(&raw).map_err(serde::de::Error::custom)
    }
}
