//! Relative date offsets (`-3m`, `-5y`, `-90d`, `0d`) and date ranges.
//!
//! Offsets are always relative to a query's as-of date. The textual form is
//! the one the query service understands, so `Display` and `FromStr`
//! round-trip.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetUnit {
    Day,
    Week,
    Month,
    Year,
}

impl OffsetUnit {
    fn suffix(self) -> char {
        match self {
            OffsetUnit::Day => 'd',
            OffsetUnit::Week => 'w',
            OffsetUnit::Month => 'm',
            OffsetUnit::Year => 'y',
        }
    }
}

/// A signed calendar offset such as `-3m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateOffset {
    pub amount: i32,
    pub unit: OffsetUnit,
}

#[derive(Debug, Error, PartialEq)]
pub enum OffsetParseError {
    #[error("empty date offset")]
    Empty,
    #[error("unknown offset unit in '{0}' (expected d, w, m or y)")]
    UnknownUnit(String),
    #[error("invalid offset amount in '{0}'")]
    InvalidAmount(String),
}

impl DateOffset {
    pub const fn new(amount: i32, unit: OffsetUnit) -> Self {
        Self { amount, unit }
    }

    pub const fn days(amount: i32) -> Self {
        Self::new(amount, OffsetUnit::Day)
    }

    pub const fn months(amount: i32) -> Self {
        Self::new(amount, OffsetUnit::Month)
    }

    pub const fn years(amount: i32) -> Self {
        Self::new(amount, OffsetUnit::Year)
    }

    /// The zero offset, `0d`.
    pub const fn today() -> Self {
        Self::days(0)
    }

    /// Shift `date` by this offset.
    ///
    /// Month and year arithmetic clamps to the last day of the target month
    /// (31 Mar minus one month is 29 Feb in a leap year).
    pub fn apply(&self, date: NaiveDate) -> NaiveDate {
        match self.unit {
            OffsetUnit::Day => date + Duration::days(self.amount as i64),
            OffsetUnit::Week => date + Duration::weeks(self.amount as i64),
            OffsetUnit::Month => shift_months(date, self.amount),
            OffsetUnit::Year => shift_months(date, self.amount.saturating_mul(12)),
        }
    }
}

fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let magnitude = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    };
    shifted.unwrap_or(date)
}

impl fmt::Display for DateOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for DateOffset {
    type Err = OffsetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unit_char = s.chars().last().ok_or(OffsetParseError::Empty)?;
        let unit = match unit_char.to_ascii_lowercase() {
            'd' => OffsetUnit::Day,
            'w' => OffsetUnit::Week,
            'm' => OffsetUnit::Month,
            'y' => OffsetUnit::Year,
            _ => return Err(OffsetParseError::UnknownUnit(s.to_string())),
        };
        let amount = s[..s.len() - unit_char.len_utf8()]
            .parse::<i32>()
            .map_err(|_| OffsetParseError::InvalidAmount(s.to_string()))?;
        Ok(Self { amount, unit })
    }
}

/// Inclusive window `[start, end]`, both relative to the as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateOffset,
    pub end: DateOffset,
}

impl DateRange {
    pub const fn new(start: DateOffset, end: DateOffset) -> Self {
        Self { start, end }
    }

    /// Window from `start` up to the as-of date.
    pub const fn trailing(start: DateOffset) -> Self {
        Self::new(start, DateOffset::today())
    }

    /// Resolve to absolute dates.
    pub fn resolve(&self, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.start.apply(as_of), self.end.apply(as_of))
    }

    /// Weekdays inside the resolved window, ascending.
    pub fn business_days(&self, as_of: NaiveDate) -> Vec<NaiveDate> {
        let (start, end) = self.resolve(as_of);
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "range({},{})", self.start, self.end)
    }
}
