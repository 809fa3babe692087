//! Settlement cycle keys.
//!
//! Each calendar month is split into three windows: days 1-10 (`C1`),
//! 11-20 (`C2`) and 21 to the last day of the month (`C3`). The key
//! `YYYY-MM-Cn` is derived from a date and never stored independently.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::TypesError;

/// Last day of the first window.
const C1_LAST_DAY: u32 = 10;
/// Last day of the second window.
const C2_LAST_DAY: u32 = 20;

/// One 10-day settlement window of a calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SettlementCycle {
    year: i32,
    month: u32,
    index: u8,
}

impl SettlementCycle {
    /// Build a cycle from its parts.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidCycle`] if the month or index is out of range
    pub fn new(year: i32, month: u32, index: u8) -> Result<Self, TypesError> {
        if !(1..=3).contains(&index) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(TypesError::InvalidCycle(format!(
                "{year:04}-{month:02}-C{index}"
            )));
        }
        Ok(Self { year, month, index })
    }

    /// The cycle containing a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        let index = match date.day() {
            1..=C1_LAST_DAY => 1,
            d if d <= C2_LAST_DAY => 2,
            _ => 3,
        };
        Self {
            year: date.year(),
            month: date.month(),
            index,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Window number, 1..=3.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// First calendar day of the window.
    pub fn first_day(&self) -> NaiveDate {
        let day = match self.index {
            1 => 1,
            2 => C1_LAST_DAY + 1,
            _ => C2_LAST_DAY + 1,
        };
        ymd(self.year, self.month, day)
    }

    /// Last calendar day of the window (inclusive).
    pub fn last_day(&self) -> NaiveDate {
        let day = match self.index {
            1 => C1_LAST_DAY,
            2 => C2_LAST_DAY,
            _ => days_in_month(self.year, self.month),
        };
        ymd(self.year, self.month, day)
    }

    /// The window that follows this one.
    pub fn next(&self) -> Self {
        if self.index < 3 {
            return Self {
                index: self.index + 1,
                ..*self
            };
        }
        let (year, month) = next_month(self.year, self.month);
        Self {
            year,
            month,
            index: 1,
        }
    }

    /// Whether a calendar date falls inside this window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    /// The `[start, end)` instants of this window in UTC, for a business
    /// reporting timezone at `offset`.
    pub fn utc_bounds(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            local_midnight_utc(self.first_day(), offset),
            local_midnight_utc(self.next().first_day(), offset),
        )
    }
}

impl fmt::Display for SettlementCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-C{}", self.year, self.month, self.index)
    }
}

impl FromStr for SettlementCycle {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TypesError::InvalidCycle(s.to_string());
        let mut parts = s.trim().split('-');
        let (Some(y), Some(m), Some(c), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        if y.len() != 4 || m.len() != 2 || c.len() != 2 {
            return Err(bad());
        }
        let year: i32 = y.parse().map_err(|_| bad())?;
        let month: u32 = m.parse().map_err(|_| bad())?;
        let index: u8 = c
            .strip_prefix('C')
            .and_then(|n| n.parse().ok())
            .ok_or_else(bad)?;
        Self::new(year, month, index).map_err(|_| bad())
    }
}

impl TryFrom<String> for SettlementCycle {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SettlementCycle> for String {
    fn from(cycle: SettlementCycle) -> Self {
        cycle.to_string()
    }
}

/// Number of days in a month, from the real calendar.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = next_month(year, month);
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

// Fields are validated on construction, so the fallback is unreachable.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn local_midnight_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(chrono::NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}
