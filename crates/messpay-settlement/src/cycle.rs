//! Settlement cycle calculator.
//!
//! Maps instants to `YYYY-MM-Cn` windows. Callers pass the business
//! reporting offset so that the calendar date is taken in that timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use messpay_types::{SettlementCycle, Timestamp};

use crate::{Result, SettlementError};

/// Settlement cycle of a calendar date.
pub fn cycle_of(date: NaiveDate) -> SettlementCycle {
    SettlementCycle::of(date)
}

/// Calendar date of a unix timestamp in the reporting timezone.
pub fn local_date(ts: Timestamp, offset: FixedOffset) -> NaiveDate {
    to_utc(ts).with_timezone(&offset).date_naive()
}

/// Settlement cycle containing a unix timestamp.
pub fn cycle_containing(ts: Timestamp, offset: FixedOffset) -> SettlementCycle {
    cycle_of(local_date(ts, offset))
}

/// Settlement cycle containing `now`.
pub fn current_cycle(now: DateTime<Utc>, offset: FixedOffset) -> SettlementCycle {
    cycle_of(now.with_timezone(&offset).date_naive())
}

/// Unix timestamp of local midnight starting `date` in the reporting timezone.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Timestamp {
    let secs = date.and_time(NaiveTime::MIN).and_utc().timestamp()
        - i64::from(offset.local_minus_utc());
    u64::try_from(secs).unwrap_or(0)
}

/// Unix seconds for a UTC instant, clamped at the epoch.
pub fn to_timestamp(at: DateTime<Utc>) -> Timestamp {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

fn to_utc(ts: Timestamp) -> DateTime<Utc> {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
}

/// Build a fixed offset from minutes east of UTC.
///
/// # Errors
///
/// [`SettlementError::InvalidOffset`] unless the offset is strictly within
/// one day of UTC.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(SettlementError::InvalidOffset(minutes))
}
