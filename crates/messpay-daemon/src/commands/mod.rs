//! HTTP request handlers.
//!
//! Each submodule implements the endpoints for one area of the API.

pub mod analytics;
pub mod payouts;

use chrono::{DateTime, FixedOffset, Utc};

use messpay_settlement::cycle::current_cycle;
use messpay_types::SettlementCycle;

use crate::http::ApiError;

/// Parse an optional `cycle` parameter; absent or blank means the cycle
/// containing `now` in the reporting timezone.
pub(crate) fn cycle_or_current(
    raw: Option<&str>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<SettlementCycle, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(s.parse()?),
        None => Ok(current_cycle(now, offset)),
    }
}

/// Lenient numeric query parameter: missing or unparsable falls back to
/// `default`, then the value is clamped.
pub(crate) fn clamped_param<T>(raw: Option<&str>, default: T, min: T, max: T) -> T
where
    T: std::str::FromStr + Ord,
{
    raw.and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
        .clamp(min, max)
}
