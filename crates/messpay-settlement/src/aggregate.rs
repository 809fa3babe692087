//! Order aggregator.
//!
//! Groups eligible orders inside a time range by their raw merchant
//! reference and raw display name. Ineligible orders are absent from the
//! output, not counted as zero. An order without a recorded total still
//! counts as one order with zero revenue.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use messpay_types::{Amount, Order, OrderStatus, SettlementCycle, Timestamp};

use crate::cycle::{local_midnight, to_timestamp};

/// The set of order statuses that count toward payouts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleStatuses {
    statuses: Vec<OrderStatus>,
}

impl EligibleStatuses {
    /// Confirmed, delivered and, when `include_cash_pending`, cash-pending.
    pub fn new(include_cash_pending: bool) -> Self {
        let mut statuses = vec![OrderStatus::Confirmed, OrderStatus::Delivered];
        if include_cash_pending {
            statuses.push(OrderStatus::CashPending);
        }
        Self { statuses }
    }

    pub fn contains(&self, status: &OrderStatus) -> bool {
        self.statuses.contains(status)
    }

    /// Canonical status strings, for storage queries.
    pub fn as_strs(&self) -> Vec<&str> {
        self.statuses.iter().map(OrderStatus::as_str).collect()
    }
}

impl Default for EligibleStatuses {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Half-open `[start, end)` range of unix timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Range covered by a settlement cycle in the reporting timezone.
    pub fn for_cycle(cycle: &SettlementCycle, offset: FixedOffset) -> Self {
        let (start, end) = cycle.utc_bounds(offset);
        Self {
            start: to_timestamp(start),
            end: to_timestamp(end),
        }
    }

    /// Range covering `days` whole local days starting at `first`.
    pub fn for_days(first: NaiveDate, days: u32, offset: FixedOffset) -> Self {
        let last = first
            .checked_add_days(chrono::Days::new(u64::from(days)))
            .unwrap_or(first);
        Self {
            start: local_midnight(first, offset),
            end: local_midnight(last, offset),
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Raw grouping key: merchant reference and display name as recorded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawKey {
    pub merchant_ref: Option<String>,
    pub merchant_name: Option<String>,
}

/// Summed orders for one raw key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGroup {
    pub key: RawKey,
    pub order_count: u64,
    pub revenue: Amount,
}

/// Group eligible orders within `range`. Output is sorted by raw key.
pub fn aggregate(orders: &[Order], eligible: &EligibleStatuses, range: TimeRange) -> Vec<RawGroup> {
    let mut groups: BTreeMap<RawKey, (u64, Amount)> = BTreeMap::new();
    for order in orders
        .iter()
        .filter(|o| eligible.contains(&o.status) && range.contains(o.created_at))
    {
        let key = RawKey {
            merchant_ref: order.merchant_ref.clone(),
            merchant_name: order.merchant_name.clone(),
        };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(order.revenue());
    }
    groups
        .into_iter()
        .map(|(key, (order_count, revenue))| RawGroup {
            key,
            order_count,
            revenue,
        })
        .collect()
}
