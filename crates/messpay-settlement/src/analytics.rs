//! Read-only dashboard views: trailing-window merchant ranking, daily
//! summary and revenue trend. None of these touch the payout ledger.

use std::collections::BTreeMap;

use chrono::{Days, FixedOffset, NaiveDate};

use messpay_types::api::{DailySummary, TopMerchant, TrendPoint};
use messpay_types::{Amount, Order};

use crate::aggregate::{aggregate, EligibleStatuses, TimeRange};
use crate::commission::{commission, CommissionRate};
use crate::cycle::local_date;
use crate::report::resolve_and_merge;
use crate::resolver::MerchantDirectory;
use crate::Result;

/// Location shown for merchants missing from the directory.
pub const UNKNOWN_LOCATION: &str = "N/A";

/// Rank merchants by revenue, then order count, over `range`. Groups are
/// merged by merchant identity exactly as for payouts.
pub fn rank_top_merchants<D: MerchantDirectory + ?Sized>(
    orders: &[Order],
    directory: &D,
    eligible: &EligibleStatuses,
    range: TimeRange,
    limit: usize,
) -> Vec<TopMerchant> {
    let mut groups = resolve_and_merge(aggregate(orders, eligible, range), directory).groups;
    groups.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.order_count.cmp(&a.order_count))
            .then_with(|| a.key.cmp(&b.key))
    });
    groups
        .into_iter()
        .take(limit)
        .map(|g| TopMerchant {
            merchant_id: g.key.to_string(),
            location: g
                .merchant
                .as_ref()
                .map(|m| m.location.clone())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            name: g.display_name,
            order_count: g.order_count,
            total_revenue: g.revenue,
        })
        .collect()
}

/// Totals for one local day, with commission applied to the day's gross.
///
/// # Errors
///
/// Propagates commission errors (negative revenue, overflow).
pub fn daily_summary(
    orders: &[Order],
    eligible: &EligibleStatuses,
    date: NaiveDate,
    offset: FixedOffset,
    rate: CommissionRate,
) -> Result<DailySummary> {
    let range = TimeRange::for_days(date, 1, offset);
    let (total_orders, gross) = orders
        .iter()
        .filter(|o| eligible.contains(&o.status) && range.contains(o.created_at))
        .fold((0u64, 0 as Amount), |(n, sum), o| (n + 1, sum.saturating_add(o.revenue())));
    let split = commission(gross, rate)?;
    Ok(DailySummary {
        date: date.to_string(),
        total_orders,
        total_gross_revenue: gross,
        total_commission: split.commission,
        total_revenue: split.payable,
    })
}

/// Per-day revenue for the `days` days ending on `today`, oldest first.
/// Days without orders are present with zeros.
pub fn revenue_trend(
    orders: &[Order],
    eligible: &EligibleStatuses,
    today: NaiveDate,
    days: u32,
    offset: FixedOffset,
) -> Vec<TrendPoint> {
    let days = days.max(1);
    let first = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(today);
    let range = TimeRange::for_days(first, days, offset);

    let mut buckets: BTreeMap<NaiveDate, (u64, Amount)> = first
        .iter_days()
        .take(days as usize)
        .map(|d| (d, (0, 0)))
        .collect();
    for order in orders
        .iter()
        .filter(|o| eligible.contains(&o.status) && range.contains(o.created_at))
    {
        if let Some(bucket) = buckets.get_mut(&local_date(order.created_at, offset)) {
            bucket.0 += 1;
            bucket.1 = bucket.1.saturating_add(order.revenue());
        }
    }

    buckets
        .into_iter()
        .map(|(date, (total_orders, total_revenue))| TrendPoint {
            date: date.to_string(),
            total_orders,
            total_revenue,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::order;
    use crate::cycle::{local_midnight, offset_from_minutes};
    use crate::resolver::tests::{directory, ANNAPURNA, SHIVAM};
    use messpay_types::OrderStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn test_top_merchants_merge_identities_and_rank() {
        let utc = offset_from_minutes(0).expect("offset");
        let t = local_midnight(date(2025, 3, 5), utc) + 3600;
        let orders = vec![
            order("1", Some(ANNAPURNA), None, Some(100), OrderStatus::Confirmed, t),
            order("2", Some("7"), None, Some(100), OrderStatus::Confirmed, t),
            order("3", Some(SHIVAM), None, Some(1000), OrderStatus::Confirmed, t),
            order("4", None, Some("Nowhere"), Some(5), OrderStatus::Confirmed, t),
            order("5", None, Some("Nowhere"), Some(5), OrderStatus::Other("cancelled".into()), t),
        ];
        let range = TimeRange::for_days(date(2025, 3, 1), 30, utc);
        let top = rank_top_merchants(&orders, &directory(), &EligibleStatuses::default(), range, 2);
        assert_eq!(top.len(), 2);
        // One large order outranks two small ones.
        assert_eq!(top[0].merchant_id, SHIVAM);
        assert_eq!((top[0].order_count, top[0].total_revenue), (1, 1000));
        assert_eq!(top[1].merchant_id, ANNAPURNA);
        assert_eq!((top[1].order_count, top[1].total_revenue), (2, 200));
        assert_eq!(top[1].location, "Pune");

        let all = rank_top_merchants(&orders, &directory(), &EligibleStatuses::default(), range, 10);
        let nowhere = all.iter().find(|m| m.name == "Nowhere").expect("unresolved row");
        assert_eq!(nowhere.location, UNKNOWN_LOCATION);
        assert_eq!(nowhere.order_count, 1);
    }

    #[test]
    fn test_daily_summary() {
        let ist = offset_from_minutes(330).expect("offset");
        let day = date(2025, 3, 5);
        let start = local_midnight(day, ist);
        let orders = vec![
            order("1", Some("7"), None, Some(255), OrderStatus::Confirmed, start),
            order("2", Some("8"), None, None, OrderStatus::Delivered, start + 100),
            order("3", Some("8"), None, Some(1000), OrderStatus::Confirmed, start + 86_400),
            order("4", Some("8"), None, Some(1000), OrderStatus::Confirmed, start - 1),
        ];
        let summary = daily_summary(&orders, &EligibleStatuses::default(), day, ist, CommissionRate::DEFAULT)
            .expect("summary");
        assert_eq!(summary.date, "2025-03-05");
        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.total_gross_revenue, 255);
        assert_eq!(summary.total_commission, 26);
        assert_eq!(summary.total_revenue, 229);
    }

    #[test]
    fn test_revenue_trend_zero_fills() {
        let utc = offset_from_minutes(0).expect("offset");
        let today = date(2025, 3, 7);
        let orders = vec![
            order("1", Some("7"), None, Some(10), OrderStatus::Confirmed, local_midnight(date(2025, 3, 1), utc)),
            order("2", Some("7"), None, Some(20), OrderStatus::Confirmed, local_midnight(today, utc) + 5),
            order("3", Some("7"), None, Some(40), OrderStatus::Confirmed, local_midnight(date(2025, 2, 28), utc)),
        ];
        let trend = revenue_trend(&orders, &EligibleStatuses::default(), today, 7, utc);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, "2025-03-01");
        assert_eq!(trend[0].total_revenue, 10);
        assert_eq!(trend[3].total_revenue, 0);
        assert_eq!(trend[6].date, "2025-03-07");
        assert_eq!(trend[6].total_revenue, 20);
    }
}
