//! Settlement report for one cycle.
//!
//! Every stage is a pure function over the order and merchant snapshot
//! handed in by the caller, so regenerating a report is always safe.

use std::collections::BTreeSet;
use std::fmt;

use chrono::FixedOffset;
use serde::Serialize;

use messpay_types::{Amount, MerchantKey, Order, SettlementCycle};

use crate::aggregate::{aggregate, EligibleStatuses, RawGroup, TimeRange};
use crate::commission::{commission, CommissionRate, CommissionSplit};
use crate::merge::{merge_with_paid, MergeOutcome, MergeWarning, MerchantGroup};
use crate::resolver::{resolve_with_paid, MerchantDirectory};
use crate::Result;

/// One payout line of a report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub merchant_key: MerchantKey,
    pub merchant_name: String,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub total_orders: u64,
    pub total_revenue: Amount,
    pub split: CommissionSplit,
}

/// Consistency warnings attached to a report. The report is still complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportWarning(pub MergeWarning);

impl fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            MergeWarning::AmbiguousName { name, candidates } => write!(
                f,
                "name '{name}' matches {} merchants ({}); left unmerged",
                candidates.len(),
                candidates.join(", ")
            ),
            MergeWarning::NotConverged { passes } => {
                write!(f, "merchant merge did not converge after {passes} passes")
            }
            MergeWarning::PaidRowKept { key, merchant } => write!(
                f,
                "'{key}' is already paid; kept apart from merchant {merchant}"
            ),
        }
    }
}

/// Payout report for one settlement cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SettlementReport {
    pub cycle: SettlementCycle,
    /// Rate snapshot applied to every line.
    pub rate: CommissionRate,
    /// Sorted by payable, largest first, then by merchant key.
    pub lines: Vec<ReportLine>,
    pub warnings: Vec<ReportWarning>,
}

impl SettlementReport {
    pub fn total_revenue(&self) -> Amount {
        self.lines.iter().map(|l| l.total_revenue).sum()
    }

    pub fn total_commission(&self) -> Amount {
        self.lines.iter().map(|l| l.split.commission).sum()
    }

    pub fn total_payable(&self) -> Amount {
        self.lines.iter().map(|l| l.split.payable).sum()
    }
}

/// Resolve raw groups and merge them to one group per merchant.
pub fn resolve_and_merge<D: MerchantDirectory + ?Sized>(
    raw: Vec<RawGroup>,
    directory: &D,
) -> MergeOutcome {
    resolve_and_merge_with_paid(raw, directory, &BTreeSet::new())
}

/// [`resolve_and_merge`], leaving the unresolved keys in `paid` on their
/// own rows.
pub fn resolve_and_merge_with_paid<D: MerchantDirectory + ?Sized>(
    raw: Vec<RawGroup>,
    directory: &D,
    paid: &BTreeSet<MerchantKey>,
) -> MergeOutcome {
    let groups = raw
        .into_iter()
        .map(|g| {
            let reference = g.key.merchant_ref.as_deref().and_then(messpay_types::MerchantRef::parse);
            let resolution =
                resolve_with_paid(directory, reference.as_ref(), g.key.merchant_name.as_deref(), paid);
            MerchantGroup::new(resolution, g.order_count, g.revenue)
        })
        .collect();
    merge_with_paid(groups, paid)
}

/// Build the payout report for `cycle`.
///
/// `orders` may contain orders outside the cycle; they are filtered by the
/// cycle's time range in the reporting timezone at `offset`. `paid` holds
/// the ledger keys of the cycle already marked Paid.
///
/// # Errors
///
/// - [`crate::SettlementError::NegativeRevenue`] if an order carries a negative total
/// - [`crate::SettlementError::Overflow`] on arithmetic overflow
pub fn build_report<D: MerchantDirectory + ?Sized>(
    orders: &[Order],
    directory: &D,
    cycle: SettlementCycle,
    offset: FixedOffset,
    eligible: &EligibleStatuses,
    rate: CommissionRate,
    paid: &BTreeSet<MerchantKey>,
) -> Result<SettlementReport> {
    let range = TimeRange::for_cycle(&cycle, offset);
    let raw = aggregate(orders, eligible, range);
    let raw_groups = raw.len();
    let merged = resolve_and_merge_with_paid(raw, directory, paid);

    let mut lines = merged
        .groups
        .into_iter()
        .map(|g| {
            let split = commission(g.revenue, rate)?;
            let (owner_name, owner_email) = g
                .merchant
                .map(|m| (m.owner_name, m.owner_email))
                .unwrap_or_default();
            Ok(ReportLine {
                merchant_key: g.key,
                merchant_name: g.display_name,
                owner_name,
                owner_email,
                total_orders: g.order_count,
                total_revenue: g.revenue,
                split,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    lines.sort_by(|a, b| {
        b.split
            .payable
            .cmp(&a.split.payable)
            .then_with(|| a.merchant_key.cmp(&b.merchant_key))
    });

    let warnings: Vec<ReportWarning> = merged.warnings.into_iter().map(ReportWarning).collect();
    for w in &warnings {
        tracing::warn!(%cycle, warning = %w, "settlement consistency warning");
    }

    tracing::info!(
        %cycle,
        rate = %rate,
        raw_groups,
        lines = lines.len(),
        merge_passes = merged.passes,
        "settlement report built"
    );

    Ok(SettlementReport {
        cycle,
        rate,
        lines,
        warnings,
    })
}
