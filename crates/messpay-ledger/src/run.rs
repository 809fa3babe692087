//! Snapshot, compute, write.

use std::collections::BTreeSet;

use rusqlite::Connection;

use messpay_db::queries::{merchants, orders, payouts};
use messpay_settlement::{build_report, MerchantDirectory, MerchantIndex, SettlementReport, TimeRange};
use messpay_types::api::PayoutLine;
use messpay_types::{MerchantKey, Order, PayoutRecord, PayoutStatus, SettlementCycle, Timestamp};

use crate::{Result, SettlementSettings};

/// Orders and merchant directory read at one point in time.
pub struct Snapshot {
    pub orders: Vec<Order>,
    pub directory: MerchantIndex,
}

fn read_snapshot(conn: &Connection, settings: &SettlementSettings, range: TimeRange) -> Result<Snapshot> {
    let orders = orders::eligible_in_range(conn, &settings.eligible.as_strs(), range.start, range.end)?;
    let directory = MerchantIndex::new(merchants::all(conn)?);
    Ok(Snapshot { orders, directory })
}

/// Read eligible orders in `range` and the whole merchant directory.
pub fn snapshot(conn: &mut Connection, settings: &SettlementSettings, range: TimeRange) -> Result<Snapshot> {
    let tx = conn.transaction()?;
    let snapshot = read_snapshot(&tx, settings, range)?;
    tx.commit()?;
    Ok(snapshot)
}

/// Result of one report run.
pub struct ReportRun {
    pub report: SettlementReport,
    /// Ledger rows for the cycle after the write, largest payable first.
    pub rows: Vec<PayoutRecord>,
    pub directory: MerchantIndex,
}

impl ReportRun {
    /// Project ledger rows for the API, with owner details from the
    /// directory snapshot.
    pub fn lines(&self) -> Vec<PayoutLine> {
        self.rows
            .iter()
            .map(|row| {
                let merchant = row
                    .merchant_key
                    .merchant_id()
                    .and_then(|id| self.directory.by_id(id));
                PayoutLine::from_record(
                    row,
                    merchant.and_then(|m| m.owner_name.as_deref()),
                    merchant.and_then(|m| m.owner_email.as_deref()),
                )
            })
            .collect()
    }
}

/// Regenerate `cycle` and write it to the ledger.
///
/// Pending rows of the cycle that no longer have eligible orders are
/// refreshed to zero. Paid rows keep their figures.
pub fn run_report(
    conn: &mut Connection,
    settings: &SettlementSettings,
    cycle: SettlementCycle,
    now: Timestamp,
) -> Result<ReportRun> {
    let rate = settings.rate;
    let range = TimeRange::for_cycle(&cycle, settings.offset);

    let tx = conn.transaction()?;
    let Snapshot { orders, directory } = read_snapshot(&tx, settings, range)?;
    let existing = payouts::list_for_cycle(&tx, &cycle)?;
    tx.commit()?;

    let paid: BTreeSet<MerchantKey> = existing
        .iter()
        .filter(|row| row.payout_status == PayoutStatus::Paid)
        .map(|row| row.merchant_key.clone())
        .collect();

    let report = build_report(
        &orders,
        &directory,
        cycle,
        settings.offset,
        &settings.eligible,
        rate,
        &paid,
    )?;

    let mut records: Vec<PayoutRecord> = report
        .lines
        .iter()
        .map(|line| PayoutRecord {
            merchant_key: line.merchant_key.clone(),
            merchant_name: line.merchant_name.clone(),
            settlement_cycle: cycle,
            total_orders: line.total_orders,
            total_revenue: line.total_revenue,
            commission_rate_bps: rate.bps(),
            commission: line.split.commission,
            payable: line.split.payable,
            payout_status: PayoutStatus::Pending,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let current: BTreeSet<MerchantKey> = records.iter().map(|r| r.merchant_key.clone()).collect();
    let mut stale = Vec::new();
    for row in existing {
        if current.contains(&row.merchant_key) || row.total_orders == 0 {
            continue;
        }
        if row.payout_status == PayoutStatus::Paid {
            tracing::warn!(
                %cycle,
                merchant = %row.merchant_key,
                payable = row.payable,
                "paid row has no eligible orders; figures kept"
            );
            continue;
        }
        stale.push(PayoutRecord {
            total_orders: 0,
            total_revenue: 0,
            commission_rate_bps: rate.bps(),
            commission: 0,
            payable: 0,
            updated_at: now,
            ..row
        });
    }
    if !stale.is_empty() {
        tracing::info!(%cycle, rows = stale.len(), "ledger rows without eligible orders reset to zero");
    }
    records.extend(stale);

    payouts::upsert_batch(conn, &records)?;
    let rows = payouts::list_for_cycle(conn, &cycle)?;

    tracing::info!(
        %cycle,
        rows = rows.len(),
        orders = orders.len(),
        warnings = report.warnings.len(),
        "payout report generated"
    );

    Ok(ReportRun {
        report,
        rows,
        directory,
    })
}
