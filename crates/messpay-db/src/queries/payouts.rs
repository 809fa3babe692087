//! Payout ledger queries.
//!
//! One row per (merchant key, settlement cycle). Re-aggregation refreshes
//! the figures of a row but never its status; only [`set_status`] moves a
//! row between Pending and Paid. Rows are never deleted.

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use messpay_types::{MerchantKey, PayoutRecord, PayoutStatus, SettlementCycle, Timestamp};

use crate::queries::merchants;
use crate::{constraint_error, parse_column, DbError, Result};

const COLUMNS: &str = "merchant_key, settlement_cycle, merchant_name, total_orders, total_revenue,
     commission_rate_bps, commission, payable, payout_status, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<PayoutRecord> {
    Ok(PayoutRecord {
        merchant_key: parse_column(row, 0)?,
        settlement_cycle: parse_column(row, 1)?,
        merchant_name: row.get(2)?,
        total_orders: row.get::<_, i64>(3)? as u64,
        total_revenue: row.get(4)?,
        commission_rate_bps: row.get(5)?,
        commission: row.get(6)?,
        payable: row.get(7)?,
        payout_status: parse_column(row, 8)?,
        created_at: row.get::<_, i64>(9)? as u64,
        updated_at: row.get::<_, i64>(10)? as u64,
    })
}

/// Create a Pending row, or refresh the figures of an existing one.
///
/// The stored status and creation time are left untouched, so a Paid row
/// stays Paid. `record.payout_status` is ignored.
pub fn upsert_aggregate(conn: &Connection, record: &PayoutRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO payouts (merchant_key, settlement_cycle, merchant_id, merchant_name, resolved,
             total_orders, total_revenue, commission_rate_bps, commission, payable,
             payout_status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
         ON CONFLICT (merchant_key, settlement_cycle) DO UPDATE SET
             merchant_id = excluded.merchant_id,
             merchant_name = excluded.merchant_name,
             resolved = excluded.resolved,
             total_orders = excluded.total_orders,
             total_revenue = excluded.total_revenue,
             commission_rate_bps = excluded.commission_rate_bps,
             commission = excluded.commission,
             payable = excluded.payable,
             updated_at = excluded.updated_at",
        rusqlite::params![
            record.merchant_key.to_string(),
            record.settlement_cycle.to_string(),
            record.merchant_key.merchant_id().map(|id| id.as_str()),
            record.merchant_name,
            record.merchant_key.is_resolved(),
            record.total_orders as i64,
            record.total_revenue,
            record.commission_rate_bps,
            record.commission,
            record.payable,
            PayoutStatus::Pending.as_str(),
            record.updated_at as i64,
        ],
    )
    .map_err(|e| {
        constraint_error(
            e,
            &format!("payout {} {}", record.merchant_key, record.settlement_cycle),
        )
    })?;
    Ok(())
}

/// Upsert every row of one report in a single transaction. Either all rows
/// are written or none are.
pub fn upsert_batch(conn: &mut Connection, records: &[PayoutRecord]) -> Result<usize> {
    let tx = conn.transaction()?;
    for record in records {
        upsert_aggregate(&tx, record)?;
    }
    tx.commit()?;
    tracing::debug!(rows = records.len(), "payout batch committed");
    Ok(records.len())
}

pub fn get(
    conn: &Connection,
    key: &MerchantKey,
    cycle: &SettlementCycle,
) -> Result<Option<PayoutRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM payouts WHERE merchant_key = ?1 AND settlement_cycle = ?2"
            ),
            [key.to_string(), cycle.to_string()],
            from_row,
        )
        .optional()?;
    Ok(record)
}

/// All rows of one cycle, largest payable first.
pub fn list_for_cycle(conn: &Connection, cycle: &SettlementCycle) -> Result<Vec<PayoutRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM payouts WHERE settlement_cycle = ?1
         ORDER BY payable DESC, merchant_key"
    ))?;
    let rows = stmt
        .query_map([cycle.to_string()], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every row for one merchant, newest cycle first.
pub fn history_for_merchant(conn: &Connection, key: &MerchantKey) -> Result<Vec<PayoutRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM payouts WHERE merchant_key = ?1 ORDER BY settlement_cycle DESC"
    ))?;
    let rows = stmt
        .query_map([key.to_string()], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Outcome of [`set_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: PayoutStatus,
    pub current: PayoutStatus,
    /// False when the row already had the requested status.
    pub changed: bool,
}

/// Move one row to `status`.
///
/// Runs in an immediate transaction and only writes when the stored status
/// differs, so of two concurrent identical requests exactly one reports
/// `changed`. The status is mirrored onto the merchant record in the same
/// transaction.
///
/// # Errors
///
/// [`DbError::NotFound`] when no row exists for the key and cycle.
pub fn set_status(
    conn: &mut Connection,
    key: &MerchantKey,
    cycle: &SettlementCycle,
    status: PayoutStatus,
    now: Timestamp,
) -> Result<StatusChange> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let previous: PayoutStatus = tx
        .query_row(
            "SELECT payout_status FROM payouts WHERE merchant_key = ?1 AND settlement_cycle = ?2",
            [key.to_string(), cycle.to_string()],
            |row| parse_column(row, 0),
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("payout for {key} in {cycle}")))?;

    let updated = tx.execute(
        "UPDATE payouts SET payout_status = ?1, updated_at = ?2
         WHERE merchant_key = ?3 AND settlement_cycle = ?4 AND payout_status <> ?1",
        rusqlite::params![status.as_str(), now as i64, key.to_string(), cycle.to_string()],
    )?;

    if let Some(id) = key.merchant_id() {
        merchants::set_payout_status(&tx, id, status)?;
    }

    tx.commit()?;
    Ok(StatusChange {
        previous,
        current: status,
        changed: updated == 1,
    })
}
