//! # messpay-ledger
//!
//! Report runs over the database: read a snapshot of orders, merchants
//! and the cycle's ledger rows, build the settlement report, and write
//! every payout row back in one transaction.
//!
//! A run never un-pays a merchant. Rows already marked Paid keep their
//! status, are never zeroed, and their orders are never moved onto
//! another merchant's Pending row.

pub mod run;

pub use run::{run_report, snapshot, ReportRun, Snapshot};

use chrono::FixedOffset;

use messpay_db::DbError;
use messpay_settlement::{CommissionRate, EligibleStatuses, SettlementError};

/// Settlement parameters fixed for the life of the process. Each report
/// run copies the rate out before it starts.
#[derive(Debug, Clone)]
pub struct SettlementSettings {
    pub rate: CommissionRate,
    pub offset: FixedOffset,
    pub eligible: EligibleStatuses,
}

/// Error types for report runs.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
