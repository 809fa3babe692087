//! # messpay-settlement
//!
//! Payout settlement engine. Takes a snapshot of placed orders and the
//! merchant directory, and produces one payout line per (merchant,
//! settlement cycle).
//!
//! Pipeline:
//!
//! 1. [`aggregate`] groups eligible orders by raw merchant reference
//! 2. [`resolver`] binds each group to a canonical merchant
//! 3. [`merge`] collapses groups that belong to the same merchant
//! 4. [`commission`] splits revenue into commission and payable
//!
//! [`report`] drives the pipeline for one cycle and [`analytics`] reuses
//! it for the read-only dashboards. Nothing in this crate performs I/O.

pub mod aggregate;
pub mod analytics;
pub mod commission;
pub mod cycle;
pub mod merge;
pub mod report;
pub mod resolver;

pub use aggregate::{EligibleStatuses, TimeRange};
pub use commission::{CommissionRate, CommissionSplit};
pub use report::{build_report, ReportLine, ReportWarning, SettlementReport};
pub use resolver::{MerchantDirectory, MerchantIndex, Resolution};

/// Error types for settlement computations.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Commission rate outside 0..=100 percent.
    #[error("invalid commission rate: {0}")]
    InvalidRate(String),

    /// Reporting UTC offset, in minutes, outside (-1440, 1440).
    #[error("invalid reporting UTC offset: {0} minutes")]
    InvalidOffset(i32),

    /// Revenue must be non-negative.
    #[error("negative revenue {0}")]
    NegativeRevenue(i64),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in settlement calculation")]
    Overflow,
}

/// Convenience result type for settlement operations.
pub type Result<T> = std::result::Result<T, SettlementError>;
