//! # messpay-types
//!
//! Shared domain types used across the messpay workspace: merchant
//! references, orders, settlement cycles, payout records and the JSON
//! projections served by the reporting API.

pub mod api;
pub mod cycle;
pub mod events;
pub mod merchant;
pub mod order;
pub mod payout;

pub use cycle::SettlementCycle;
pub use merchant::{LegacyId, Merchant, MerchantId, MerchantRef};
pub use order::{Order, OrderItem, OrderStatus};
pub use payout::{MerchantKey, PayoutRecord, PayoutStatus};

/// Amounts are whole currency units (rupees in the original deployment).
pub type Amount = i64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Length of a canonical merchant id (24 hex characters).
pub const CANONICAL_ID_LEN: usize = 24;

/// Errors raised when parsing domain values from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// Cycle key is not of the form `YYYY-MM-Cn`.
    #[error("malformed settlement cycle '{0}', expected YYYY-MM-Cn")]
    InvalidCycle(String),

    /// Canonical merchant id is not 24 hex characters.
    #[error("malformed merchant id '{0}'")]
    InvalidMerchantId(String),

    /// Payout status is neither Pending nor Paid.
    #[error("unknown payout status '{0}'")]
    InvalidPayoutStatus(String),
}

/// Convenience result type for parsing.
pub type Result<T> = std::result::Result<T, TypesError>;

#[cfg(test)]
mod tests {
    #[test]
    #[ignore] // Run manually to regenerate dashboard bindings
    fn export_ts_bindings() {
        use ts_rs::TS;
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bindings");
        std::fs::create_dir_all(&dir).expect("create bindings dir");
        crate::api::PayoutLine::export_all_to(&dir).expect("export PayoutLine");
        crate::api::TopMerchant::export_all_to(&dir).expect("export TopMerchant");
        crate::api::DailySummary::export_all_to(&dir).expect("export DailySummary");
        crate::api::TrendPoint::export_all_to(&dir).expect("export TrendPoint");
        crate::api::StatusUpdateRequest::export_all_to(&dir).expect("export request");
        crate::api::StatusUpdateResponse::export_all_to(&dir).expect("export response");
    }
}
