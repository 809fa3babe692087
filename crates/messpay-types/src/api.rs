//! JSON projections served by the reporting API.
//!
//! Field names are camelCase to match the admin dashboard.

use serde::{Deserialize, Serialize};

use crate::{Amount, PayoutRecord};

/// Fallback owner name when the merchant has none on file.
pub const UNKNOWN_OWNER: &str = "Unknown";
/// Fallback owner email.
pub const UNKNOWN_EMAIL: &str = "N/A";

/// One row of `GET /payouts`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PayoutLine {
    /// Canonical id, or `name:<normalized>` for unresolved merchants.
    pub merchant_id: String,
    pub merchant_name: String,
    pub owner_name: String,
    pub owner_email: String,
    pub total_orders: u64,
    pub total_revenue: Amount,
    /// Percentage, e.g. `10` or `12.5`.
    pub commission_rate: f64,
    pub commission: Amount,
    pub payable: Amount,
    pub payout_status: String,
    pub settlement_cycle: String,
}

impl PayoutLine {
    /// Project a ledger row, with owner details looked up by the caller.
    pub fn from_record(
        record: &PayoutRecord,
        owner_name: Option<&str>,
        owner_email: Option<&str>,
    ) -> Self {
        Self {
            merchant_id: record.merchant_key.to_string(),
            merchant_name: record.merchant_name.clone(),
            owner_name: owner_name.unwrap_or(UNKNOWN_OWNER).to_string(),
            owner_email: owner_email.unwrap_or(UNKNOWN_EMAIL).to_string(),
            total_orders: record.total_orders,
            total_revenue: record.total_revenue,
            commission_rate: f64::from(record.commission_rate_bps) / 100.0,
            commission: record.commission,
            payable: record.payable,
            payout_status: record.payout_status.to_string(),
            settlement_cycle: record.settlement_cycle.to_string(),
        }
    }
}

/// Body of `PUT /payouts/status`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub payout_status: Option<String>,
    /// Defaults to the cycle containing now.
    #[serde(default)]
    pub cycle: Option<String>,
}

/// Response of `PUT /payouts/status` and of API errors.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_status: Option<String>,
}

/// One row of `GET /payouts/top`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopMerchant {
    pub merchant_id: String,
    pub name: String,
    pub location: String,
    pub order_count: u64,
    pub total_revenue: Amount,
}

/// Response of `GET /payouts/summary/daily`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: String,
    pub total_orders: u64,
    pub total_gross_revenue: Amount,
    pub total_commission: Amount,
    /// Gross revenue minus commission, owed to merchants.
    pub total_revenue: Amount,
}

/// One day of `GET /payouts/trends`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: String,
    pub total_orders: u64,
    pub total_revenue: Amount,
}
