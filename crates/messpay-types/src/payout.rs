//! Payout ledger records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::merchant::normalize_name;
use crate::{Amount, MerchantId, SettlementCycle, Timestamp, TypesError};

/// Payout status of one (merchant, cycle) row. Pending -> Paid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutStatus {
    #[default]
    Pending,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = TypesError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(TypesError::InvalidPayoutStatus(s.to_string())),
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger key for a merchant.
///
/// Resolved merchants are keyed by canonical id. Merchants that could not
/// be resolved are keyed by their normalized display name. Serialized as
/// its string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub enum MerchantKey {
    Resolved(MerchantId),
    Unresolved(String),
}

const UNRESOLVED_PREFIX: &str = "name:";

impl MerchantKey {
    /// Key for an unresolved merchant carried only by its name.
    pub fn unresolved(name: &str) -> Self {
        Self::Unresolved(normalize_name(name))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn merchant_id(&self) -> Option<&MerchantId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for MerchantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(id) => write!(f, "{id}"),
            Self::Unresolved(name) => write!(f, "{UNRESOLVED_PREFIX}{name}"),
        }
    }
}

impl FromStr for MerchantKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(UNRESOLVED_PREFIX) {
            Some(name) => Ok(Self::Unresolved(name.to_string())),
            None => Ok(Self::Resolved(s.parse()?)),
        }
    }
}

/// One ledger row per (merchant, settlement cycle).
///
/// `commission == round_half_up(total_revenue * rate)` and
/// `payable == total_revenue - commission`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub merchant_key: MerchantKey,
    /// Best-effort display name.
    pub merchant_name: String,
    pub settlement_cycle: SettlementCycle,
    pub total_orders: u64,
    pub total_revenue: Amount,
    /// Commission rate snapshot, in basis points.
    pub commission_rate_bps: u32,
    pub commission: Amount,
    pub payable: Amount,
    pub payout_status: PayoutStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
