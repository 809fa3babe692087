//! Orders as captured by the order-placement subsystem.
//!
//! Orders are read-only here; only their status changes, and only the
//! order subsystem changes it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, MerchantRef, Timestamp};

/// Order status. Only [`OrderStatus::Confirmed`], [`OrderStatus::CashPending`]
/// and [`OrderStatus::Delivered`] can be payout-eligible.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Confirmed,
    /// Cash-on-delivery order not yet paid at the door.
    CashPending,
    Delivered,
    /// Any other status (cancelled, preparing, ...), kept verbatim.
    Other(String),
}

impl OrderStatus {
    /// Canonical storage form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CashPending => "cash-pending",
            Self::Delivered => "delivered",
            Self::Other(s) => s,
        }
    }

    /// Parse a stored status. Accepts the legacy COD spelling.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Self::Confirmed,
            "cash-pending" | "cash_pending" | "pending (cod)" => Self::CashPending,
            "delivered" => Self::Delivered,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line on an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub unit_price: Amount,
    pub quantity: u32,
}

/// A placed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Raw merchant reference exactly as recorded on the order.
    pub merchant_ref: Option<String>,
    /// Raw merchant display name recorded on the order.
    pub merchant_name: Option<String>,
    pub items: Vec<OrderItem>,
    /// `None` when the order subsystem recorded no total.
    pub total_amount: Option<Amount>,
    pub status: OrderStatus,
    pub created_at: Timestamp,
}

impl Order {
    /// The classified merchant reference, if any was recorded.
    pub fn reference(&self) -> Option<MerchantRef> {
        self.merchant_ref.as_deref().and_then(MerchantRef::parse)
    }

    /// Revenue contribution; a missing total counts as zero.
    pub fn revenue(&self) -> Amount {
        self.total_amount.unwrap_or(0)
    }
}
