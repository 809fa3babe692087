//! Merchant identity.
//!
//! Orders reference their merchant in one of three forms. [`MerchantRef`]
//! captures which form was used so that resolution can pattern match
//! instead of probing strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{PayoutStatus, TypesError, CANONICAL_ID_LEN};

/// Canonical, authoritative merchant id (24 lowercase hex characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MerchantId(String);

impl MerchantId {
    /// Returns true if `raw` has the canonical id shape.
    pub fn is_canonical(raw: &str) -> bool {
        raw.len() == CANONICAL_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The same text read as a legacy numeric id, when it is all digits and
    /// fits. `000000000000000000000042` reads as legacy id 42.
    pub fn as_legacy(&self) -> Option<LegacyId> {
        if !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok().map(LegacyId)
    }
}

impl FromStr for MerchantId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if Self::is_canonical(trimmed) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(TypesError::InvalidMerchantId(s.to_string()))
        }
    }
}

impl TryFrom<String> for MerchantId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MerchantId> for String {
    fn from(id: MerchantId) -> Self {
        id.0
    }
}

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Older auto-incremented numeric merchant id still carried by some orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegacyId(pub u64);

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an order refers to its merchant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MerchantRef {
    CanonicalId(MerchantId),
    LegacyId(LegacyId),
    Name(String),
}

impl MerchantRef {
    /// Classify a raw reference as stored on an order.
    ///
    /// Returns `None` for an absent or blank reference.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(id) = trimmed.parse::<MerchantId>() {
            return Some(Self::CanonicalId(id));
        }
        if let Ok(num) = trimmed.parse::<u64>() {
            return Some(Self::LegacyId(LegacyId(num)));
        }
        Some(Self::Name(trimmed.to_string()))
    }
}

impl fmt::Display for MerchantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CanonicalId(id) => write!(f, "{id}"),
            Self::LegacyId(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A merchant record from the merchant directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub legacy_id: Option<LegacyId>,
    pub name: String,
    pub location: String,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    /// Mirror of the ledger; eventually consistent.
    pub payout_status: PayoutStatus,
}

/// Normalize a display name for equivalence checks: lowercase, trimmed,
/// internal whitespace collapsed to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_id() {
        let id: MerchantId = "64b7f0c2a1d3e4f5a6b7c8d9".parse().expect("id");
        assert_eq!(
            MerchantRef::parse("64B7F0C2A1D3E4F5A6B7C8D9"),
            Some(MerchantRef::CanonicalId(id))
        );
    }

    #[test]
    fn test_parse_legacy_id() {
        assert_eq!(
            MerchantRef::parse(" 42 "),
            Some(MerchantRef::LegacyId(LegacyId(42)))
        );
    }

    #[test]
    fn test_parse_numeric_24_digits_is_canonical() {
        // 24 decimal digits are also valid hex; canonical wins.
        let r = MerchantRef::parse("123456789012345678901234").expect("some");
        assert!(matches!(r, MerchantRef::CanonicalId(_)));
    }

    #[test]
    fn test_numeric_canonical_id_reads_as_legacy() {
        let id: MerchantId = "000000000000000000000042".parse().expect("id");
        assert_eq!(id.as_legacy(), Some(LegacyId(42)));
        // Too large for a legacy id.
        let id: MerchantId = "123456789012345678901234".parse().expect("id");
        assert_eq!(id.as_legacy(), None);
        let id: MerchantId = "64b7f0c2a1d3e4f5a6b7c8d9".parse().expect("id");
        assert_eq!(id.as_legacy(), None);
    }

    #[test]
    fn test_parse_name_and_blank() {
        assert_eq!(
            MerchantRef::parse("Annapurna Mess"),
            Some(MerchantRef::Name("Annapurna Mess".to_string()))
        );
        assert_eq!(MerchantRef::parse("   "), None);
    }

    #[test]
    fn test_merchant_id_rejects_bad_shape() {
        assert!("xyz".parse::<MerchantId>().is_err());
        assert!("64b7f0c2a1d3e4f5a6b7c8dz".parse::<MerchantId>().is_err());
    }

    #[test]
    fn test_merchant_id_serde() {
        let id: MerchantId = serde_json::from_str("\"64b7f0c2a1d3e4f5a6b7c8d9\"").expect("parse");
        assert_eq!(serde_json::to_string(&id).expect("ser"), "\"64b7f0c2a1d3e4f5a6b7c8d9\"");
        assert!(serde_json::from_str::<MerchantId>("\"nope\"").is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Annapurna\t  MESS "), "annapurna mess");
        assert_eq!(normalize_name(""), "");
    }
}
