//! Commission calculator.
//!
//! The platform keeps `round_half_up(revenue * rate)` and the merchant is
//! owed the remainder, so `commission + payable == revenue` exactly.
//!
//! The rate is a [`CommissionRate`] value snapshotted once per report run
//! and passed in explicitly; nothing here reads configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use messpay_types::Amount;

use crate::{Result, SettlementError};

/// Basis points in 100%.
pub const BPS_PER_UNIT: u32 = 10_000;

/// Default commission rate, in percent.
pub const DEFAULT_COMMISSION_PERCENT: f64 = 10.0;

/// A commission rate in basis points (1 bp = 0.01%).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommissionRate {
    bps: u32,
}

impl CommissionRate {
    /// 10%.
    pub const DEFAULT: Self = Self { bps: 1_000 };

    /// Build a rate from a percentage such as `10` or `12.5`.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidRate`] if the value is not finite or is
    ///   outside `0..=100`
    pub fn from_percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(SettlementError::InvalidRate(format!(
                "{percent} is not a percentage between 0 and 100"
            )));
        }
        Ok(Self {
            bps: (percent * 100.0).round() as u32,
        })
    }

    /// Build a rate from basis points.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidRate`] if `bps` exceeds 10000
    pub fn from_bps(bps: u32) -> Result<Self> {
        if bps > BPS_PER_UNIT {
            return Err(SettlementError::InvalidRate(format!(
                "{bps} basis points exceeds 100%"
            )));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    pub fn percent(&self) -> f64 {
        f64::from(self.bps) / 100.0
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Result of splitting revenue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// Platform fee.
    pub commission: Amount,
    /// Owed to the merchant.
    pub payable: Amount,
}

/// Split `revenue` into commission and payable at `rate`.
///
/// # Errors
///
/// - [`SettlementError::NegativeRevenue`] if `revenue < 0`
/// - [`SettlementError::Overflow`] if the commission does not fit an [`Amount`]
pub fn commission(revenue: Amount, rate: CommissionRate) -> Result<CommissionSplit> {
    if revenue < 0 {
        return Err(SettlementError::NegativeRevenue(revenue));
    }
    let bps = i128::from(rate.bps);
    let unit = i128::from(BPS_PER_UNIT);
    // Half-up: add half a unit before truncating division.
    let scaled = i128::from(revenue) * bps + unit / 2;
    let commission = Amount::try_from(scaled / unit).map_err(|_| SettlementError::Overflow)?;
    let payable = revenue
        .checked_sub(commission)
        .ok_or(SettlementError::Overflow)?;
    Ok(CommissionSplit {
        commission,
        payable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pct(p: f64) -> CommissionRate {
        CommissionRate::from_percent(p).expect("rate")
    }

    #[test]
    fn test_default_rate() {
        assert_eq!(CommissionRate::default().bps(), 1_000);
        assert_eq!(CommissionRate::default(), pct(DEFAULT_COMMISSION_PERCENT));
        assert_eq!(CommissionRate::default().to_string(), "10%");
    }

    #[test]
    fn test_ten_percent_of_500() {
        let split = commission(500, pct(10.0)).expect("split");
        assert_eq!(split.commission, 50);
        assert_eq!(split.payable, 450);
    }

    #[test]
    fn test_round_half_up() {
        // 10% of 15 = 1.5 -> 2
        assert_eq!(commission(15, pct(10.0)).expect("split").commission, 2);
        // 10% of 14 = 1.4 -> 1
        assert_eq!(commission(14, pct(10.0)).expect("split").commission, 1);
        // 12.5% of 4 = 0.5 -> 1
        assert_eq!(commission(4, pct(12.5)).expect("split").commission, 1);
    }

    #[test]
    fn test_degenerate_cases() {
        assert_eq!(commission(0, pct(10.0)).expect("split"), CommissionSplit::default());
        let split = commission(1234, pct(0.0)).expect("split");
        assert_eq!(split.commission, 0);
        assert_eq!(split.payable, 1234);
        let split = commission(1234, pct(100.0)).expect("split");
        assert_eq!(split.payable, 0);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(CommissionRate::from_percent(-1.0).is_err());
        assert!(CommissionRate::from_percent(100.5).is_err());
        assert!(CommissionRate::from_percent(f64::NAN).is_err());
        assert!(CommissionRate::from_bps(10_001).is_err());
        assert!(matches!(
            commission(-5, pct(10.0)),
            Err(SettlementError::NegativeRevenue(-5))
        ));
    }

    proptest! {
        #[test]
        fn prop_commission_plus_payable_is_revenue(revenue in 0i64..1_000_000_000_000, bps in 0u32..=10_000) {
            let rate = CommissionRate::from_bps(bps).expect("rate");
            let split = commission(revenue, rate).expect("split");
            prop_assert_eq!(split.commission + split.payable, revenue);
            prop_assert!(split.commission >= 0 && split.payable >= 0);
        }
    }
}
