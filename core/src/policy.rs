//! Fee and split policies (spec.md §4.3 — C3).
//!
//! Two immutable value objects, pure functions of their inputs. No
//! synchronization needed — unlike [`crate::auth::AuthRegistry`], these
//! never mutate after construction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::money::Money;

/// Computes `fee = quantise(amount × fee_rate)`, half-up at scale 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    fee_rate: Decimal,
}

impl FeePolicy {
    pub fn new(fee_rate: Decimal) -> Result<Self, PolicyError> {
        if fee_rate.is_sign_negative() {
            return Err(PolicyError::NegativeFeeRate);
        }
        Ok(Self { fee_rate })
    }

    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    /// `fee = quantise(amount × fee_rate)`.
    pub fn compute_fee(&self, amount: &Money) -> Result<Money, PolicyError> {
        let fee = amount.amount() * self.fee_rate;
        Ok(Money::new(fee, amount.currency())?)
    }
}

/// Splits a fee into `(safety, growth)` such that `safety + growth == fee`
/// exactly — growth is computed as the remainder, never as a second
/// independently-rounded quantity, so the two halves always reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPolicy {
    safety_share: Decimal,
}

impl SplitPolicy {
    pub fn new(safety_share: Decimal) -> Result<Self, PolicyError> {
        if safety_share < Decimal::ZERO || safety_share > Decimal::ONE {
            return Err(PolicyError::SafetyShareOutOfRange);
        }
        Ok(Self { safety_share })
    }

    pub fn safety_share(&self) -> Decimal {
        self.safety_share
    }

    /// `safety = quantise(fee × safety_share)`, `growth = fee − safety`.
    pub fn split(&self, fee: &Money) -> Result<(Money, Money), PolicyError> {
        let safety_raw = fee.amount() * self.safety_share;
        let safety = Money::new(safety_raw, fee.currency())?;
        let growth = fee.checked_sub(&safety).map_err(|_| PolicyError::SafetyShareOutOfRange)?;
        Ok((safety, growth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_negative_fee_rate() {
        assert_eq!(FeePolicy::new(dec!(-0.01)), Err(PolicyError::NegativeFeeRate));
    }

    #[test]
    fn rejects_out_of_range_safety_share() {
        assert_eq!(
            SplitPolicy::new(dec!(1.5)),
            Err(PolicyError::SafetyShareOutOfRange)
        );
        assert_eq!(
            SplitPolicy::new(dec!(-0.1)),
            Err(PolicyError::SafetyShareOutOfRange)
        );
    }

    #[test]
    fn computes_fee_from_gross() {
        let policy = FeePolicy::new(dec!(0.01)).unwrap();
        let amount = Money::new(dec!(100.00), "USD").unwrap();
        let fee = policy.compute_fee(&amount).unwrap();
        assert_eq!(fee.amount_string(), "1.00");
    }

    #[test]
    fn splits_fee_evenly() {
        let policy = SplitPolicy::new(dec!(0.5)).unwrap();
        let fee = Money::new(dec!(1.00), "USD").unwrap();
        let (safety, growth) = policy.split(&fee).unwrap();
        assert_eq!(safety.amount_string(), "0.50");
        assert_eq!(growth.amount_string(), "0.50");
    }

    #[test]
    fn split_halves_always_reconcile_to_the_fee() {
        // An odd cent can't split evenly; growth must absorb the remainder
        // so safety + growth == fee exactly, never off by a cent.
        let policy = SplitPolicy::new(dec!(0.5)).unwrap();
        let fee = Money::new(dec!(0.01), "USD").unwrap();
        let (safety, growth) = policy.split(&fee).unwrap();
        let total = safety.checked_add(&growth).unwrap();
        assert_eq!(total.amount_string(), fee.amount_string());
    }

    #[test]
    fn zero_fee_splits_to_zero() {
        let policy = SplitPolicy::new(dec!(0.5)).unwrap();
        let fee = Money::zero("USD");
        let (safety, growth) = policy.split(&fee).unwrap();
        assert!(safety.is_zero());
        assert!(growth.is_zero());
    }

    #[test]
    fn full_safety_share_leaves_growth_at_zero() {
        let policy = SplitPolicy::new(dec!(1.0)).unwrap();
        let fee = Money::new(dec!(10.00), "USD").unwrap();
        let (safety, growth) = policy.split(&fee).unwrap();
        assert_eq!(safety.amount_string(), "10.00");
        assert!(growth.is_zero());
    }
}
