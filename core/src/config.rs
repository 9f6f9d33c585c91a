//! # Engine Configuration & Constants
//!
//! Default policy parameters and wire-format constants, in the teacher's
//! `protocol/src/config.rs` style: grouped `pub const`s with a sanity-check
//! test module at the bottom.

/// Default ISO 4217-shaped currency code used when a transaction doesn't
/// specify one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Number of fractional digits every [`crate::money::Money`] value is
/// quantized to. Two, like every sane payments system.
pub const MONEY_SCALE: u32 = 2;

/// Default fee rate applied by [`crate::policy::FeePolicy`]: 1%.
pub const DEFAULT_FEE_RATE: &str = "0.01";

/// Default share of the fee routed to the safety vault: 50%.
pub const DEFAULT_SAFETY_SHARE: &str = "0.5";

/// Default safety-vault account id.
pub const DEFAULT_VAULT_SAFETY: &str = "vault:safety";

/// Default growth-vault account id.
pub const DEFAULT_VAULT_GROWTH: &str = "vault:growth";

/// Length, in bytes, of a freshly generated account secret.
pub const SECRET_LENGTH_BYTES: usize = 32;

/// The literal `prev_hash` value of the first event in a chain.
pub const GENESIS_HASH: &str = "GENESIS";

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn default_fee_rate_parses_and_is_sane() {
        let rate = Decimal::from_str(DEFAULT_FEE_RATE).unwrap();
        assert!(rate >= Decimal::ZERO);
        assert!(rate < Decimal::ONE);
    }

    #[test]
    fn default_safety_share_is_between_zero_and_one() {
        let share = Decimal::from_str(DEFAULT_SAFETY_SHARE).unwrap();
        assert!(share >= Decimal::ZERO);
        assert!(share <= Decimal::ONE);
    }

    #[test]
    fn vaults_are_distinct() {
        assert_ne!(DEFAULT_VAULT_SAFETY, DEFAULT_VAULT_GROWTH);
    }

    #[test]
    fn secret_length_is_at_least_128_bits() {
        assert!(SECRET_LENGTH_BYTES >= 16);
    }
}
