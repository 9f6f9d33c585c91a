//! Exact fixed-scale decimal money with a currency tag.
//!
//! Backed by [`rust_decimal::Decimal`] — never binary floating point.
//! Every value is quantized to [`crate::config::MONEY_SCALE`] fractional
//! digits using half-up rounding (`MidpointAwayFromZero`), matching the
//! original's `Decimal.quantize(..., ROUND_HALF_UP)`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::config::{DEFAULT_CURRENCY, MONEY_SCALE};
use crate::error::MoneyError;

/// Quantize a decimal to [`MONEY_SCALE`] fractional digits, half-up.
pub fn quantize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// An exact, non-negative monetary amount paired with a currency code.
///
/// Serializes as `{"amount": "100.00", "currency": "USD"}` — the wire
/// shape every receipt and transaction field uses (spec.md §6) — rather
/// than deriving field-by-field, so the two-decimal string format is
/// guaranteed regardless of `Decimal`'s internal representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

#[derive(Serialize, Deserialize)]
struct MoneyWire {
    amount: String,
    currency: String,
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MoneyWire {
            amount: self.amount_string(),
            currency: self.currency().to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = MoneyWire::deserialize(deserializer)?;
        let amount = Decimal::from_str(&wire.amount).map_err(D::Error::custom)?;
        Money::new(amount, &wire.currency).map_err(D::Error::custom)
    }
}

/// A 3-character currency code, stored inline to avoid a heap allocation
/// for the overwhelmingly common case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    pub fn new(code: &str) -> Self {
        let bytes = code.as_bytes();
        let mut buf = [b' '; 3];
        let len = bytes.len().min(3);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self(buf)
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or(DEFAULT_CURRENCY).trim_end()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::new(DEFAULT_CURRENCY)
    }
}

impl Money {
    /// Construct a new quantized `Money`, rejecting negative amounts.
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount);
        }
        Ok(Self {
            amount: quantize(amount),
            currency: Currency::new(currency),
        })
    }

    /// Construct a zero-amount `Money` in the given currency. Infallible:
    /// zero is never negative.
    pub fn zero(currency: &str) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: Currency::new(currency),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Render the amount with exactly two fractional digits, e.g. `"100.00"`.
    /// This is the contract boundary format used by the canonical
    /// serializer and the persisted schema — it must never change.
    pub fn amount_string(&self) -> String {
        format!("{:.*}", MONEY_SCALE as usize, self.amount)
    }

    fn assert_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.to_string(),
                right: other.currency.to_string(),
            });
        }
        Ok(())
    }

    /// Subtract `other` from `self`. Fails on currency mismatch or a
    /// negative result (the result itself is still a `Money`, which
    /// rejects negative amounts at construction).
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.assert_same_currency(other)?;
        Money::new(self.amount - other.amount, self.currency())
    }

    /// Add `other` to `self`. Fails on currency mismatch.
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.assert_same_currency(other)?;
        Money::new(self.amount + other.amount, self.currency())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_string(), self.currency())
    }
}
