//! [`LedgerEvent`] — the unit the hash chain links (spec.md §3/§4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::money::Money;
use crate::serialization::canonical_payload;

/// One bookkeeping movement of value from one account to another.
///
/// Created exclusively by [`crate::router::TransactionRouter`]; a
/// zero-amount event is dropped by the store before it ever becomes a row
/// (spec.md §3 "design choice").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub from_account: String,
    pub to_account: String,
    pub amount: Money,
    pub metadata: BTreeMap<String, String>,
}

impl LedgerEvent {
    pub fn new(
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: Money,
        created_at: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            created_at,
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            metadata,
        }
    }

    /// The canonical payload hashed into the chain: same field set and
    /// ordering as the transaction signing payload (spec.md §4.5).
    pub fn canonical_payload(&self) -> String {
        canonical_payload(
            &self.id,
            &self.from_account,
            &self.to_account,
            &self.amount,
            &self.created_at,
            &self.metadata,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn canonical_payload_matches_transaction_shape() {
        let event = LedgerEvent::new(
            "acct:a",
            "acct:b",
            Money::new(dec!(10.00), "USD").unwrap(),
            Utc::now(),
            BTreeMap::new(),
        );
        let payload = event.canonical_payload();
        assert!(payload.contains("\"amount\":\"10.00\""));
        assert!(payload.contains("\"currency\":\"USD\""));
        assert!(!payload.contains(' '));
    }
}
