//! Value types: [`Transaction`], [`Receipt`], [`Account`].
//!
//! All immutable once constructed, in the teacher's `#[derive(frozen)]`-via-
//! dataclass spirit — here expressed as plain `Clone` structs with no
//! public mutating methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::money::Money;

/// A requested transfer of `amount` from `from_account` to `to_account`.
///
/// `metadata` is a flat string map that participates in the signature —
/// callers relying on it for idempotency keys, memos, or correlation ids
/// should not expect it to be ignored by verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

impl Transaction {
    /// Build a new transaction with a freshly generated id and the current
    /// UTC timestamp, mirroring the original's `uuid4().hex` /
    /// `datetime.now(timezone.utc)` field defaults.
    pub fn new(from_account: impl Into<String>, to_account: impl Into<String>, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The router's summary of one completed `route` call.
///
/// Exactly one receipt exists per successfully-routed transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub gross_amount: Money,
    pub net_amount: Money,
    pub fee_amount: Money,
    pub safety_amount: Money,
    pub growth_amount: Money,
    pub vault_safety: String,
    pub vault_growth: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<BTreeMap<String, String>>,
}

/// A registered account: an id, its shared secret, and when it was created.
///
/// Secrets are stored as opaque server-side bytes (here, their hex
/// encoding) — there is no client-side-only secret material in this model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}
