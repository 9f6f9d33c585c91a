//! Auth registry + HMAC authorizer (spec.md §4.2 — C2).
//!
//! The registry is a plain `account -> secret` map guarded by
//! `parking_lot::RwLock`, the teacher's standard primitive for shared
//! mutable state outside the ledger store. The authorizer is stateless
//! apart from its reference to the registry.

use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::SECRET_LENGTH_BYTES;
use crate::error::AuthError;
use crate::models::Transaction;
use crate::serialization::canonical_transaction_payload;

type HmacSha256 = Hmac<Sha256>;

/// A transaction paired with the sender's MAC over its canonical payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: String,
    pub key_id: Option<String>,
}

/// In-memory mapping from account id to shared secret.
///
/// Authoritative for [`HmacAuthorizer::verify`]; the persisted `accounts`
/// table ([`crate::ledger::store::LedgerStore`]) is the recovery path —
/// callers are expected to reload this registry from that table on
/// startup (spec.md §9).
#[derive(Debug, Default)]
pub struct AuthRegistry {
    secrets: parking_lot::RwLock<HashMap<String, String>>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `account` with `secret`, or a freshly generated
    /// [`SECRET_LENGTH_BYTES`]-byte hex secret if none is given. Returns
    /// the secret now on file.
    pub fn register(&self, account: &str, secret: Option<String>) -> String {
        let generated = secret.unwrap_or_else(generate_secret);
        self.secrets
            .write()
            .insert(account.to_string(), generated.clone());
        generated
    }

    pub fn get_secret(&self, account: &str) -> Option<String> {
        self.secrets.read().get(account).cloned()
    }

    pub fn set_secret(&self, account: &str, secret: &str) {
        self.secrets
            .write()
            .insert(account.to_string(), secret.to_string());
    }
}

/// Generates a fresh hex-encoded secret of [`SECRET_LENGTH_BYTES`] random
/// bytes.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LENGTH_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Computes and verifies HMAC-SHA-256 signatures over a transaction's
/// canonical payload.
#[derive(Clone)]
pub struct HmacAuthorizer {
    registry: Arc<AuthRegistry>,
}

impl HmacAuthorizer {
    pub fn new(registry: Arc<AuthRegistry>) -> Self {
        Self { registry }
    }

    /// Signs `transaction` with the sender's registered secret.
    ///
    /// Fails with [`AuthError::MissingSecret`] if no secret is on file for
    /// `transaction.from_account`.
    pub fn sign(&self, transaction: Transaction) -> Result<SignedTransaction, AuthError> {
        let secret = self
            .registry
            .get_secret(&transaction.from_account)
            .ok_or_else(|| AuthError::MissingSecret {
                account: transaction.from_account.clone(),
            })?;
        let signature = Self::compute_signature(&secret, &transaction);
        Ok(SignedTransaction {
            transaction,
            signature,
            key_id: None,
        })
    }

    /// Verifies `signed.signature` against the sender's registered secret.
    ///
    /// Returns `false` on an unknown sender or a mismatched signature;
    /// never raises. Comparison is constant-time — it uses
    /// `hmac::Mac::verify_slice`, which compares in fixed time regardless
    /// of where the first differing byte falls.
    pub fn verify(&self, signed: &SignedTransaction) -> bool {
        let tx_id = &signed.transaction.id;

        let Some(secret) = self.registry.get_secret(&signed.transaction.from_account) else {
            warn!(tx_id = %tx_id, account = %signed.transaction.from_account, "verification failed: no secret registered for sender");
            return false;
        };
        let Ok(expected_sig_bytes) = hex::decode(&signed.signature) else {
            warn!(tx_id = %tx_id, "verification failed: signature is not valid hex");
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            warn!(tx_id = %tx_id, "verification failed: secret rejected by HMAC key schedule");
            return false;
        };
        let payload = canonical_transaction_payload(&signed.transaction);
        mac.update(payload.as_bytes());
        let valid = mac.verify_slice(&expected_sig_bytes).is_ok();
        if !valid {
            warn!(tx_id = %tx_id, "verification failed: signature mismatch");
        }
        valid
    }

    fn compute_signature(secret: &str, tx: &Transaction) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
        let payload = canonical_transaction_payload(tx);
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use rust_decimal_macros::dec;

    fn make_tx(from: &str) -> Transaction {
        Transaction::new(from, "acct:bob", Money::new(dec!(10.00), "USD").unwrap())
    }

    #[test]
    fn sign_fails_for_unknown_sender() {
        let registry = Arc::new(AuthRegistry::new());
        let authorizer = HmacAuthorizer::new(registry);
        let result = authorizer.sign(make_tx("acct:alice"));
        assert!(matches!(result, Err(AuthError::MissingSecret { .. })));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("topsecret".to_string()));
        let authorizer = HmacAuthorizer::new(registry);
        let signed = authorizer.sign(make_tx("acct:alice")).unwrap();
        assert!(authorizer.verify(&signed));
    }

    #[test]
    fn verify_rejects_unknown_sender() {
        let registry = Arc::new(AuthRegistry::new());
        let authorizer = HmacAuthorizer::new(registry);
        let unsigned = make_tx("acct:ghost");
        let forged = SignedTransaction {
            transaction: unsigned,
            signature: "00".repeat(32),
            key_id: None,
        };
        assert!(!authorizer.verify(&forged));
    }

    #[test]
    fn verify_rejects_flipped_signature_byte() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("topsecret".to_string()));
        let authorizer = HmacAuthorizer::new(registry);
        let mut signed = authorizer.sign(make_tx("acct:alice")).unwrap();

        let mut bytes = hex::decode(&signed.signature).unwrap();
        bytes[0] ^= 0x01;
        signed.signature = hex::encode(bytes);

        assert!(!authorizer.verify(&signed));
    }

    #[test]
    fn verify_rejects_tampered_amount() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("topsecret".to_string()));
        let authorizer = HmacAuthorizer::new(registry);
        let mut signed = authorizer.sign(make_tx("acct:alice")).unwrap();

        signed.transaction.amount = Money::new(dec!(999.00), "USD").unwrap();
        assert!(!authorizer.verify(&signed));
    }

    #[test]
    fn verify_rejects_tampered_metadata() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("topsecret".to_string()));
        let authorizer = HmacAuthorizer::new(registry);
        let mut signed = authorizer.sign(make_tx("acct:alice")).unwrap();

        signed
            .transaction
            .metadata
            .insert("injected".to_string(), "value".to_string());
        assert!(!authorizer.verify(&signed));
    }

    #[test]
    fn different_accounts_get_different_generated_secrets() {
        let registry = AuthRegistry::new();
        let a = registry.register("acct:a", None);
        let b = registry.register("acct:b", None);
        assert_ne!(a, b);
        assert_eq!(a.len(), SECRET_LENGTH_BYTES * 2); // hex-encoded
    }

    #[test]
    fn set_secret_overwrites_registered_secret() {
        let registry = AuthRegistry::new();
        registry.register("acct:a", Some("first".to_string()));
        registry.set_secret("acct:a", "second");
        assert_eq!(registry.get_secret("acct:a"), Some("second".to_string()));
    }
}
