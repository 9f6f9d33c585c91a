//! Canonical byte-form serialization — the sole input to signing and to
//! the ledger's hash chain.
//!
//! Any non-deterministic field (map iteration order, trailing zeros,
//! timezone representation) is normalized here before it ever reaches a
//! hash or MAC, or verifiers on different hosts would diverge. Keys are
//! sorted lexicographically and there is no whitespace between tokens —
//! `serde_json`'s `Map`/`BTreeMap` serialize in sorted order and
//! `to_string` already uses the minimal `,`/`:` separators, so no custom
//! formatter is needed.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::money::Money;

/// Build the canonical JSON payload shared by transaction signing
/// (spec.md §4.1) and ledger event hashing (spec.md §4.5): an ordered map
/// over `{id, from, to, amount, currency, created_at, metadata}`.
pub fn canonical_payload(
    id: &str,
    from: &str,
    to: &str,
    amount: &Money,
    created_at: &DateTime<Utc>,
    metadata: &BTreeMap<String, String>,
) -> String {
    let mut map: BTreeMap<&str, Value> = BTreeMap::new();
    map.insert("id", Value::String(id.to_string()));
    map.insert("from", Value::String(from.to_string()));
    map.insert("to", Value::String(to.to_string()));
    map.insert("amount", Value::String(amount.amount_string()));
    map.insert("currency", Value::String(amount.currency().to_string()));
    map.insert("created_at", Value::String(created_at.to_rfc3339()));
    map.insert(
        "metadata",
        Value::Object(
            metadata
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
    );
    // `serde_json::Map` defaults to a `BTreeMap` backing store (the
    // `preserve_order` feature is not enabled anywhere in this workspace),
    // so both the outer map and the `metadata` object serialize with keys
    // in sorted order.
    serde_json::to_string(&map).expect("canonical payload is always valid JSON")
}

/// Canonical payload for a [`crate::models::Transaction`].
pub fn canonical_transaction_payload(tx: &crate::models::Transaction) -> String {
    canonical_payload(
        &tx.id,
        &tx.from_account,
        &tx.to_account,
        &tx.amount,
        &tx.created_at,
        &tx.metadata,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn payload_has_no_whitespace() {
        let tx = Transaction::new("acct:a", "acct:b", Money::new(dec!(10.00), "USD").unwrap())
            .with_id("tx1")
            .with_created_at(fixed_time());
        let payload = canonical_transaction_payload(&tx);
        assert!(!payload.contains(' '));
    }

    #[test]
    fn payload_is_deterministic_regardless_of_metadata_insertion_order() {
        let mut meta_a = BTreeMap::new();
        meta_a.insert("z".to_string(), "1".to_string());
        meta_a.insert("a".to_string(), "2".to_string());

        let mut meta_b = BTreeMap::new();
        meta_b.insert("a".to_string(), "2".to_string());
        meta_b.insert("z".to_string(), "1".to_string());

        let tx_a = Transaction::new("acct:a", "acct:b", Money::new(dec!(10.00), "USD").unwrap())
            .with_id("tx1")
            .with_created_at(fixed_time())
            .with_metadata(meta_a);
        let tx_b = Transaction::new("acct:a", "acct:b", Money::new(dec!(10.00), "USD").unwrap())
            .with_id("tx1")
            .with_created_at(fixed_time())
            .with_metadata(meta_b);

        assert_eq!(
            canonical_transaction_payload(&tx_a),
            canonical_transaction_payload(&tx_b)
        );
    }

    #[test]
    fn payload_keys_are_sorted() {
        let tx = Transaction::new("acct:a", "acct:b", Money::new(dec!(10.00), "USD").unwrap())
            .with_id("tx1")
            .with_created_at(fixed_time());
        let payload = canonical_transaction_payload(&tx);
        // "amount" < "created_at" < "currency" < "from" < "id" < "metadata" < "to"
        let amount_pos = payload.find("\"amount\"").unwrap();
        let created_pos = payload.find("\"created_at\"").unwrap();
        let currency_pos = payload.find("\"currency\"").unwrap();
        let from_pos = payload.find("\"from\"").unwrap();
        let id_pos = payload.find("\"id\"").unwrap();
        let metadata_pos = payload.find("\"metadata\"").unwrap();
        let to_pos = payload.find("\"to\"").unwrap();
        assert!(amount_pos < created_pos);
        assert!(created_pos < currency_pos);
        assert!(currency_pos < from_pos);
        assert!(from_pos < id_pos);
        assert!(id_pos < metadata_pos);
        assert!(metadata_pos < to_pos);
    }

    #[test]
    fn amount_is_formatted_with_two_decimals() {
        let tx = Transaction::new("acct:a", "acct:b", Money::new(dec!(5), "USD").unwrap())
            .with_id("tx1")
            .with_created_at(fixed_time());
        let payload = canonical_transaction_payload(&tx);
        assert!(payload.contains("\"amount\":\"5.00\""));
    }
}
