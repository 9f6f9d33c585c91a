//! Transaction router (spec.md §4.6 — C6).
//!
//! Orchestrates authenticate → price → split → append 3 events → emit
//! receipt. Data flows strictly leftward through the stack: a signed
//! transaction enters here, this calls [`crate::auth::HmacAuthorizer`] to
//! authenticate, the policies to price and split, then
//! [`crate::ledger::LedgerStore::apply_batch`] once to post all three
//! events atomically.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::auth::{HmacAuthorizer, SignedTransaction};
use crate::error::RouterError;
use crate::ledger::{LedgerEvent, LedgerStore};
use crate::models::{Receipt, Transaction};
use crate::policy::{FeePolicy, SplitPolicy};
use crate::vault::VaultRegistry;

/// Either form the router accepts, mirroring the original's
/// `Transaction | SignedTransaction` union parameter.
pub enum RoutableTransaction {
    Plain(Transaction),
    Signed(SignedTransaction),
}

impl From<Transaction> for RoutableTransaction {
    fn from(tx: Transaction) -> Self {
        RoutableTransaction::Plain(tx)
    }
}

impl From<SignedTransaction> for RoutableTransaction {
    fn from(signed: SignedTransaction) -> Self {
        RoutableTransaction::Signed(signed)
    }
}

/// Orchestrates one transfer end to end.
///
/// A router with no authenticator is permitted for testing and demos —
/// in that mode either transaction form is accepted and no signature is
/// checked.
pub struct TransactionRouter {
    authorizer: Option<HmacAuthorizer>,
    fee_policy: FeePolicy,
    split_policy: SplitPolicy,
    vaults: VaultRegistry,
    store: Arc<LedgerStore>,
}

impl TransactionRouter {
    pub fn new(
        authorizer: Option<HmacAuthorizer>,
        fee_policy: FeePolicy,
        split_policy: SplitPolicy,
        vaults: VaultRegistry,
        store: Arc<LedgerStore>,
    ) -> Self {
        Self {
            authorizer,
            fee_policy,
            split_policy,
            vaults,
            store,
        }
    }

    /// Authenticate, price, split, post three events, and return a
    /// receipt. The receipt is not itself persisted here — callers that
    /// want a durable receipt call [`crate::ledger::LedgerStore::save_receipt`]
    /// with the result.
    pub async fn route(&self, input: impl Into<RoutableTransaction>) -> Result<Receipt, RouterError> {
        let tx = self.authenticate(input.into())?;

        let fee = self.fee_policy.compute_fee(&tx.amount)?;
        let (safety, growth) = self.split_policy.split(&fee)?;
        let net = tx.amount.checked_sub(&fee)?;

        let mut net_metadata = BTreeMap::new();
        net_metadata.insert("transaction_id".to_string(), tx.id.clone());

        let mut safety_metadata = net_metadata.clone();
        safety_metadata.insert("vault".to_string(), "safety".to_string());

        let mut growth_metadata = net_metadata.clone();
        growth_metadata.insert("vault".to_string(), "growth".to_string());

        let events = vec![
            LedgerEvent::new(&tx.from_account, &tx.to_account, net, tx.created_at, net_metadata),
            LedgerEvent::new(
                &tx.from_account,
                self.vaults.safety_vault(),
                safety,
                tx.created_at,
                safety_metadata,
            ),
            LedgerEvent::new(
                &tx.from_account,
                self.vaults.growth_vault(),
                growth,
                tx.created_at,
                growth_metadata,
            ),
        ];

        self.store.apply_batch(&events).await?;

        Ok(Receipt {
            transaction_id: tx.id,
            gross_amount: tx.amount,
            net_amount: net,
            fee_amount: fee,
            safety_amount: safety,
            growth_amount: growth,
            vault_safety: self.vaults.safety_vault().to_string(),
            vault_growth: self.vaults.growth_vault().to_string(),
            created_at: tx.created_at,
            metadata: Some(tx.metadata),
        })
    }

    fn authenticate(&self, input: RoutableTransaction) -> Result<Transaction, RouterError> {
        match (&self.authorizer, input) {
            (Some(authorizer), RoutableTransaction::Signed(signed)) => {
                if authorizer.verify(&signed) {
                    Ok(signed.transaction)
                } else {
                    Err(RouterError::BadSignature)
                }
            }
            (Some(_), RoutableTransaction::Plain(_)) => Err(RouterError::AuthRequired),
            (None, RoutableTransaction::Signed(signed)) => Ok(signed.transaction),
            (None, RoutableTransaction::Plain(tx)) => Ok(tx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthRegistry;
    use crate::ledger::LedgerStore;
    use crate::money::Money;
    use rust_decimal_macros::dec;

    async fn router_without_auth() -> TransactionRouter {
        let store = Arc::new(LedgerStore::open_in_memory().await.unwrap());
        TransactionRouter::new(
            None,
            FeePolicy::new(dec!(0.01)).unwrap(),
            SplitPolicy::new(dec!(0.5)).unwrap(),
            VaultRegistry::default(),
            store,
        )
    }

    #[tokio::test]
    async fn routes_s1_hundred_dollar_transfer() {
        let router = router_without_auth().await;
        let tx = Transaction::new("acct:alice", "acct:merchant", Money::new(dec!(100.00), "USD").unwrap());
        let receipt = router.route(tx).await.unwrap();

        assert_eq!(receipt.fee_amount.amount_string(), "1.00");
        assert_eq!(receipt.safety_amount.amount_string(), "0.50");
        assert_eq!(receipt.growth_amount.amount_string(), "0.50");
        assert_eq!(receipt.net_amount.amount_string(), "99.00");
    }

    #[tokio::test]
    async fn s1_balances_after_routing() {
        let router = router_without_auth().await;
        let tx = Transaction::new("acct:alice", "acct:merchant", Money::new(dec!(100.00), "USD").unwrap());
        router.route(tx).await.unwrap();

        assert_eq!(router.store.balance("acct:alice", "USD").await.unwrap().amount_string(), "-100.00");
        assert_eq!(router.store.balance("acct:merchant", "USD").await.unwrap().amount_string(), "99.00");
        assert_eq!(router.store.balance("vault:safety", "USD").await.unwrap().amount_string(), "0.50");
        assert_eq!(router.store.balance("vault:growth", "USD").await.unwrap().amount_string(), "0.50");
        assert_eq!(router.store.events().await.unwrap().len(), 3);
        assert!(router.store.verify_chain().await.unwrap().0);
    }

    #[tokio::test]
    async fn s2_tiny_amount_only_posts_net_event() {
        let router = router_without_auth().await;
        let tx = Transaction::new("acct:bob", "acct:c", Money::new(dec!(0.01), "USD").unwrap());
        let receipt = router.route(tx).await.unwrap();

        assert_eq!(receipt.fee_amount.amount_string(), "0.00");
        assert_eq!(receipt.safety_amount.amount_string(), "0.00");
        assert_eq!(receipt.growth_amount.amount_string(), "0.00");
        assert_eq!(receipt.net_amount.amount_string(), "0.01");
        assert_eq!(router.store.events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn s3_ninety_nine_cents_drops_growth_event_only() {
        let router = router_without_auth().await;
        let tx = Transaction::new("acct:a", "acct:b", Money::new(dec!(0.99), "USD").unwrap());
        let receipt = router.route(tx).await.unwrap();

        assert_eq!(receipt.fee_amount.amount_string(), "0.01");
        assert_eq!(receipt.safety_amount.amount_string(), "0.01");
        assert_eq!(receipt.growth_amount.amount_string(), "0.00");
        assert_eq!(receipt.net_amount.amount_string(), "0.98");
        assert_eq!(router.store.events().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn auth_required_rejects_plain_transaction_when_authenticator_configured() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("secret".to_string()));
        let store = Arc::new(LedgerStore::open_in_memory().await.unwrap());
        let router = TransactionRouter::new(
            Some(HmacAuthorizer::new(registry)),
            FeePolicy::new(dec!(0.01)).unwrap(),
            SplitPolicy::new(dec!(0.5)).unwrap(),
            VaultRegistry::default(),
            store,
        );
        let tx = Transaction::new("acct:alice", "acct:bob", Money::new(dec!(10.00), "USD").unwrap());
        let result = router.route(tx).await;
        assert!(matches!(result, Err(RouterError::AuthRequired)));
    }

    #[tokio::test]
    async fn s5_bad_signature_leaves_no_trace() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("secret".to_string()));
        let store = Arc::new(LedgerStore::open_in_memory().await.unwrap());
        let authorizer = HmacAuthorizer::new(registry);
        let router = TransactionRouter::new(
            Some(authorizer.clone()),
            FeePolicy::new(dec!(0.01)).unwrap(),
            SplitPolicy::new(dec!(0.5)).unwrap(),
            VaultRegistry::default(),
            Arc::clone(&store),
        );

        let tx = Transaction::new("acct:alice", "acct:bob", Money::new(dec!(10.00), "USD").unwrap());
        let mut signed = authorizer.sign(tx).unwrap();
        let mut bytes = hex::decode(&signed.signature).unwrap();
        bytes[0] ^= 0x01;
        signed.signature = hex::encode(bytes);

        let result = router.route(signed).await;
        assert!(matches!(result, Err(RouterError::BadSignature)));
        assert!(store.events().await.unwrap().is_empty());
        assert!(store.balance("acct:alice", "USD").await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn authenticator_accepts_valid_signature() {
        let registry = Arc::new(AuthRegistry::new());
        registry.register("acct:alice", Some("secret".to_string()));
        let store = Arc::new(LedgerStore::open_in_memory().await.unwrap());
        let authorizer = HmacAuthorizer::new(registry);
        let tx = Transaction::new("acct:alice", "acct:bob", Money::new(dec!(10.00), "USD").unwrap());
        let signed = authorizer.sign(tx).unwrap();
        let router = TransactionRouter::new(
            Some(authorizer),
            FeePolicy::new(dec!(0.01)).unwrap(),
            SplitPolicy::new(dec!(0.5)).unwrap(),
            VaultRegistry::default(),
            store,
        );
        assert!(router.route(signed).await.is_ok());
    }
}
