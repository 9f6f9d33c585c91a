//! Error taxonomy for the core engine.
//!
//! One enum per component, in the teacher's style (see `storage/db.rs`'s
//! `DbError` and `transaction/verification.rs`'s `TransactionError`): each
//! variant carries the context a caller needs, and underlying library
//! errors are wrapped with `#[from]` rather than stringified early.

use thiserror::Error;

/// Errors raised constructing or combining [`crate::money::Money`] values.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MoneyError {
    #[error("money amount must be non-negative")]
    NegativeAmount,

    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// Errors raised constructing [`crate::policy::FeePolicy`] or
/// [`crate::policy::SplitPolicy`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PolicyError {
    #[error("fee_rate must be non-negative")]
    NegativeFeeRate,

    #[error("safety_share must be between 0 and 1")]
    SafetyShareOutOfRange,
}

/// Errors raised signing a transaction. Verification never errors — it
/// returns `false` on any failure, per spec.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AuthError {
    #[error("no secret registered for account {account}")]
    MissingSecret { account: String },
}

/// Errors raised by [`crate::ledger::store::LedgerStore`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store I/O error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("malformed stored payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed stored decimal: {0}")]
    Decimal(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Errors raised by [`crate::router::TransactionRouter::route`].
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("a SignedTransaction is required when an authenticator is configured")]
    AuthRequired,

    #[error("transaction signature is invalid")]
    BadSignature,

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
