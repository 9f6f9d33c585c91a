//! Hash-chained ledger store (spec.md §4.5 — C5, the hardest piece).
//!
//! Four tables in one SQLite file: `ledger_events`, `balances`,
//! `receipts`, `accounts`. `ledger_events` rows are append-only and
//! linked by `SHA-256(prev_hash || canonical_payload)`; `balances` is a
//! derived cache kept in lockstep with every append.
//!
//! Mutating calls (`apply`, `apply_batch`, `save_receipt`,
//! `create_account`, `upsert_account_secret`) are serialized by a
//! `tokio::sync::Mutex<()>` held for the full span of the call, layered
//! outside sqlx's own transaction. This is what makes the three appends
//! of one `route` call — and the read-tail-then-append inside each one —
//! atomic with respect to any other writer, closing the race the source
//! implementation left open (spec.md §9).

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::GENESIS_HASH;
use crate::error::LedgerError;
use crate::ledger::event::LedgerEvent;
use crate::models::Receipt;
use crate::money::Money;

fn serialize_metadata(metadata: &BTreeMap<String, String>) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(metadata)?)
}

fn deserialize_metadata(payload: &str) -> Result<BTreeMap<String, String>, LedgerError> {
    if payload.is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(payload)?)
}

fn hash_event(prev_hash: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

fn parse_decimal(raw: &str) -> Result<rust_decimal::Decimal, LedgerError> {
    rust_decimal::Decimal::from_str(raw).map_err(|e| LedgerError::Decimal(e.to_string()))
}

/// Durable, tamper-evident ledger backed by SQLite.
pub struct LedgerStore {
    pool: SqlitePool,
    append_lock: Mutex<()>,
}

impl LedgerStore {
    /// Open (creating if missing) the store at `path`. Idempotent — safe
    /// to call repeatedly against the same file; tables are created with
    /// `CREATE TABLE IF NOT EXISTS`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("foreign_keys", "ON");
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self {
            pool,
            append_lock: Mutex::new(()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store. Handy for tests — no filesystem side effects.
    pub async fn open_in_memory() -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("foreign_keys", "ON");
        // A pooled in-memory sqlite connection is per-connection storage, so
        // cap the pool at one connection or every new connection would see
        // an empty, independent database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self {
            pool,
            append_lock: Mutex::new(()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                from_account TEXT NOT NULL,
                to_account TEXT NOT NULL,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                prev_hash TEXT NOT NULL,
                event_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS balances (
                account TEXT PRIMARY KEY,
                balance TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS receipts (
                transaction_id TEXT PRIMARY KEY,
                receipt_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                account_id TEXT PRIMARY KEY,
                secret TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append a single event. Silently returns if `event.amount` is zero —
    /// no row written, no balance touched.
    pub async fn apply(&self, event: LedgerEvent) -> Result<(), LedgerError> {
        let _guard = self.append_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        Self::apply_one(&mut tx, &event).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Append a sequence of events inside one exclusive transaction —
    /// used by [`crate::router::TransactionRouter::route`] so its three
    /// postings can never be split by a concurrent writer (spec.md §5).
    pub async fn apply_batch(&self, events: &[LedgerEvent]) -> Result<(), LedgerError> {
        let _guard = self.append_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        for event in events {
            Self::apply_one(&mut tx, event).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn apply_one(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        event: &LedgerEvent,
    ) -> Result<(), LedgerError> {
        if event.amount.is_zero() {
            debug!(event_id = %event.id, "zero-amount event dropped, no row written");
            return Ok(());
        }

        let prev_hash = Self::last_hash(tx).await?;
        let payload = event.canonical_payload();
        let event_hash = hash_event(&prev_hash, &payload);
        let metadata_json = serialize_metadata(&event.metadata)?;

        debug!(
            event_id = %event.id,
            from = %event.from_account,
            to = %event.to_account,
            amount = %event.amount.amount_string(),
            prev_hash = %prev_hash,
            "appending ledger event"
        );

        sqlx::query(
            r#"
            INSERT INTO ledger_events
                (event_id, created_at, from_account, to_account, amount,
                 currency, metadata_json, prev_hash, event_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(event.created_at.to_rfc3339())
        .bind(&event.from_account)
        .bind(&event.to_account)
        .bind(event.amount.amount_string())
        .bind(event.amount.currency())
        .bind(&metadata_json)
        .bind(&prev_hash)
        .bind(&event_hash)
        .execute(&mut **tx)
        .await?;

        Self::adjust_balance(tx, &event.from_account, -event.amount.amount()).await?;
        Self::adjust_balance(tx, &event.to_account, event.amount.amount()).await?;

        Ok(())
    }

    async fn last_hash(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> Result<String, LedgerError> {
        let row = sqlx::query("SELECT event_hash FROM ledger_events ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut **tx)
            .await?;
        Ok(match row {
            Some(row) => row.try_get::<String, _>("event_hash")?,
            None => GENESIS_HASH.to_string(),
        })
    }

    async fn adjust_balance(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        account: &str,
        delta: rust_decimal::Decimal,
    ) -> Result<(), LedgerError> {
        let row = sqlx::query("SELECT balance FROM balances WHERE account = ?")
            .bind(account)
            .fetch_optional(&mut **tx)
            .await?;
        let updated = match row {
            Some(row) => parse_decimal(&row.try_get::<String, _>("balance")?)? + delta,
            None => delta,
        };
        sqlx::query(
            r#"
            INSERT INTO balances (account, balance) VALUES (?, ?)
            ON CONFLICT(account) DO UPDATE SET balance = excluded.balance
            "#,
        )
        .bind(account)
        .bind(crate::money::quantize(updated).to_string())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// The stored balance for `account`, or `0.00` if it has never moved.
    pub async fn balance(&self, account: &str, currency: &str) -> Result<Money, LedgerError> {
        let row = sqlx::query("SELECT balance FROM balances WHERE account = ?")
            .bind(account)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let raw: String = row.try_get("balance")?;
                Ok(Money::new(parse_decimal(&raw)?, currency)?)
            }
            None => Ok(Money::zero(currency)),
        }
    }

    /// All events in primary-key (append) order.
    pub async fn events(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, created_at, from_account, to_account, amount,
                   currency, metadata_json
            FROM ledger_events
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    fn row_to_event(row: sqlx::sqlite::SqliteRow) -> Result<LedgerEvent, LedgerError> {
        let amount: String = row.try_get("amount")?;
        let currency: String = row.try_get("currency")?;
        let created_at: String = row.try_get("created_at")?;
        let metadata_json: String = row.try_get("metadata_json")?;
        Ok(LedgerEvent {
            id: row.try_get("event_id")?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| LedgerError::Decimal(e.to_string()))?
                .with_timezone(&Utc),
            from_account: row.try_get("from_account")?,
            to_account: row.try_get("to_account")?,
            amount: Money::new(parse_decimal(&amount)?, &currency)?,
            metadata: deserialize_metadata(&metadata_json)?,
        })
    }

    /// Walk the chain in append order, verifying every link.
    ///
    /// Returns `(false, reason)` on the first broken link; never raises
    /// for an integrity failure — only for I/O or decode errors.
    pub async fn verify_chain(&self) -> Result<(bool, Option<String>), LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT prev_hash, event_hash, event_id, created_at, from_account,
                   to_account, amount, currency, metadata_json
            FROM ledger_events
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut expected_prev = GENESIS_HASH.to_string();
        for row in rows {
            let prev_hash: String = row.try_get("prev_hash")?;
            let event_hash: String = row.try_get("event_hash")?;
            let metadata_json: String = row.try_get("metadata_json")?;
            let metadata = deserialize_metadata(&metadata_json)?;
            let amount: String = row.try_get("amount")?;

            if prev_hash != expected_prev {
                return Ok((false, Some("prev_hash mismatch".to_string())));
            }

            let payload = crate::serialization::canonical_payload(
                &row.try_get::<String, _>("event_id")?,
                &row.try_get::<String, _>("from_account")?,
                &row.try_get::<String, _>("to_account")?,
                &Money::new(parse_decimal(&amount)?, &row.try_get::<String, _>("currency")?)?,
                &DateTime::parse_from_rfc3339(&row.try_get::<String, _>("created_at")?)
                    .map_err(|e| LedgerError::Decimal(e.to_string()))?
                    .with_timezone(&Utc),
                &metadata,
            );
            let expected_hash = hash_event(&prev_hash, &payload);
            if event_hash != expected_hash {
                return Ok((false, Some("event_hash mismatch".to_string())));
            }
            expected_prev = event_hash;
        }

        Ok((true, None))
    }

    /// Upsert `receipt` keyed by `transaction_id` — idempotent on replay
    /// (spec.md §8 property 9).
    pub async fn save_receipt(&self, receipt: &Receipt) -> Result<(), LedgerError> {
        let _guard = self.append_lock.lock().await;
        let payload = serde_json::to_string(receipt)?;
        sqlx::query(
            r#"
            INSERT INTO receipts (transaction_id, receipt_json, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(transaction_id) DO UPDATE SET
                receipt_json = excluded.receipt_json,
                created_at = excluded.created_at
            "#,
        )
        .bind(&receipt.transaction_id)
        .bind(payload)
        .bind(receipt.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_receipt(&self, transaction_id: &str) -> Result<Option<Receipt>, LedgerError> {
        let row = sqlx::query("SELECT receipt_json FROM receipts WHERE transaction_id = ?")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let payload: String = row.try_get("receipt_json")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    /// Insert-only: fails on a duplicate `account_id` (spec.md §3 lifecycle).
    pub async fn create_account(&self, account_id: &str, secret: &str) -> Result<(), LedgerError> {
        let _guard = self.append_lock.lock().await;
        sqlx::query(
            "INSERT INTO accounts (account_id, secret, created_at) VALUES (?, ?, ?)",
        )
        .bind(account_id)
        .bind(secret)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Node-only bootstrap convenience: insert-or-replace, so re-supplying
    /// the same operator configuration on every restart never errors
    /// (spec.md §9 "Loose coupling"; see SPEC_FULL.md's account-bootstrap
    /// module).
    pub async fn upsert_account_secret(&self, account_id: &str, secret: &str) -> Result<(), LedgerError> {
        let _guard = self.append_lock.lock().await;
        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, secret, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET secret = excluded.secret
            "#,
        )
        .bind(account_id)
        .bind(secret)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_account_secret(&self, account_id: &str) -> Result<Option<String>, LedgerError> {
        let row = sqlx::query("SELECT secret FROM accounts WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("secret")?)),
            None => Ok(None),
        }
    }

    /// The underlying connection pool. Exposed for integration tests that
    /// need to tamper with stored rows directly to prove `verify_chain`
    /// detects it; not meant for ordinary callers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
