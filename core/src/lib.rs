// Copyright (c) 2026 Vaultflow Contributors. MIT License.
// See LICENSE for details.

//! # Vaultflow — Core Payment Routing & Ledger Engine
//!
//! A small payment-routing and ledger engine: signed transfer requests in,
//! a fee deducted and split between two vault accounts, every movement
//! durably recorded in a tamper-evident hash-chained ledger with exact
//! decimal arithmetic.
//!
//! ## Architecture
//!
//! Modules mirror the data flow of a single routed transfer, leftward
//! through the stack — a signed transaction enters [`router`], which calls
//! [`auth`] to authenticate, [`policy`] to price and split, then [`ledger`]
//! to post three events and persist a receipt:
//!
//! - **money** — exact fixed-scale decimal with a currency tag; canonical
//!   byte form for signing.
//! - **auth** — per-account shared secrets; HMAC-SHA-256 sign/verify over
//!   canonical payloads.
//! - **policy** — pure fee and split functions.
//! - **vault** — the two fee-split sink accounts.
//! - **ledger** — the hash-chained event log, balance index, receipt
//!   store, account-secret table.
//! - **router** — orchestrates the whole transfer.
//!
//! This crate has no knowledge of HTTP, CLI, or process lifecycle — those
//! live in the `vaultflow-node` binary crate.

pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod money;
pub mod policy;
pub mod router;
pub mod serialization;
pub mod vault;

pub use auth::{AuthRegistry, HmacAuthorizer, SignedTransaction};
pub use error::{AuthError, LedgerError, MoneyError, PolicyError, RouterError};
pub use ledger::{LedgerEvent, LedgerStore};
pub use models::{Account, Receipt, Transaction};
pub use money::Money;
pub use policy::{FeePolicy, SplitPolicy};
pub use router::{RoutableTransaction, TransactionRouter};
pub use vault::VaultRegistry;
