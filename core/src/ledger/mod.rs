//! Hash-chained ledger: [`event::LedgerEvent`] is the linked unit,
//! [`store::LedgerStore`] is the durable store (spec.md §4.5 — C5).

pub mod event;
pub mod store;

pub use event::LedgerEvent;
pub use store::LedgerStore;
