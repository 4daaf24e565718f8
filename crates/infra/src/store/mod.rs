//! Transactional storage for stock records.
//!
//! The store boundary is where atomicity lives: an item update and the ledger
//! entry describing it are written in the same transaction or not at all.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use r#trait::{StockStore, StockTx};
