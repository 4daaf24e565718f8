//! Purchasing domain module (purchase orders and receiving).
//!
//! This crate contains business rules for purchase orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). The stock side of
//! receiving is booked through `fiberstock_inventory::ledger` by the caller.

pub mod events;
pub mod order;

pub use events::{GoodsReceived, PurchaseOrderEvent, PurchaseOrderStatusChanged};
pub use order::{
    LineReceipt, NewLine, NewPurchaseOrder, PurchaseOrder, PurchaseOrderHeader, PurchaseOrderItem,
    PurchaseOrderStatus, StatusChange,
};
