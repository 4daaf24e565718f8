//! `fiberstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the stock modules
//! (identifiers, the error taxonomy, entity identity, version checks).

pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AdjustmentId, CategoryId, CountItemId, InventoryCountId, ItemId, LocationId, MovementId,
    PurchaseOrderId, PurchaseOrderItemId, SupplierId, UserId,
};
pub use version::ExpectedVersion;
