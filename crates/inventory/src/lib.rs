//! Inventory domain: item registry, stock ledger, adjustments and counts.
//!
//! Pure, deterministic domain logic (no IO, no storage). Callers load records,
//! run these operations and persist every touched record in one transaction.

pub mod adjustment;
pub mod catalog;
pub mod count;
pub mod events;
pub mod item;
pub mod ledger;
pub mod movement;

pub use adjustment::{Adjustment, AdjustmentRequest, StockAdjustment, adjust};
pub use catalog::{Category, Company, Location, NewCategory, NewLocation, NewSupplier, Supplier};
pub use count::{CountCompletion, CountStatus, InventoryCount, InventoryCountItem, NewCount};
pub use events::{
    InventoryCountCompleted, InventoryEvent, StockAdjusted, StockLevel, StockMovementRecorded,
};
pub use item::{Condition, Item, ItemDetails, NewItem, StockStatus};
pub use ledger::{reconcile, record_movement, replay};
pub use movement::{AbsoluteQuantity, MovementRequest, MovementType, StockMovement};
