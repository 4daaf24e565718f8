//! Inventory domain events, published after the owning write commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiberstock_core::{AdjustmentId, Entity, InventoryCountId, ItemId, MovementId};
use fiberstock_events::Event;

use crate::adjustment::StockAdjustment;
use crate::item::{Item, StockStatus};
use crate::movement::{MovementType, StockMovement};

/// Event: StockMovementRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovementRecorded {
    pub movement_id: MovementId,
    pub item_id: ItemId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub stock_after: u32,
    pub reference_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl From<&StockMovement> for StockMovementRecorded {
    fn from(movement: &StockMovement) -> Self {
        Self {
            movement_id: movement.id,
            item_id: movement.item_id,
            movement_type: movement.movement_type,
            quantity: movement.quantity,
            stock_after: movement.stock_after,
            reference_number: movement.reference_number.clone(),
            occurred_at: movement.recorded_at,
        }
    }
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub adjustment_id: AdjustmentId,
    pub item_id: ItemId,
    pub previous_quantity: u32,
    pub new_quantity: u32,
    pub delta: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&StockAdjustment> for StockAdjusted {
    fn from(adjustment: &StockAdjustment) -> Self {
        Self {
            adjustment_id: adjustment.id,
            item_id: adjustment.item_id,
            previous_quantity: adjustment.previous_quantity,
            new_quantity: adjustment.new_quantity,
            delta: adjustment.adjustment_quantity,
            reason: adjustment.reason.clone(),
            occurred_at: adjustment.adjusted_at,
        }
    }
}

/// Stock level snapshot carried by the low/out-of-stock alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub item_id: ItemId,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub minimum_stock: u32,
    pub reorder_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

impl StockLevel {
    fn of(item: &Item, at: DateTime<Utc>) -> Self {
        Self {
            item_id: item.id(),
            name: item.name().to_string(),
            sku: item.sku().to_string(),
            quantity: item.quantity(),
            minimum_stock: item.minimum_stock(),
            reorder_quantity: item.reorder_quantity(),
            occurred_at: at,
        }
    }
}

/// Event: InventoryCountCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCountCompleted {
    pub count_id: InventoryCountId,
    pub count_reference: String,
    pub items_counted: usize,
    pub items_adjusted: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    StockMovementRecorded(StockMovementRecorded),
    StockAdjusted(StockAdjusted),
    LowStockDetected(StockLevel),
    OutOfStockDetected(StockLevel),
    InventoryCountCompleted(InventoryCountCompleted),
}

impl InventoryEvent {
    /// Alert for `item` if it sits at or below its minimum, `None` otherwise.
    pub fn stock_alert(item: &Item, at: DateTime<Utc>) -> Option<Self> {
        match item.stock_status() {
            StockStatus::OutOfStock => Some(Self::OutOfStockDetected(StockLevel::of(item, at))),
            StockStatus::LowStock => Some(Self::LowStockDetected(StockLevel::of(item, at))),
            StockStatus::Ok => None,
        }
    }

    /// The item this event concerns, if any.
    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            InventoryEvent::StockMovementRecorded(e) => Some(e.item_id),
            InventoryEvent::StockAdjusted(e) => Some(e.item_id),
            InventoryEvent::LowStockDetected(e) | InventoryEvent::OutOfStockDetected(e) => {
                Some(e.item_id)
            }
            InventoryEvent::InventoryCountCompleted(_) => None,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockMovementRecorded(_) => "inventory.movement.recorded",
            InventoryEvent::StockAdjusted(_) => "inventory.adjustment.recorded",
            InventoryEvent::LowStockDetected(_) => "inventory.item.low_stock",
            InventoryEvent::OutOfStockDetected(_) => "inventory.item.out_of_stock",
            InventoryEvent::InventoryCountCompleted(_) => "inventory.count.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::StockMovementRecorded(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::LowStockDetected(e) | InventoryEvent::OutOfStockDetected(e) => {
                e.occurred_at
            }
            InventoryEvent::InventoryCountCompleted(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::test_support::item_with_stock;

    #[test]
    fn stock_alert_follows_status() {
        let now = Utc::now();

        let empty = item_with_stock("Radio", 0, 2);
        assert!(matches!(
            InventoryEvent::stock_alert(&empty, now),
            Some(InventoryEvent::OutOfStockDetected(_))
        ));

        let low = item_with_stock("Radio", 2, 2);
        let alert = InventoryEvent::stock_alert(&low, now).unwrap();
        assert_eq!(alert.event_type(), "inventory.item.low_stock");
        assert_eq!(alert.item_id(), Some(low.id()));

        let fine = item_with_stock("Radio", 3, 2);
        assert!(InventoryEvent::stock_alert(&fine, now).is_none());
    }
}
