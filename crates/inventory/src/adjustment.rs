//! Adjustment engine: force an item to a verified quantity.
//!
//! An adjustment is a pair of records, the [`StockAdjustment`] describing the
//! reconciliation and the `adjustment` movement carrying the signed delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiberstock_core::{AdjustmentId, DomainError, DomainResult, Entity, ItemId, LocationId, MovementId, UserId};

use crate::item::Item;
use crate::ledger;
use crate::movement::{AbsoluteQuantity, MovementRequest, StockMovement};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub new_quantity: u32,
    pub reason: String,
    pub notes: Option<String>,
    pub performed_by: Option<UserId>,
    /// Copied onto the paired movement's `reference_number`.
    pub reference: Option<String>,
    /// Where the stock was found; source for shrinkage, destination for gains.
    pub location: Option<LocationId>,
    pub occurred_at: DateTime<Utc>,
}

impl AdjustmentRequest {
    pub fn new(new_quantity: u32, reason: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            new_quantity,
            reason: reason.into(),
            notes: None,
            performed_by: None,
            reference: None,
            location: None,
            occurred_at,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn performed_by(mut self, user: Option<UserId>) -> Self {
        self.performed_by = user;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn at_location(mut self, location: Option<LocationId>) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub id: AdjustmentId,
    pub item_id: ItemId,
    pub previous_quantity: u32,
    pub new_quantity: u32,
    /// `new_quantity - previous_quantity`.
    pub adjustment_quantity: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub performed_by: Option<UserId>,
    pub movement_id: MovementId,
    pub adjusted_at: DateTime<Utc>,
}

impl Entity for StockAdjustment {
    type Id = AdjustmentId;

    fn id(&self) -> AdjustmentId {
        self.id
    }

    fn kind() -> &'static str {
        "stock adjustment"
    }
}

/// Output of [`adjust`]: both halves must be persisted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub adjustment: StockAdjustment,
    pub movement: StockMovement,
}

/// Set `item` to `request.new_quantity` through the ledger.
pub fn adjust(item: &mut Item, request: AdjustmentRequest) -> DomainResult<Adjustment> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("adjustment reason is required"));
    }

    let previous_quantity = item.quantity();
    let delta = AbsoluteQuantity(request.new_quantity).delta_from(previous_quantity);

    let mut movement_request = MovementRequest::adjustment(delta, request.occurred_at)
        .with_notes(reason)
        .performed_by(request.performed_by);
    if let Some(reference) = &request.reference {
        movement_request = movement_request.with_reference(reference.clone());
    }
    if let Some(location) = request.location {
        movement_request = if delta < 0 {
            movement_request.from_location(location)
        } else {
            movement_request.to_location(location)
        };
    }

    let movement = ledger::record_movement(item, movement_request)?;
    item.mark_counted(request.occurred_at.date_naive());

    let adjustment = StockAdjustment {
        id: AdjustmentId::new(),
        item_id: item.id(),
        previous_quantity,
        new_quantity: request.new_quantity,
        adjustment_quantity: delta,
        reason: reason.to_string(),
        notes: request.notes,
        performed_by: request.performed_by,
        movement_id: movement.id,
        adjusted_at: request.occurred_at,
    };

    Ok(Adjustment {
        adjustment,
        movement,
    })
}
