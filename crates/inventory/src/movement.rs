//! Stock movement records and the requests that produce them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fiberstock_core::{Entity, ItemId, LocationId, MovementId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Transfer,
    Return,
    Adjustment,
    Count,
}

impl MovementType {
    pub const ALL: [MovementType; 6] = [
        MovementType::In,
        MovementType::Out,
        MovementType::Transfer,
        MovementType::Return,
        MovementType::Adjustment,
        MovementType::Count,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MovementType::In => "Stock In",
            MovementType::Out => "Stock Out",
            MovementType::Transfer => "Transfer",
            MovementType::Return => "Return",
            MovementType::Adjustment => "Adjustment",
            MovementType::Count => "Stock Count",
        }
    }
}

/// A request to move stock, validated and applied by the ledger.
///
/// `quantity` is always a signed delta: positive for stock coming in, negative
/// for stock going out. Transfers carry the moved amount (positive) but do not
/// change the item total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub source_location: Option<LocationId>,
    pub destination_location: Option<LocationId>,
    pub reference_number: Option<String>,
    pub job_reference: Option<String>,
    pub notes: Option<String>,
    pub unit_price: Option<Decimal>,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl MovementRequest {
    fn base(movement_type: MovementType, quantity: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            movement_type,
            quantity,
            source_location: None,
            destination_location: None,
            reference_number: None,
            job_reference: None,
            notes: None,
            unit_price: None,
            performed_by: None,
            occurred_at,
        }
    }

    /// Goods arriving at `destination`.
    pub fn stock_in(quantity: u32, destination: LocationId, occurred_at: DateTime<Utc>) -> Self {
        let mut req = Self::base(MovementType::In, i64::from(quantity), occurred_at);
        req.destination_location = Some(destination);
        req
    }

    /// Goods leaving `source`; `quantity` is the (positive) amount issued.
    pub fn stock_out(quantity: u32, source: LocationId, occurred_at: DateTime<Utc>) -> Self {
        let mut req = Self::base(MovementType::Out, -i64::from(quantity), occurred_at);
        req.source_location = Some(source);
        req
    }

    pub fn transfer(
        quantity: u32,
        source: LocationId,
        destination: LocationId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let mut req = Self::base(MovementType::Transfer, i64::from(quantity), occurred_at);
        req.source_location = Some(source);
        req.destination_location = Some(destination);
        req
    }

    /// Goods coming back from the field (e.g. a cancelled install).
    pub fn stock_return(quantity: u32, occurred_at: DateTime<Utc>) -> Self {
        Self::base(MovementType::Return, i64::from(quantity), occurred_at)
    }

    /// Signed correction of the item total.
    pub fn adjustment(delta: i64, occurred_at: DateTime<Utc>) -> Self {
        Self::base(MovementType::Adjustment, delta, occurred_at)
    }

    /// Signed correction booked from a stock count.
    pub fn count(delta: i64, occurred_at: DateTime<Utc>) -> Self {
        Self::base(MovementType::Count, delta, occurred_at)
    }

    pub fn from_location(mut self, location: LocationId) -> Self {
        self.source_location = Some(location);
        self
    }

    pub fn to_location(mut self, location: LocationId) -> Self {
        self.destination_location = Some(location);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job_reference = Some(job.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_unit_price(mut self, price: Decimal) -> Self {
        self.unit_price = Some(price);
        self
    }

    pub fn performed_by(mut self, user: Option<UserId>) -> Self {
        self.performed_by = user;
        self
    }
}

/// "Set the stock to N" as entered on a form.
///
/// The ledger only accepts deltas, so callers translate absolute input with
/// [`AbsoluteQuantity::delta_from`] before building a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteQuantity(pub u32);

impl AbsoluteQuantity {
    pub fn delta_from(self, current: u32) -> i64 {
        i64::from(self.0) - i64::from(current)
    }
}

/// Immutable ledger entry. Created once by the ledger, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub item_id: ItemId,
    pub movement_type: MovementType,
    /// Signed amount as requested (transfers: the amount moved).
    pub quantity: i64,
    pub source_location: Option<LocationId>,
    pub destination_location: Option<LocationId>,
    pub reference_number: Option<String>,
    pub job_reference: Option<String>,
    pub notes: Option<String>,
    /// Item quantity immediately after this movement was applied.
    pub stock_after: u32,
    pub unit_price: Option<Decimal>,
    pub performed_by: Option<UserId>,
    pub recorded_at: DateTime<Utc>,
}

impl StockMovement {
    /// Effect on the item total. Zero for transfers.
    pub fn signed_delta(&self) -> i64 {
        match self.movement_type {
            MovementType::Transfer => 0,
            _ => self.quantity,
        }
    }
}

impl core::fmt::Display for StockMovement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}: {:+} ({})",
            self.item_id,
            self.quantity,
            self.movement_type.label()
        )
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.id
    }

    fn kind() -> &'static str {
        "stock movement"
    }
}
