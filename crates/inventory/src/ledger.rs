//! Stock ledger: the sole writer of `Item::quantity`.
//!
//! Every change to an item's stock goes through [`record_movement`], which
//! applies a signed delta and returns the immutable ledger entry describing it.
//! Persisting the item and the entry together is the caller's transaction.

use fiberstock_core::{DomainError, DomainResult, Entity, MovementId};

use crate::item::Item;
use crate::movement::{MovementRequest, MovementType, StockMovement};

/// Apply a movement to `item` and return the ledger entry.
///
/// On error the item is left untouched.
pub fn record_movement(item: &mut Item, request: MovementRequest) -> DomainResult<StockMovement> {
    validate(&request)?;

    let current = item.quantity();
    let delta = match request.movement_type {
        MovementType::Transfer => 0,
        _ => request.quantity,
    };

    let next = i64::from(current) + delta;
    if next < 0 {
        return Err(DomainError::InsufficientStock {
            item: item.id(),
            available: current,
            requested: request.quantity.unsigned_abs(),
        });
    }
    let stock_after = u32::try_from(next).map_err(|_| {
        DomainError::invalid_movement(format!(
            "stock for item {} would exceed {}",
            item.id(),
            u32::MAX
        ))
    })?;

    item.set_quantity(stock_after);
    if request.movement_type == MovementType::In {
        item.mark_received(request.occurred_at.date_naive());
        if let Some(price) = request.unit_price {
            item.set_unit_price(price);
        }
    }
    item.save(request.occurred_at);

    Ok(StockMovement {
        id: MovementId::new(),
        item_id: item.id(),
        movement_type: request.movement_type,
        quantity: request.quantity,
        source_location: request.source_location,
        destination_location: request.destination_location,
        reference_number: request.reference_number,
        job_reference: request.job_reference,
        notes: request.notes,
        stock_after,
        unit_price: request.unit_price,
        performed_by: request.performed_by,
        recorded_at: request.occurred_at,
    })
}

fn validate(request: &MovementRequest) -> DomainResult<()> {
    let q = request.quantity;
    let source = request.source_location;
    let destination = request.destination_location;

    match request.movement_type {
        MovementType::In => {
            if q <= 0 {
                return Err(DomainError::invalid_movement(
                    "quantity must be positive for stock in",
                ));
            }
            if destination.is_none() {
                return Err(DomainError::invalid_movement(
                    "destination is required for stock in",
                ));
            }
        }
        MovementType::Out => {
            if q >= 0 {
                return Err(DomainError::invalid_movement(
                    "quantity must be negative for stock out",
                ));
            }
            if source.is_none() {
                return Err(DomainError::invalid_movement(
                    "source is required for stock out",
                ));
            }
        }
        MovementType::Transfer => {
            if q <= 0 {
                return Err(DomainError::invalid_movement(
                    "quantity must be positive for transfers",
                ));
            }
            match (source, destination) {
                (Some(from), Some(to)) if from == to => {
                    return Err(DomainError::invalid_movement(
                        "transfer source and destination must differ",
                    ));
                }
                (Some(_), Some(_)) => {}
                _ => {
                    return Err(DomainError::invalid_movement(
                        "source and destination are required for transfers",
                    ));
                }
            }
        }
        MovementType::Return => {
            if q <= 0 {
                return Err(DomainError::invalid_movement(
                    "quantity must be positive for returns",
                ));
            }
        }
        // A zero adjustment confirms the recorded quantity and is kept.
        MovementType::Adjustment => {}
        MovementType::Count => {
            if q == 0 {
                return Err(DomainError::invalid_movement(
                    "count correction cannot be zero",
                ));
            }
        }
    }

    if let Some(price) = request.unit_price {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(DomainError::invalid_movement("unit price cannot be negative"));
        }
    }

    Ok(())
}

/// Rebuild stock from a zero baseline by summing signed deltas in order.
///
/// Also checks that every entry's `stock_after` matches the running balance.
pub fn replay<'a, I>(movements: I) -> DomainResult<u32>
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    let mut balance: i64 = 0;
    for movement in movements {
        balance += movement.signed_delta();
        if balance < 0 {
            return Err(DomainError::ledger_mismatch(format!(
                "balance went negative at movement {}",
                movement.id
            )));
        }
        if balance != i64::from(movement.stock_after) {
            return Err(DomainError::ledger_mismatch(format!(
                "movement {} claims stock_after {} but the running balance is {}",
                movement.id, movement.stock_after, balance
            )));
        }
    }
    u32::try_from(balance)
        .map_err(|_| DomainError::ledger_mismatch(format!("balance {balance} out of range")))
}

/// Check that `movements` (oldest first) reconstruct the item's current stock.
pub fn reconcile<'a, I>(item: &Item, movements: I) -> DomainResult<()>
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    let rebuilt = replay(movements)?;
    if rebuilt != item.quantity() {
        return Err(DomainError::ledger_mismatch(format!(
            "item {} holds {} but its ledger sums to {}",
            item.id(),
            item.quantity(),
            rebuilt
        )));
    }
    Ok(())
}
