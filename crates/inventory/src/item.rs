//! Item registry: the canonical record of a stock-keeping unit.
//!
//! `Item` exposes its stock level read-only. The only code path that changes
//! `quantity` is [`crate::ledger::record_movement`]; everything else in the
//! system sees items as a projection of the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fiberstock_core::{CategoryId, DomainError, DomainResult, Entity, ItemId, LocationId, SupplierId};

use crate::catalog::Company;

/// Physical condition of the stock on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    New,
    Used,
    Refurbished,
    Damaged,
    Broken,
}

/// Tri-state stock level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    Ok,
}

impl StockStatus {
    pub fn label(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::Ok => "OK",
        }
    }
}

/// Everything about an item that a form may edit. Stock level is not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItemDetails {
    pub name: String,
    pub description: String,
    pub sku: String,
    pub category_id: Option<CategoryId>,
    pub company: Company,
    pub minimum_stock: u32,
    pub reorder_quantity: u32,
    pub location_id: Option<LocationId>,
    pub condition: Condition,
    pub unit_price: Option<Decimal>,
    pub supplier_id: Option<SupplierId>,
    pub supplier_part_number: String,
    pub notes: String,
    /// Comma-separated tags.
    pub tags: String,
}

impl ItemDetails {
    fn validated(mut self) -> DomainResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        self.sku = self.sku.trim().to_string();
        if let Some(price) = self.unit_price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(DomainError::validation(format!(
                    "unit price cannot be negative (got {price})"
                )));
            }
        }
        Ok(self)
    }
}

/// Input for registering a new item.
///
/// `opening_quantity` is not written onto the item directly: it is booked as
/// an `in` movement so the ledger still accounts for every unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NewItem {
    pub details: ItemDetails,
    pub opening_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    id: ItemId,
    details: ItemDetails,
    quantity: u32,
    total_value: Option<Decimal>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_ordered_date: Option<NaiveDate>,
    last_received_date: Option<NaiveDate>,
    last_counted_date: Option<NaiveDate>,
}

impl Item {
    /// Register an item with zero stock.
    pub fn create(id: ItemId, details: ItemDetails, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut item = Self {
            id,
            details: details.validated()?,
            quantity: 0,
            total_value: None,
            is_active: true,
            created_at: at,
            updated_at: at,
            last_ordered_date: None,
            last_received_date: None,
            last_counted_date: None,
        };
        item.recompute_value();
        Ok(item)
    }

    /// Replace the editable details (name, thresholds, price, ...).
    pub fn update(&mut self, details: ItemDetails, at: DateTime<Utc>) -> DomainResult<()> {
        self.details = details.validated()?;
        self.save(at);
        Ok(())
    }

    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.is_active = false;
        self.save(at);
    }

    /// Recompute derived fields and stamp the modification time.
    ///
    /// Idempotent: saving twice yields the same `total_value`.
    pub fn save(&mut self, at: DateTime<Utc>) {
        self.recompute_value();
        self.updated_at = at;
    }

    /// `0 < quantity <= minimum_stock`. An empty shelf is out of stock, not low.
    pub fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.quantity <= self.details.minimum_stock
    }

    pub fn stock_status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::OutOfStock
        } else if self.is_low_stock() {
            StockStatus::LowStock
        } else {
            StockStatus::Ok
        }
    }

    pub fn tags(&self) -> Vec<&str> {
        self.details
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Remember when stock for this item was first ordered.
    pub fn note_ordered(&mut self, on: NaiveDate) {
        if self.last_ordered_date.is_none() {
            self.last_ordered_date = Some(on);
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn details(&self) -> &ItemDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn sku(&self) -> &str {
        &self.details.sku
    }

    pub fn company(&self) -> Company {
        self.details.company
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.details.category_id
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.details.location_id
    }

    pub fn minimum_stock(&self) -> u32 {
        self.details.minimum_stock
    }

    pub fn reorder_quantity(&self) -> u32 {
        self.details.reorder_quantity
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        self.details.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn total_value(&self) -> Option<Decimal> {
        self.total_value
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_ordered_date(&self) -> Option<NaiveDate> {
        self.last_ordered_date
    }

    pub fn last_received_date(&self) -> Option<NaiveDate> {
        self.last_received_date
    }

    pub fn last_counted_date(&self) -> Option<NaiveDate> {
        self.last_counted_date
    }

    // Ledger-only mutators.

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.recompute_value();
    }

    pub(crate) fn set_unit_price(&mut self, price: Decimal) {
        self.details.unit_price = Some(price);
        self.recompute_value();
    }

    pub(crate) fn mark_received(&mut self, on: NaiveDate) {
        self.last_received_date = Some(on);
    }

    pub(crate) fn mark_counted(&mut self, on: NaiveDate) {
        self.last_counted_date = Some(on);
    }

    fn recompute_value(&mut self) {
        self.total_value = self
            .details
            .unit_price
            .map(|price| price * Decimal::from(self.quantity));
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn kind() -> &'static str {
        "item"
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn details(name: &str, minimum_stock: u32) -> ItemDetails {
        ItemDetails {
            name: name.to_string(),
            sku: format!("SKU-{}", name.to_uppercase().replace(' ', "-")),
            company: Company::Fno,
            minimum_stock,
            reorder_quantity: minimum_stock * 2,
            ..ItemDetails::default()
        }
    }

    /// Item with stock already on hand (bypasses the ledger; tests only).
    pub fn item_with_stock(name: &str, quantity: u32, minimum_stock: u32) -> Item {
        let mut item = Item::create(ItemId::new(), details(name, minimum_stock), Utc::now()).unwrap();
        item.set_quantity(quantity);
        item
    }
}
