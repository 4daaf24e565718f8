use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fiberstock_core::{
    DomainError, DomainResult, Entity, ItemId, PurchaseOrderId, PurchaseOrderItemId, SupplierId,
    UserId,
};
use fiberstock_inventory::Company;

/// Purchase order status lifecycle.
///
/// `draft -> submitted -> approved -> ordered -> partially_received <-> fully_received`,
/// and any state before `ordered` may be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Submitted,
    Approved,
    Ordered,
    PartiallyReceived,
    FullyReceived,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn label(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "Draft",
            PurchaseOrderStatus::Submitted => "Submitted",
            PurchaseOrderStatus::Approved => "Approved",
            PurchaseOrderStatus::Ordered => "Ordered",
            PurchaseOrderStatus::PartiallyReceived => "Partially Received",
            PurchaseOrderStatus::FullyReceived => "Fully Received",
            PurchaseOrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Lines and header may change only while draft or submitted.
    pub fn is_editable(self) -> bool {
        matches!(self, PurchaseOrderStatus::Draft | PurchaseOrderStatus::Submitted)
    }

    /// Ordered but not yet fully received.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Ordered | PurchaseOrderStatus::PartiallyReceived
        )
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// A status transition, returned by every operation that moves the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: PurchaseOrderStatus,
    pub to: PurchaseOrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub order_number: String,
    pub supplier_id: SupplierId,
    /// `Wisp` or `Fno`; a purchase order belongs to exactly one business.
    pub company: Company,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: String,
    pub shipping_address: String,
    pub created_by: Option<UserId>,
}

/// Editable header fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderHeader {
    pub supplier_id: SupplierId,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: String,
    pub shipping_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLine {
    pub item_id: ItemId,
    pub quantity_ordered: u32,
    pub unit_price: Decimal,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub id: PurchaseOrderItemId,
    pub item_id: ItemId,
    pub quantity_ordered: u32,
    pub quantity_received: u32,
    pub unit_price: Decimal,
    /// `quantity_ordered * unit_price`.
    pub line_total: Decimal,
}

impl PurchaseOrderItem {
    pub fn remaining(&self) -> u32 {
        self.quantity_ordered - self.quantity_received
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received == self.quantity_ordered
    }
}

/// What a successful [`PurchaseOrder::receive_line`] did to the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReceipt {
    pub line_id: PurchaseOrderItemId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub status: StatusChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    order_number: String,
    supplier_id: SupplierId,
    status: PurchaseOrderStatus,
    company: Company,
    order_date: Option<NaiveDate>,
    expected_delivery_date: Option<NaiveDate>,
    actual_delivery_date: Option<NaiveDate>,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    created_by: Option<UserId>,
    approved_by: Option<UserId>,
    approved_at: Option<DateTime<Utc>>,
    notes: String,
    shipping_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    lines: Vec<PurchaseOrderItem>,
}

fn non_negative(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

fn validate_line(quantity_ordered: u32, unit_price: Decimal) -> DomainResult<()> {
    if quantity_ordered == 0 {
        return Err(DomainError::validation("quantity ordered must be positive"));
    }
    non_negative("unit price", unit_price)?;
    Ok(())
}

impl PurchaseOrder {
    pub fn new(id: PurchaseOrderId, new: NewPurchaseOrder, at: DateTime<Utc>) -> DomainResult<Self> {
        let order_number = new.order_number.trim().to_string();
        if order_number.is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        if new.company == Company::Both {
            return Err(DomainError::validation(
                "purchase orders belong to either WISP or FNO",
            ));
        }

        Ok(Self {
            id,
            order_number,
            supplier_id: new.supplier_id,
            status: PurchaseOrderStatus::Draft,
            company: new.company,
            order_date: None,
            expected_delivery_date: new.expected_delivery_date,
            actual_delivery_date: None,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ZERO,
            created_by: new.created_by,
            approved_by: None,
            approved_at: None,
            notes: new.notes,
            shipping_address: new.shipping_address,
            created_at: at,
            updated_at: at,
            lines: Vec::new(),
        })
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if !self.status.is_editable() {
            return Err(DomainError::not_editable(format!(
                "PO #{} is {} and can no longer be edited",
                self.order_number, self.status
            )));
        }
        Ok(())
    }

    /// Recompute `line_total`s, `subtotal` and `total`; runs inside every mutation.
    fn recompute(&mut self, at: DateTime<Utc>) {
        for line in &mut self.lines {
            line.line_total = Decimal::from(line.quantity_ordered) * line.unit_price;
        }
        self.subtotal = self.lines.iter().map(|line| line.line_total).sum();
        self.total = self.subtotal + self.tax + self.shipping;
        self.updated_at = at;
    }

    fn transition(&mut self, to: PurchaseOrderStatus, at: DateTime<Utc>) -> StatusChange {
        let change = StatusChange {
            from: self.status,
            to,
        };
        self.status = to;
        self.updated_at = at;
        change
    }

    fn wrong_state(&self, action: &str) -> DomainError {
        DomainError::invalid_transition(format!(
            "cannot {action} PO #{} while {}",
            self.order_number, self.status
        ))
    }

    pub fn edit_header(&mut self, header: PurchaseOrderHeader, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.supplier_id = header.supplier_id;
        self.expected_delivery_date = header.expected_delivery_date;
        self.notes = header.notes;
        self.shipping_address = header.shipping_address;
        self.recompute(at);
        Ok(())
    }

    pub fn set_charges(&mut self, tax: Decimal, shipping: Decimal, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.tax = non_negative("tax", tax)?;
        self.shipping = non_negative("shipping", shipping)?;
        self.recompute(at);
        Ok(())
    }

    pub fn add_line(&mut self, line: NewLine, at: DateTime<Utc>) -> DomainResult<PurchaseOrderItemId> {
        self.ensure_editable()?;
        validate_line(line.quantity_ordered, line.unit_price)?;

        let id = PurchaseOrderItemId::new();
        self.lines.push(PurchaseOrderItem {
            id,
            item_id: line.item_id,
            quantity_ordered: line.quantity_ordered,
            quantity_received: 0,
            unit_price: line.unit_price,
            line_total: Decimal::ZERO,
        });
        self.recompute(at);
        Ok(id)
    }

    pub fn update_line(
        &mut self,
        line_id: PurchaseOrderItemId,
        quantity_ordered: u32,
        unit_price: Decimal,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_editable()?;
        validate_line(quantity_ordered, unit_price)?;
        let line = self.line_mut(line_id)?;
        line.quantity_ordered = quantity_ordered;
        line.unit_price = unit_price;
        self.recompute(at);
        Ok(())
    }

    pub fn remove_line(&mut self, line_id: PurchaseOrderItemId, at: DateTime<Utc>) -> DomainResult<PurchaseOrderItem> {
        self.ensure_editable()?;
        let index = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or_else(|| self.missing_line(line_id))?;
        let removed = self.lines.remove(index);
        self.recompute(at);
        Ok(removed)
    }

    pub fn submit(&mut self, at: DateTime<Utc>) -> DomainResult<StatusChange> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(self.wrong_state("submit"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation(format!(
                "PO #{} has no lines",
                self.order_number
            )));
        }
        Ok(self.transition(PurchaseOrderStatus::Submitted, at))
    }

    pub fn approve(&mut self, approver: Option<UserId>, at: DateTime<Utc>) -> DomainResult<StatusChange> {
        if self.status != PurchaseOrderStatus::Submitted {
            return Err(self.wrong_state("approve"));
        }
        self.approved_by = approver;
        self.approved_at = Some(at);
        Ok(self.transition(PurchaseOrderStatus::Approved, at))
    }

    pub fn mark_ordered(&mut self, at: DateTime<Utc>) -> DomainResult<StatusChange> {
        if self.status != PurchaseOrderStatus::Approved {
            return Err(self.wrong_state("mark as ordered"));
        }
        self.order_date = Some(at.date_naive());
        Ok(self.transition(PurchaseOrderStatus::Ordered, at))
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<StatusChange> {
        match self.status {
            PurchaseOrderStatus::Draft
            | PurchaseOrderStatus::Submitted
            | PurchaseOrderStatus::Approved => Ok(self.transition(PurchaseOrderStatus::Cancelled, at)),
            _ => Err(self.wrong_state("cancel")),
        }
    }

    /// Receive `quantity` units against one line.
    ///
    /// Only the order side; the matching `in` movement is the caller's job.
    pub fn receive_line(
        &mut self,
        line_id: PurchaseOrderItemId,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> DomainResult<LineReceipt> {
        if !self.status.is_open() {
            return Err(self.wrong_state("receive items on"));
        }
        let line = self.line_mut(line_id)?;
        if quantity == 0 {
            return Err(DomainError::invalid_movement("received quantity must be positive"));
        }
        if quantity > line.remaining() {
            return Err(DomainError::invalid_movement(format!(
                "cannot receive {quantity}, only {} outstanding on this line",
                line.remaining()
            )));
        }
        line.quantity_received += quantity;
        let (item_id, unit_price) = (line.item_id, line.unit_price);

        let next = if self.lines.iter().all(PurchaseOrderItem::is_fully_received) {
            self.actual_delivery_date = Some(at.date_naive());
            PurchaseOrderStatus::FullyReceived
        } else {
            PurchaseOrderStatus::PartiallyReceived
        };
        let status = self.transition(next, at);

        Ok(LineReceipt {
            line_id,
            item_id,
            quantity,
            unit_price,
            status,
        })
    }

    fn missing_line(&self, line_id: PurchaseOrderItemId) -> DomainError {
        DomainError::not_found(format!("line {line_id} on PO #{}", self.order_number))
    }

    fn line_mut(&mut self, line_id: PurchaseOrderItemId) -> DomainResult<&mut PurchaseOrderItem> {
        let missing = self.missing_line(line_id);
        self.lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(missing)
    }

    pub fn line(&self, line_id: PurchaseOrderItemId) -> Option<&PurchaseOrderItem> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    pub fn lines(&self) -> &[PurchaseOrderItem] {
        &self.lines
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn company(&self) -> Company {
        self.company
    }

    pub fn order_date(&self) -> Option<NaiveDate> {
        self.order_date
    }

    pub fn expected_delivery_date(&self) -> Option<NaiveDate> {
        self.expected_delivery_date
    }

    pub fn actual_delivery_date(&self) -> Option<NaiveDate> {
        self.actual_delivery_date
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn shipping(&self) -> Decimal {
        self.shipping
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> PurchaseOrderId {
        self.id
    }

    fn kind() -> &'static str {
        "purchase order"
    }
}
