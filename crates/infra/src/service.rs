//! Operation boundary for the stock core.
//!
//! `StockService` is what request handlers call. Each mutating operation:
//!
//! ```text
//! 1. open a store transaction (write lock held, writers serialised)
//!   ↓
//! 2. load every record it touches
//!   ↓
//! 3. run pure domain logic (ledger, adjustment engine, PO and count workflows)
//!   ↓
//! 4. write every touched row; events go to the outbox
//!   ↓
//! 5. commit, or roll back everything on the first error
//!   ↓
//! 6. publish the outbox to the bus (fire-and-forget)
//! ```
//!
//! Publishing happens strictly after commit. A publish failure is logged and
//! never reported to the caller: the stock change it describes has happened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use fiberstock_core::{
    CategoryId, CountItemId, DomainError, DomainResult, Entity, ExpectedVersion, InventoryCountId,
    ItemId, LocationId, PurchaseOrderId, PurchaseOrderItemId, SupplierId, UserId,
};
use fiberstock_events::{Event, EventBus, EventEnvelope};
use fiberstock_inventory::{
    Adjustment, AdjustmentRequest, Category, Company, InventoryCount, InventoryCountCompleted,
    InventoryEvent, Item, ItemDetails, Location, MovementRequest, NewCategory, NewCount,
    NewItem, NewLocation, NewSupplier, StockAdjustment, StockMovement, Supplier, adjustment,
    ledger,
};
use fiberstock_purchasing::{
    NewLine, NewPurchaseOrder, PurchaseOrder, PurchaseOrderEvent, PurchaseOrderHeader,
    StatusChange,
};

use crate::config::StockConfig;
use crate::error::ServiceResult;
use crate::reports::{self, Dashboard, MovementReport, ValuationReport};
use crate::store::{StockStore, StockTx};

const ITEM_SUBJECT: &str = "inventory.item";
const ORDER_SUBJECT: &str = "purchasing.order";
const COUNT_SUBJECT: &str = "inventory.count";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementResult {
    pub item: Item,
    pub movement: StockMovement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentResult {
    pub item: Item,
    pub adjustment: StockAdjustment,
    pub movement: StockMovement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveResult {
    pub purchase_order: PurchaseOrder,
    pub item: Item,
    pub movement: StockMovement,
    pub status: StatusChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub count: InventoryCount,
    pub adjustments: Vec<Adjustment>,
    pub unchanged: Vec<ItemId>,
}

#[derive(Debug)]
struct PendingEvent {
    subject_id: Uuid,
    subject_type: &'static str,
    event_type: &'static str,
    event_version: u32,
    occurred_at: DateTime<Utc>,
    payload: JsonValue,
}

/// Events raised inside a transaction, published only after it commits.
#[derive(Debug)]
struct Outbox {
    pending: Vec<PendingEvent>,
    stock_alerts: bool,
}

impl Outbox {
    fn new(stock_alerts: bool) -> Self {
        Self {
            pending: Vec::new(),
            stock_alerts,
        }
    }

    fn record<E>(&mut self, subject_id: Uuid, subject_type: &'static str, event: &E) -> ServiceResult<()>
    where
        E: Event + Serialize,
    {
        self.pending.push(PendingEvent {
            subject_id,
            subject_type,
            event_type: event.event_type(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
        });
        Ok(())
    }

    fn movement(&mut self, movement: &StockMovement) -> ServiceResult<()> {
        let event = InventoryEvent::StockMovementRecorded(movement.into());
        self.record(*movement.item_id.as_uuid(), ITEM_SUBJECT, &event)
    }

    fn adjustment(&mut self, adjustment: &StockAdjustment) -> ServiceResult<()> {
        let event = InventoryEvent::StockAdjusted(adjustment.into());
        self.record(*adjustment.item_id.as_uuid(), ITEM_SUBJECT, &event)
    }

    /// Low/out-of-stock alert if the item ends the write at or below its minimum.
    fn stock_level(&mut self, item: &Item, at: DateTime<Utc>) -> ServiceResult<()> {
        if !self.stock_alerts || !item.is_active() {
            return Ok(());
        }
        match InventoryEvent::stock_alert(item, at) {
            Some(alert) => self.record(*item.id().as_uuid(), ITEM_SUBJECT, &alert),
            None => Ok(()),
        }
    }

    fn purchasing(&mut self, event: &PurchaseOrderEvent) -> ServiceResult<()> {
        self.record(*event.order_id().as_uuid(), ORDER_SUBJECT, event)
    }
}

fn active_location(tx: &dyn StockTx, id: LocationId) -> DomainResult<Location> {
    let location = tx.location(id)?;
    if !location.is_active {
        return Err(DomainError::invalid_movement(format!(
            "location {} is inactive",
            location.name
        )));
    }
    Ok(location)
}

fn check_item_references(tx: &dyn StockTx, details: &ItemDetails) -> DomainResult<()> {
    if let Some(category) = details.category_id {
        tx.category(category)?;
    }
    if let Some(location) = details.location_id {
        tx.location(location)?;
    }
    if let Some(supplier) = details.supplier_id {
        tx.supplier(supplier)?;
    }
    Ok(())
}

/// Load, move, write back, append. The one path every stock change takes.
fn apply_movement(
    tx: &mut dyn StockTx,
    outbox: &mut Outbox,
    item_id: ItemId,
    request: MovementRequest,
) -> ServiceResult<MovementResult> {
    let mut item = tx.item(item_id)?;
    let version = tx.item_version(item_id)?;
    let at = request.occurred_at;

    let movement = ledger::record_movement(&mut item, request)?;
    tx.put_item(item.clone(), ExpectedVersion::Exact(version))?;
    tx.append_movement(movement.clone());

    outbox.movement(&movement)?;
    outbox.stock_level(&item, at)?;
    Ok(MovementResult { item, movement })
}

/// Application service over a transactional store and an event bus.
#[derive(Debug)]
pub struct StockService<S, B> {
    store: S,
    bus: B,
    config: StockConfig,
    sequence: AtomicU64,
}

impl<S, B> StockService<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self::with_config(store, bus, StockConfig::default())
    }

    pub fn with_config(store: S, bus: B, config: StockConfig) -> Self {
        Self {
            store,
            bus,
            config,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &StockConfig {
        &self.config
    }
}

impl<S, B> StockService<S, B>
where
    S: StockStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn execute<T, F>(&self, work: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut dyn StockTx, &mut Outbox) -> ServiceResult<T>,
    {
        let stock_alerts = self.config.low_stock_alerts;
        let (value, outbox) = self
            .store
            .transaction(|tx| {
                let mut outbox = Outbox::new(stock_alerts);
                let value = work(tx, &mut outbox)?;
                Ok((value, outbox))
            })
            .inspect_err(|err| match err.domain() {
                Some(rejection) => debug!(error = %rejection, "operation rejected, rolled back"),
                None => warn!(error = %err, "operation failed, rolled back"),
            })?;
        debug!(events = outbox.pending.len(), "transaction committed");
        self.publish(outbox);
        Ok(value)
    }

    fn publish(&self, outbox: Outbox) {
        for pending in outbox.pending {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let event_type = pending.event_type;
            let envelope = EventEnvelope::new(
                pending.subject_id,
                pending.subject_type,
                pending.event_type,
                pending.event_version,
                pending.occurred_at,
                sequence,
                pending.payload,
            );
            if let Err(err) = self.bus.publish(envelope) {
                warn!(event_type, sequence, error = ?err, "event publish failed");
            }
        }
    }

    fn read<T, F>(&self, view: F) -> ServiceResult<T>
    where
        F: FnOnce(&dyn StockTx) -> ServiceResult<T>,
    {
        self.store.read(view)
    }

    // --- reference data ---------------------------------------------------

    #[instrument(skip_all, fields(name = %new.name))]
    pub fn create_category(&self, new: NewCategory) -> ServiceResult<Category> {
        let category = self.execute(|tx, _| {
            if let Some(parent) = new.parent_id {
                tx.category(parent)?;
            }
            let category = Category::new(CategoryId::new(), new)?;
            tx.insert_category(category.clone())?;
            Ok(category)
        })?;
        info!(category = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip_all, fields(name = %new.name))]
    pub fn create_location(&self, new: NewLocation) -> ServiceResult<Location> {
        let location = self.execute(|tx, _| {
            let location = Location::new(LocationId::new(), new)?;
            tx.insert_location(location.clone())?;
            Ok(location)
        })?;
        info!(location = %location.id, "location created");
        Ok(location)
    }

    #[instrument(skip_all, fields(name = %new.name))]
    pub fn create_supplier(&self, new: NewSupplier) -> ServiceResult<Supplier> {
        let supplier = self.execute(|tx, _| {
            let supplier = Supplier::new(SupplierId::new(), new)?;
            tx.insert_supplier(supplier.clone())?;
            Ok(supplier)
        })?;
        info!(supplier = %supplier.id, "supplier created");
        Ok(supplier)
    }

    /// Retire a location. It stays on record but can no longer send or
    /// receive stock.
    #[instrument(skip_all, fields(location = %id))]
    pub fn deactivate_location(&self, id: LocationId) -> ServiceResult<Location> {
        let location = self.execute(|tx, _| {
            let mut location = tx.location(id)?;
            location.deactivate();
            tx.put_location(location.clone())?;
            Ok(location)
        })?;
        info!(name = %location.name, "location deactivated");
        Ok(location)
    }

    // --- item registry ----------------------------------------------------

    /// Register an item. Opening stock is booked as an `in` movement to the
    /// item's location, so the ledger still starts from zero.
    #[instrument(skip_all, fields(name = %new.details.name, opening = new.opening_quantity))]
    pub fn create_item(&self, new: NewItem, performed_by: Option<UserId>) -> ServiceResult<Item> {
        let item = self.execute(|tx, outbox| {
            check_item_references(tx, &new.details)?;
            let now = Utc::now();
            let item = Item::create(ItemId::new(), new.details, now)?;
            tx.insert_item(item.clone())?;

            if new.opening_quantity == 0 {
                return Ok(item);
            }
            let location = item.location_id().ok_or_else(|| {
                DomainError::invalid_movement("opening stock needs a storage location")
            })?;
            active_location(tx, location)?;
            let request = MovementRequest::stock_in(new.opening_quantity, location, now)
                .with_notes("Opening stock")
                .performed_by(performed_by);
            Ok(apply_movement(tx, outbox, item.id(), request)?.item)
        })?;
        info!(item = %item.id(), quantity = item.quantity(), "item created");
        Ok(item)
    }

    /// Edit descriptive fields and thresholds. Quantity is not editable here.
    #[instrument(skip_all, fields(item = %item_id))]
    pub fn update_item(
        &self,
        item_id: ItemId,
        details: ItemDetails,
        expected: ExpectedVersion,
    ) -> ServiceResult<Item> {
        self.execute(|tx, outbox| {
            check_item_references(tx, &details)?;
            let now = Utc::now();
            let mut item = tx.item(item_id)?;
            item.update(details, now)?;
            tx.put_item(item.clone(), expected)?;
            outbox.stock_level(&item, now)?;
            Ok(item)
        })
    }

    /// Retire an item. Its ledger is kept; it drops out of stock reports and
    /// no longer raises stock alerts.
    #[instrument(skip_all, fields(item = %item_id))]
    pub fn deactivate_item(&self, item_id: ItemId, expected: ExpectedVersion) -> ServiceResult<Item> {
        let item = self.execute(|tx, _| {
            let mut item = tx.item(item_id)?;
            item.deactivate(Utc::now());
            tx.put_item(item.clone(), expected)?;
            Ok(item)
        })?;
        info!(name = %item.name(), "item deactivated");
        Ok(item)
    }

    // --- stock ledger -----------------------------------------------------

    #[instrument(skip_all, fields(item = %item_id, kind = request.movement_type.label(), quantity = request.quantity))]
    pub fn record_movement(
        &self,
        item_id: ItemId,
        request: MovementRequest,
    ) -> ServiceResult<MovementResult> {
        let result = self.execute(|tx, outbox| {
            for location in [request.source_location, request.destination_location]
                .into_iter()
                .flatten()
            {
                active_location(tx, location)?;
            }
            apply_movement(tx, outbox, item_id, request)
        })?;
        info!(movement = %result.movement.id, stock_after = result.movement.stock_after, "movement recorded");
        Ok(result)
    }

    #[instrument(skip_all, fields(item = %item_id, new_quantity = request.new_quantity))]
    pub fn adjust(
        &self,
        item_id: ItemId,
        request: AdjustmentRequest,
    ) -> ServiceResult<AdjustmentResult> {
        let result = self.execute(|tx, outbox| {
            if let Some(location) = request.location {
                active_location(tx, location)?;
            }
            let mut item = tx.item(item_id)?;
            let version = tx.item_version(item_id)?;
            let at = request.occurred_at;

            let Adjustment {
                adjustment,
                movement,
            } = adjustment::adjust(&mut item, request)?;
            tx.put_item(item.clone(), ExpectedVersion::Exact(version))?;
            tx.append_movement(movement.clone());
            tx.append_adjustment(adjustment.clone());

            outbox.adjustment(&adjustment)?;
            outbox.movement(&movement)?;
            outbox.stock_level(&item, at)?;
            Ok(AdjustmentResult {
                item,
                adjustment,
                movement,
            })
        })?;
        info!(
            previous = result.adjustment.previous_quantity,
            delta = result.adjustment.adjustment_quantity,
            "stock adjusted"
        );
        Ok(result)
    }

    // --- purchase orders --------------------------------------------------

    #[instrument(skip_all, fields(order_number = %new.order_number))]
    pub fn create_purchase_order(&self, new: NewPurchaseOrder) -> ServiceResult<PurchaseOrder> {
        let order = self.execute(|tx, _| {
            tx.supplier(new.supplier_id)?;
            let order = PurchaseOrder::new(PurchaseOrderId::new(), new, Utc::now())?;
            tx.insert_purchase_order(order.clone())?;
            Ok(order)
        })?;
        info!(order = %order.id(), "purchase order created");
        Ok(order)
    }

    /// Load an order, apply `change`, write it back, and announce any status move.
    fn modify_order<F>(&self, id: PurchaseOrderId, change: F) -> ServiceResult<PurchaseOrder>
    where
        F: FnOnce(&dyn StockTx, &mut PurchaseOrder, DateTime<Utc>) -> DomainResult<Option<StatusChange>>,
    {
        let (order, moved) = self.execute(|tx, outbox| {
            let mut order = tx.purchase_order(id)?;
            let now = Utc::now();
            let moved = change(&*tx, &mut order, now)?;
            tx.put_purchase_order(order.clone())?;
            if let Some(status) = moved {
                outbox.purchasing(&PurchaseOrderEvent::status_changed(&order, status, now))?;
            }
            Ok((order, moved))
        })?;
        if let Some(status) = moved {
            info!(order = %order.order_number(), from = %status.from, to = %status.to, "purchase order status changed");
        }
        Ok(order)
    }

    #[instrument(skip_all, fields(order = %id))]
    pub fn edit_purchase_order(
        &self,
        id: PurchaseOrderId,
        header: PurchaseOrderHeader,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |tx, order, now| {
            tx.supplier(header.supplier_id)?;
            order.edit_header(header, now)?;
            Ok(None)
        })
    }

    #[instrument(skip_all, fields(order = %id))]
    pub fn set_purchase_order_charges(
        &self,
        id: PurchaseOrderId,
        tax: Decimal,
        shipping: Decimal,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| {
            order.set_charges(tax, shipping, now)?;
            Ok(None)
        })
    }

    #[instrument(skip_all, fields(order = %id, item = %line.item_id))]
    pub fn add_po_line(&self, id: PurchaseOrderId, line: NewLine) -> ServiceResult<PurchaseOrderItemId> {
        self.execute(|tx, _| {
            tx.item(line.item_id)?;
            let mut order = tx.purchase_order(id)?;
            let line_id = order.add_line(line, Utc::now())?;
            tx.put_purchase_order(order)?;
            Ok(line_id)
        })
    }

    #[instrument(skip_all, fields(order = %id, line = %line_id))]
    pub fn update_po_line(
        &self,
        id: PurchaseOrderId,
        line_id: PurchaseOrderItemId,
        quantity_ordered: u32,
        unit_price: Decimal,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| {
            order.update_line(line_id, quantity_ordered, unit_price, now)?;
            Ok(None)
        })
    }

    #[instrument(skip_all, fields(order = %id, line = %line_id))]
    pub fn remove_po_line(
        &self,
        id: PurchaseOrderId,
        line_id: PurchaseOrderItemId,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| {
            order.remove_line(line_id, now)?;
            Ok(None)
        })
    }

    #[instrument(skip_all, fields(order = %id))]
    pub fn submit_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| order.submit(now).map(Some))
    }

    #[instrument(skip_all, fields(order = %id))]
    pub fn approve_purchase_order(
        &self,
        id: PurchaseOrderId,
        approver: Option<UserId>,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| order.approve(approver, now).map(Some))
    }

    #[instrument(skip_all, fields(order = %id))]
    pub fn mark_purchase_order_ordered(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| order.mark_ordered(now).map(Some))
    }

    #[instrument(skip_all, fields(order = %id))]
    pub fn cancel_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.modify_order(id, |_, order, now| order.cancel(now).map(Some))
    }

    /// Receive goods against one PO line: line, order status and the item's
    /// `in` movement are committed together.
    #[instrument(skip_all, fields(line = %line_id, quantity = quantity))]
    pub fn receive_po_item(
        &self,
        line_id: PurchaseOrderItemId,
        quantity: u32,
        location_id: LocationId,
        performed_by: Option<UserId>,
    ) -> ServiceResult<ReceiveResult> {
        let result = self.execute(|tx, outbox| {
            let mut order = tx.purchase_order_for_line(line_id)?;
            active_location(tx, location_id)?;
            let now = Utc::now();

            let receipt = order.receive_line(line_id, quantity, now)?;
            let request = MovementRequest::stock_in(quantity, location_id, now)
                .with_reference(format!("PO #{}", order.order_number()))
                .with_unit_price(receipt.unit_price)
                .performed_by(performed_by);

            let mut item = tx.item(receipt.item_id)?;
            let version = tx.item_version(receipt.item_id)?;
            let movement = ledger::record_movement(&mut item, request)?;
            item.note_ordered(order.order_date().unwrap_or_else(|| now.date_naive()));
            tx.put_item(item.clone(), ExpectedVersion::Exact(version))?;
            tx.append_movement(movement.clone());
            tx.put_purchase_order(order.clone())?;

            outbox.movement(&movement)?;
            outbox.stock_level(&item, now)?;
            for event in PurchaseOrderEvent::received(&order, &receipt, now) {
                outbox.purchasing(&event)?;
            }
            Ok(ReceiveResult {
                purchase_order: order,
                item,
                movement,
                status: receipt.status,
            })
        })?;
        info!(
            order = %result.purchase_order.order_number(),
            status = %result.status.to,
            stock_after = result.movement.stock_after,
            "goods received"
        );
        Ok(result)
    }

    // --- inventory counts -------------------------------------------------

    /// Start a count. Without a reference one is generated as `<prefix>-<n>`.
    #[instrument(skip_all)]
    pub fn create_count(&self, new: NewCount) -> ServiceResult<InventoryCount> {
        let prefix = self.config.count_reference_prefix.clone();
        let count = self.execute(|tx, _| {
            if let Some(location) = new.location_id {
                tx.location(location)?;
            }
            let reference = match new.count_reference.as_deref().map(str::trim) {
                Some(reference) if !reference.is_empty() => reference.to_string(),
                _ => loop {
                    // Hand-entered references may already occupy sequence values.
                    let candidate = format!("{prefix}-{}", tx.next_count_number());
                    if !tx.count_reference_in_use(&candidate) {
                        break candidate;
                    }
                },
            };
            let count = InventoryCount::new(InventoryCountId::new(), reference, new, Utc::now())?;
            tx.insert_count(count.clone())?;
            Ok(count)
        })?;
        info!(count = %count.count_reference(), "inventory count started");
        Ok(count)
    }

    #[instrument(skip_all, fields(count = %count_id, item = %item_id))]
    pub fn add_count_item(&self, count_id: InventoryCountId, item_id: ItemId) -> ServiceResult<CountItemId> {
        self.execute(|tx, _| {
            let mut count = tx.count(count_id)?;
            let item = tx.item(item_id)?;
            let line = count.add_item(&item)?;
            tx.put_count(count)?;
            Ok(line)
        })
    }

    #[instrument(skip_all, fields(count = %count_id, line = %line_id, counted = counted))]
    pub fn record_count(
        &self,
        count_id: InventoryCountId,
        line_id: CountItemId,
        counted: u32,
        counted_by: Option<UserId>,
        notes: Option<String>,
    ) -> ServiceResult<InventoryCount> {
        let count = self.execute(|tx, _| {
            let mut count = tx.count(count_id)?;
            count.record_count(line_id, counted, counted_by, notes, Utc::now())?;
            tx.put_count(count.clone())?;
            Ok(count)
        })?;
        let (done, total) = count.progress();
        debug!(done, total, "count line recorded");
        Ok(count)
    }

    #[instrument(skip_all, fields(count = %count_id))]
    pub fn cancel_count(&self, count_id: InventoryCountId) -> ServiceResult<InventoryCount> {
        self.execute(|tx, _| {
            let mut count = tx.count(count_id)?;
            count.cancel()?;
            tx.put_count(count.clone())?;
            Ok(count)
        })
    }

    /// Complete a count: every discrepant item is adjusted and the count is
    /// closed in one transaction, or nothing changes.
    #[instrument(skip_all, fields(count = %count_id))]
    pub fn complete_count(
        &self,
        count_id: InventoryCountId,
        completed_by: Option<UserId>,
    ) -> ServiceResult<CompletionResult> {
        let result = self.execute(|tx, outbox| {
            let mut count = tx.count(count_id)?;
            let mut items = HashMap::new();
            let mut versions = HashMap::new();
            for item_id in count.item_ids() {
                items.insert(item_id, tx.item(item_id)?);
                versions.insert(item_id, tx.item_version(item_id)?);
            }

            let now = Utc::now();
            let completion = count.complete(&mut items, completed_by, now)?;

            for (item_id, item) in &items {
                let expected = versions
                    .get(item_id)
                    .copied()
                    .map_or(ExpectedVersion::Any, ExpectedVersion::Exact);
                tx.put_item(item.clone(), expected)?;
            }
            for Adjustment { adjustment, movement } in &completion.adjustments {
                tx.append_movement(movement.clone());
                tx.append_adjustment(adjustment.clone());
                outbox.adjustment(adjustment)?;
                outbox.movement(movement)?;
                if let Some(item) = items.get(&adjustment.item_id) {
                    outbox.stock_level(item, now)?;
                }
            }
            tx.put_count(count.clone())?;

            let completed = InventoryEvent::InventoryCountCompleted(InventoryCountCompleted {
                count_id,
                count_reference: count.count_reference().to_string(),
                items_counted: count.lines().len(),
                items_adjusted: completion.adjustments.len(),
                occurred_at: now,
            });
            outbox.record(*count_id.as_uuid(), COUNT_SUBJECT, &completed)?;

            Ok(CompletionResult {
                count,
                adjustments: completion.adjustments,
                unchanged: completion.unchanged,
            })
        })?;
        info!(
            count = %result.count.count_reference(),
            adjusted = result.adjustments.len(),
            unchanged = result.unchanged.len(),
            "inventory count completed"
        );
        Ok(result)
    }

    // --- reads ------------------------------------------------------------

    pub fn item(&self, id: ItemId) -> ServiceResult<Item> {
        self.read(|tx| Ok(tx.item(id)?))
    }

    /// Current write version of an item row, for `update_item`.
    pub fn item_version(&self, id: ItemId) -> ServiceResult<u64> {
        self.read(|tx| Ok(tx.item_version(id)?))
    }

    pub fn items(&self) -> ServiceResult<Vec<Item>> {
        self.read(|tx| Ok(tx.items()))
    }

    pub fn category(&self, id: CategoryId) -> ServiceResult<Category> {
        self.read(|tx| Ok(tx.category(id)?))
    }

    pub fn location(&self, id: LocationId) -> ServiceResult<Location> {
        self.read(|tx| Ok(tx.location(id)?))
    }

    pub fn supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        self.read(|tx| Ok(tx.supplier(id)?))
    }

    /// Ledger entries for one item, oldest first.
    pub fn movements_for(&self, id: ItemId) -> ServiceResult<Vec<StockMovement>> {
        self.read(|tx| {
            tx.item(id)?;
            Ok(tx.movements_for(id))
        })
    }

    pub fn adjustments_for(&self, id: ItemId) -> ServiceResult<Vec<StockAdjustment>> {
        self.read(|tx| {
            tx.item(id)?;
            Ok(tx.adjustments_for(id))
        })
    }

    pub fn purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.read(|tx| Ok(tx.purchase_order(id)?))
    }

    pub fn count(&self, id: InventoryCountId) -> ServiceResult<InventoryCount> {
        self.read(|tx| Ok(tx.count(id)?))
    }

    /// Active items with `0 < quantity <= minimum_stock`.
    pub fn low_stock_items(&self) -> ServiceResult<Vec<Item>> {
        self.read(|tx| Ok(reports::low_stock(&tx.items())))
    }

    /// Active items with nothing on hand.
    pub fn out_of_stock_items(&self) -> ServiceResult<Vec<Item>> {
        self.read(|tx| Ok(reports::out_of_stock(&tx.items())))
    }

    /// Check that every item's ledger rebuilds its current quantity from zero.
    /// Returns the number of items checked.
    pub fn verify_ledger(&self) -> ServiceResult<usize> {
        self.read(|tx| {
            let items = tx.items();
            for item in &items {
                ledger::reconcile(item, &tx.movements_for(item.id()))?;
            }
            Ok(items.len())
        })
    }

    // --- reports ----------------------------------------------------------

    pub fn dashboard(&self) -> ServiceResult<Dashboard> {
        self.read(|tx| Ok(reports::dashboard(tx)))
    }

    pub fn valuation_report(&self) -> ServiceResult<ValuationReport> {
        self.read(|tx| Ok(reports::valuation(tx)))
    }

    pub fn movement_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        company: Option<Company>,
    ) -> ServiceResult<MovementReport> {
        self.read(|tx| Ok(reports::movements(tx, from, to, company)))
    }
}
