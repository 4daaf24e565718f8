use std::sync::Arc;

use fiberstock_core::{
    CategoryId, DomainResult, ExpectedVersion, InventoryCountId, ItemId, LocationId,
    PurchaseOrderId, PurchaseOrderItemId, SupplierId,
};
use fiberstock_inventory::{
    Category, InventoryCount, Item, Location, StockAdjustment, StockMovement, Supplier,
};
use fiberstock_purchasing::PurchaseOrder;

use crate::error::ServiceError;

/// Row-level access to the stock tables inside one transaction.
///
/// Lookups fail with `DomainError::NotFound`; inserts that collide with an
/// existing key or unique column fail with `DomainError::Conflict`.
/// Movements and adjustments are append-only: there is no update or delete.
pub trait StockTx {
    fn category(&self, id: CategoryId) -> DomainResult<Category>;
    fn categories(&self) -> Vec<Category>;
    fn insert_category(&mut self, category: Category) -> DomainResult<()>;

    fn location(&self, id: LocationId) -> DomainResult<Location>;
    fn insert_location(&mut self, location: Location) -> DomainResult<()>;
    fn put_location(&mut self, location: Location) -> DomainResult<()>;

    fn supplier(&self, id: SupplierId) -> DomainResult<Supplier>;
    fn insert_supplier(&mut self, supplier: Supplier) -> DomainResult<()>;

    fn item(&self, id: ItemId) -> DomainResult<Item>;
    /// Write version of the item row, bumped on every `put_item`.
    fn item_version(&self, id: ItemId) -> DomainResult<u64>;
    fn items(&self) -> Vec<Item>;
    fn insert_item(&mut self, item: Item) -> DomainResult<()>;
    /// Replace an item row; `expected` is checked against the stored version.
    fn put_item(&mut self, item: Item, expected: ExpectedVersion) -> DomainResult<u64>;

    fn append_movement(&mut self, movement: StockMovement);
    /// Movements for one item, oldest first.
    fn movements_for(&self, item: ItemId) -> Vec<StockMovement>;
    /// Every movement, oldest first.
    fn movements(&self) -> Vec<StockMovement>;

    fn append_adjustment(&mut self, adjustment: StockAdjustment);
    fn adjustments_for(&self, item: ItemId) -> Vec<StockAdjustment>;

    fn purchase_order(&self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder>;
    fn purchase_order_for_line(&self, line: PurchaseOrderItemId) -> DomainResult<PurchaseOrder>;
    fn purchase_orders(&self) -> Vec<PurchaseOrder>;
    /// Fails with `Conflict` if the order number is taken.
    fn insert_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()>;
    fn put_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()>;

    fn count(&self, id: InventoryCountId) -> DomainResult<InventoryCount>;
    /// Fails with `Conflict` if the count reference is taken.
    fn insert_count(&mut self, count: InventoryCount) -> DomainResult<()>;
    fn put_count(&mut self, count: InventoryCount) -> DomainResult<()>;
    fn count_reference_in_use(&self, reference: &str) -> bool;
    /// Next value of the count-reference sequence (1, 2, 3, ...).
    fn next_count_number(&mut self) -> u64;
}

/// Transactional stock storage.
///
/// `transaction` runs `work` against a private view of the tables while
/// holding the store's write lock, so writers are serialised (pessimistic
/// locking). The view is committed only if `work` returns `Ok`; any error
/// discards every change it made.
pub trait StockStore: Send + Sync {
    fn transaction<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut dyn StockTx) -> Result<T, ServiceError>;

    /// Run a read-only view against committed state.
    fn read<T, F>(&self, view: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&dyn StockTx) -> Result<T, ServiceError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore,
{
    fn transaction<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut dyn StockTx) -> Result<T, ServiceError>,
    {
        (**self).transaction(work)
    }

    fn read<T, F>(&self, view: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&dyn StockTx) -> Result<T, ServiceError>,
    {
        (**self).read(view)
    }
}
