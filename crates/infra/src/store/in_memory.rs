use std::collections::HashMap;
use std::sync::RwLock;

use fiberstock_core::{
    CategoryId, DomainError, DomainResult, Entity, ExpectedVersion, InventoryCountId, ItemId,
    LocationId, PurchaseOrderId, PurchaseOrderItemId, SupplierId,
};
use fiberstock_inventory::{
    Category, InventoryCount, Item, Location, StockAdjustment, StockMovement, Supplier,
};
use fiberstock_purchasing::PurchaseOrder;

use super::r#trait::{StockStore, StockTx};
use crate::error::{ServiceError, StoreError};

#[derive(Debug, Clone)]
struct Row<E> {
    record: E,
    version: u64,
}

/// Keyed table of versioned rows.
#[derive(Debug, Clone)]
struct Table<E: Entity> {
    rows: HashMap<E::Id, Row<E>>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<E> Table<E>
where
    E: Entity + Clone,
{
    fn missing(id: E::Id) -> DomainError {
        DomainError::not_found(format!("{} {id}", E::kind()))
    }

    fn row(&self, id: E::Id) -> DomainResult<&Row<E>> {
        self.rows.get(&id).ok_or_else(|| Self::missing(id))
    }

    fn get(&self, id: E::Id) -> DomainResult<E> {
        self.row(id).map(|row| row.record.clone())
    }

    fn insert(&mut self, record: E) -> DomainResult<()> {
        let id = record.id();
        if self.rows.contains_key(&id) {
            return Err(DomainError::conflict(format!("{} {id} already exists", E::kind())));
        }
        self.rows.insert(id, Row { record, version: 1 });
        Ok(())
    }

    fn put(&mut self, record: E, expected: ExpectedVersion) -> DomainResult<u64> {
        let id = record.id();
        let row = self.rows.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        expected.check(row.version)?;
        row.record = record;
        row.version += 1;
        Ok(row.version)
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values().map(|row| &row.record)
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    categories: Table<Category>,
    locations: Table<Location>,
    suppliers: Table<Supplier>,
    items: Table<Item>,
    movements: Vec<StockMovement>,
    adjustments: Vec<StockAdjustment>,
    purchase_orders: Table<PurchaseOrder>,
    counts: Table<InventoryCount>,
    count_sequence: u64,
}

impl StockTx for Tables {
    fn category(&self, id: CategoryId) -> DomainResult<Category> {
        self.categories.get(id)
    }

    fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<_> = self.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    fn insert_category(&mut self, category: Category) -> DomainResult<()> {
        self.categories.insert(category)
    }

    fn location(&self, id: LocationId) -> DomainResult<Location> {
        self.locations.get(id)
    }

    fn insert_location(&mut self, location: Location) -> DomainResult<()> {
        self.locations.insert(location)
    }

    fn put_location(&mut self, location: Location) -> DomainResult<()> {
        self.locations.put(location, ExpectedVersion::Any).map(|_| ())
    }

    fn supplier(&self, id: SupplierId) -> DomainResult<Supplier> {
        self.suppliers.get(id)
    }

    fn insert_supplier(&mut self, supplier: Supplier) -> DomainResult<()> {
        self.suppliers.insert(supplier)
    }

    fn item(&self, id: ItemId) -> DomainResult<Item> {
        self.items.get(id)
    }

    fn item_version(&self, id: ItemId) -> DomainResult<u64> {
        self.items.row(id).map(|row| row.version)
    }

    fn items(&self) -> Vec<Item> {
        let mut items: Vec<_> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));
        items
    }

    fn insert_item(&mut self, item: Item) -> DomainResult<()> {
        self.items.insert(item)
    }

    fn put_item(&mut self, item: Item, expected: ExpectedVersion) -> DomainResult<u64> {
        self.items.put(item, expected)
    }

    fn append_movement(&mut self, movement: StockMovement) {
        self.movements.push(movement);
    }

    fn movements_for(&self, item: ItemId) -> Vec<StockMovement> {
        self.movements
            .iter()
            .filter(|m| m.item_id == item)
            .cloned()
            .collect()
    }

    fn movements(&self) -> Vec<StockMovement> {
        self.movements.clone()
    }

    fn append_adjustment(&mut self, adjustment: StockAdjustment) {
        self.adjustments.push(adjustment);
    }

    fn adjustments_for(&self, item: ItemId) -> Vec<StockAdjustment> {
        self.adjustments
            .iter()
            .filter(|a| a.item_id == item)
            .cloned()
            .collect()
    }

    fn purchase_order(&self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        self.purchase_orders.get(id)
    }

    fn purchase_order_for_line(&self, line: PurchaseOrderItemId) -> DomainResult<PurchaseOrder> {
        self.purchase_orders
            .values()
            .find(|po| po.line(line).is_some())
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("purchase order line {line}")))
    }

    fn purchase_orders(&self) -> Vec<PurchaseOrder> {
        let mut orders: Vec<_> = self.purchase_orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        orders
    }

    fn insert_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()> {
        if self
            .purchase_orders
            .values()
            .any(|po| po.order_number() == order.order_number())
        {
            return Err(DomainError::conflict(format!(
                "order number {} is already in use",
                order.order_number()
            )));
        }
        self.purchase_orders.insert(order)
    }

    fn put_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()> {
        self.purchase_orders.put(order, ExpectedVersion::Any).map(|_| ())
    }

    fn count(&self, id: InventoryCountId) -> DomainResult<InventoryCount> {
        self.counts.get(id)
    }

    fn insert_count(&mut self, count: InventoryCount) -> DomainResult<()> {
        if self.count_reference_in_use(count.count_reference()) {
            return Err(DomainError::conflict(format!(
                "count reference {} is already in use",
                count.count_reference()
            )));
        }
        self.counts.insert(count)
    }

    fn put_count(&mut self, count: InventoryCount) -> DomainResult<()> {
        self.counts.put(count, ExpectedVersion::Any).map(|_| ())
    }

    fn count_reference_in_use(&self, reference: &str) -> bool {
        self.counts
            .values()
            .any(|c| c.count_reference() == reference)
    }

    fn next_count_number(&mut self) -> u64 {
        self.count_sequence += 1;
        self.count_sequence
    }
}

/// In-memory transactional stock store.
///
/// Intended for tests/dev. Each transaction clones the tables, works on the
/// copy under the write lock and swaps it in on success.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    tables: RwLock<Tables>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StockStore for InMemoryStockStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut dyn StockTx) -> Result<T, ServiceError>,
    {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Poisoned("stock tables".to_string()))?;

        let mut staged = tables.clone();
        let value = work(&mut staged)?;
        *tables = staged;
        Ok(value)
    }

    fn read<T, F>(&self, view: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&dyn StockTx) -> Result<T, ServiceError>,
    {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Poisoned("stock tables".to_string()))?;
        view(&*tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fiberstock_inventory::{Company, ItemDetails, NewLocation};

    fn item(name: &str) -> Item {
        let details = ItemDetails {
            name: name.to_string(),
            company: Company::Wisp,
            ..ItemDetails::default()
        };
        Item::create(ItemId::new(), details, Utc::now()).unwrap()
    }

    #[test]
    fn failed_transaction_discards_every_write() {
        let store = InMemoryStockStore::new();
        let kept = item("Sector antenna");
        let kept_id = kept.id();
        store
            .transaction(|tx| Ok(tx.insert_item(kept)?))
            .unwrap();

        let result: Result<(), ServiceError> = store.transaction(|tx| {
            tx.insert_item(item("Backhaul radio"))?;
            let location = Location::new(
                LocationId::new(),
                NewLocation {
                    name: "Tower 3".to_string(),
                    description: String::new(),
                    address: String::new(),
                    company: Company::Wisp,
                },
            )?;
            tx.insert_location(location)?;
            Err(DomainError::validation("abort").into())
        });

        assert!(result.is_err());
        let items = store.read(|tx| Ok(tx.items())).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id(), kept_id);
    }

    #[test]
    fn put_item_checks_and_bumps_version() {
        let store = InMemoryStockStore::new();
        let record = item("PoE injector");
        let id = record.id();
        store.transaction(|tx| Ok(tx.insert_item(record.clone())?)).unwrap();

        let version = store
            .transaction(|tx| Ok(tx.put_item(record.clone(), ExpectedVersion::Exact(1))?))
            .unwrap();
        assert_eq!(version, 2);

        let err = store
            .transaction(|tx| Ok(tx.put_item(record.clone(), ExpectedVersion::Exact(1))?))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert_eq!(store.read(|tx| Ok(tx.item_version(id)?)).unwrap(), 2);
    }

    #[test]
    fn missing_rows_are_not_found_and_duplicates_conflict() {
        let store = InMemoryStockStore::new();
        let record = item("Router");

        let err = store.read(|tx| Ok(tx.item(record.id())?)).unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        store.transaction(|tx| Ok(tx.insert_item(record.clone())?)).unwrap();
        let err = store
            .transaction(|tx| Ok(tx.insert_item(record.clone())?))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn count_sequence_rolls_back_with_the_transaction() {
        let store = InMemoryStockStore::new();
        assert_eq!(store.transaction(|tx| Ok(tx.next_count_number())).unwrap(), 1);

        let _ = store.transaction(|tx| -> Result<(), ServiceError> {
            tx.next_count_number();
            Err(DomainError::validation("abort").into())
        });

        assert_eq!(store.transaction(|tx| Ok(tx.next_count_number())).unwrap(), 2);
    }
}
