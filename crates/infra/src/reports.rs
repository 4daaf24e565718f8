//! Read-side summaries over committed stock state.
//!
//! Pure functions over a `StockTx` view; `StockService` runs them inside a
//! read transaction so each report sees one consistent snapshot.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use fiberstock_core::{CategoryId, Entity, ItemId};
use fiberstock_inventory::{Company, Item, MovementType, StockMovement};
use fiberstock_purchasing::PurchaseOrder;

use crate::store::StockTx;

const RECENT_MOVEMENTS: usize = 10;
const RECENT_ORDERS: usize = 5;

/// Item count and stock value for one company.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyStock {
    pub item_count: usize,
    pub stock_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub wisp: CompanyStock,
    pub fno: CompanyStock,
    pub low_stock: Vec<Item>,
    pub out_of_stock: Vec<Item>,
    /// Newest first.
    pub recent_movements: Vec<StockMovement>,
    /// Ordered or partially received, latest order date first.
    pub open_orders: Vec<PurchaseOrder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryValuation {
    pub category_id: CategoryId,
    pub name: String,
    pub wisp_value: Decimal,
    pub fno_value: Decimal,
    pub wisp_count: usize,
    pub fno_count: usize,
}

impl CategoryValuation {
    pub fn total_value(&self) -> Decimal {
        self.wisp_value + self.fno_value
    }

    pub fn total_count(&self) -> usize {
        self.wisp_count + self.fno_count
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuationReport {
    /// Sorted by category name; categories holding no value are left out.
    pub categories: Vec<CategoryValuation>,
    pub wisp_total: Decimal,
    pub fno_total: Decimal,
}

impl ValuationReport {
    pub fn grand_total(&self) -> Decimal {
        self.wisp_total + self.fno_total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementSummary {
    pub movement_type: MovementType,
    pub count: usize,
    /// Sum of absolute quantities.
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub company: Option<Company>,
    /// One entry per movement type present in the window.
    pub summary: Vec<MovementSummary>,
    /// Newest first.
    pub movements: Vec<StockMovement>,
}

/// Active items with `0 < quantity <= minimum_stock`, by name.
pub fn low_stock(items: &[Item]) -> Vec<Item> {
    by_name(
        items
            .iter()
            .filter(|item| item.is_active() && item.is_low_stock())
            .cloned(),
    )
}

/// Active items with nothing on hand, by name.
pub fn out_of_stock(items: &[Item]) -> Vec<Item> {
    by_name(
        items
            .iter()
            .filter(|item| item.is_active() && item.quantity() == 0)
            .cloned(),
    )
}

fn by_name(items: impl Iterator<Item = Item>) -> Vec<Item> {
    let mut items: Vec<Item> = items.collect();
    items.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.sku().cmp(b.sku())));
    items
}

fn company_stock(items: &[Item], company: Company) -> CompanyStock {
    items
        .iter()
        .filter(|item| item.is_active() && item.company() == company)
        .fold(CompanyStock::default(), |mut acc, item| {
            acc.item_count += 1;
            acc.stock_value += item.total_value().unwrap_or_default();
            acc
        })
}

pub fn dashboard(tx: &dyn StockTx) -> Dashboard {
    let items = tx.items();

    let mut recent_movements = tx.movements();
    recent_movements.reverse();
    recent_movements.truncate(RECENT_MOVEMENTS);

    let mut open_orders: Vec<PurchaseOrder> = tx
        .purchase_orders()
        .into_iter()
        .filter(|order| order.status().is_open())
        .collect();
    open_orders.sort_by(|a, b| b.order_date().cmp(&a.order_date()));
    open_orders.truncate(RECENT_ORDERS);

    Dashboard {
        wisp: company_stock(&items, Company::Wisp),
        fno: company_stock(&items, Company::Fno),
        low_stock: low_stock(&items),
        out_of_stock: out_of_stock(&items),
        recent_movements,
        open_orders,
    }
}

/// Stock value per category, split by company.
///
/// Only active, priced items count. Items owned by both companies are not
/// attributed to either column.
pub fn valuation(tx: &dyn StockTx) -> ValuationReport {
    let mut rows: BTreeMap<(String, Uuid), CategoryValuation> = BTreeMap::new();
    let categories: HashMap<CategoryId, String> = tx
        .categories()
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();

    for item in tx.items() {
        let (Some(category_id), Some(value)) = (item.category_id(), item.total_value()) else {
            continue;
        };
        if !item.is_active() {
            continue;
        }
        let Some(name) = categories.get(&category_id) else {
            continue;
        };
        let row = rows
            .entry((name.clone(), *category_id.as_uuid()))
            .or_insert_with(|| CategoryValuation {
                category_id,
                name: name.clone(),
                wisp_value: Decimal::ZERO,
                fno_value: Decimal::ZERO,
                wisp_count: 0,
                fno_count: 0,
            });
        match item.company() {
            Company::Wisp => {
                row.wisp_value += value;
                row.wisp_count += 1;
            }
            Company::Fno => {
                row.fno_value += value;
                row.fno_count += 1;
            }
            Company::Both => {}
        }
    }

    let categories: Vec<CategoryValuation> = rows
        .into_values()
        .filter(|row| row.wisp_value > Decimal::ZERO || row.fno_value > Decimal::ZERO)
        .collect();
    ValuationReport {
        wisp_total: categories.iter().map(|row| row.wisp_value).sum(),
        fno_total: categories.iter().map(|row| row.fno_value).sum(),
        categories,
    }
}

/// Movements recorded between `from` and `to` (inclusive, by UTC date),
/// optionally restricted to items of one company.
pub fn movements(
    tx: &dyn StockTx,
    from: NaiveDate,
    to: NaiveDate,
    company: Option<Company>,
) -> MovementReport {
    let companies: HashMap<ItemId, Company> = tx
        .items()
        .into_iter()
        .map(|item| (item.id(), item.company()))
        .collect();

    let mut movements: Vec<StockMovement> = tx
        .movements()
        .into_iter()
        .filter(|movement| {
            let day = movement.recorded_at.date_naive();
            day >= from && day <= to
        })
        .filter(|movement| match company {
            Some(company) => companies.get(&movement.item_id) == Some(&company),
            None => true,
        })
        .collect();
    movements.reverse();

    let summary = MovementType::ALL
        .into_iter()
        .filter_map(|movement_type| {
            let (count, total_items) = movements
                .iter()
                .filter(|movement| movement.movement_type == movement_type)
                .fold((0usize, 0u64), |(count, total), movement| {
                    (count + 1, total + movement.quantity.unsigned_abs())
                });
            (count > 0).then_some(MovementSummary {
                movement_type,
                count,
                total_items,
            })
        })
        .collect();

    MovementReport {
        from,
        to,
        company,
        summary,
        movements,
    }
}
