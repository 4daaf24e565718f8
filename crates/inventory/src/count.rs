//! Physical stocktake sessions.
//!
//! A count snapshots each item's quantity when the line is added, collects
//! counted quantities, and on completion reconciles every discrepant item
//! through the adjustment engine.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fiberstock_core::{
    CountItemId, DomainError, DomainResult, Entity, InventoryCountId, ItemId, LocationId, UserId,
};

use crate::adjustment::{self, Adjustment, AdjustmentRequest};
use crate::catalog::Company;
use crate::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl CountStatus {
    pub fn label(self) -> &'static str {
        match self {
            CountStatus::InProgress => "In Progress",
            CountStatus::Completed => "Completed",
            CountStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCount {
    /// Generated by the caller when absent.
    pub count_reference: Option<String>,
    pub location_id: Option<LocationId>,
    pub count_date: NaiveDate,
    pub company: Company,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCountItem {
    pub id: CountItemId,
    pub item_id: ItemId,
    /// Item quantity when the line was added. Never re-read.
    pub expected_quantity: u32,
    pub counted_quantity: Option<u32>,
    /// `counted - expected` once counted.
    pub discrepancy: Option<i64>,
    pub notes: Option<String>,
    pub counted_by: Option<UserId>,
    pub counted_at: Option<DateTime<Utc>>,
}

impl InventoryCountItem {
    pub fn is_counted(&self) -> bool {
        self.counted_quantity.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    id: InventoryCountId,
    count_reference: String,
    location_id: Option<LocationId>,
    status: CountStatus,
    count_date: NaiveDate,
    company: Company,
    notes: Option<String>,
    created_by: Option<UserId>,
    created_at: DateTime<Utc>,
    completed_by: Option<UserId>,
    completed_at: Option<DateTime<Utc>>,
    items: Vec<InventoryCountItem>,
}

/// What completing a count changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountCompletion {
    pub adjustments: Vec<Adjustment>,
    /// Items whose counted quantity matched the current stock.
    pub unchanged: Vec<ItemId>,
}

impl InventoryCount {
    pub fn new(
        id: InventoryCountId,
        count_reference: impl Into<String>,
        new: NewCount,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let count_reference = count_reference.into().trim().to_string();
        if count_reference.is_empty() {
            return Err(DomainError::validation("count reference cannot be empty"));
        }
        Ok(Self {
            id,
            count_reference,
            location_id: new.location_id,
            status: CountStatus::InProgress,
            count_date: new.count_date,
            company: new.company,
            notes: new.notes,
            created_by: new.created_by,
            created_at: at,
            completed_by: None,
            completed_at: None,
            items: Vec::new(),
        })
    }

    fn ensure_in_progress(&self, action: &str) -> DomainResult<()> {
        if self.status != CountStatus::InProgress {
            return Err(DomainError::not_editable(format!(
                "cannot {action} on count {} while {}",
                self.count_reference,
                self.status.label()
            )));
        }
        Ok(())
    }

    /// Add `item` to the count, snapshotting its current quantity.
    pub fn add_item(&mut self, item: &Item) -> DomainResult<CountItemId> {
        self.ensure_in_progress("add items")?;
        if self.items.iter().any(|line| line.item_id == item.id()) {
            return Err(DomainError::DuplicateCountItem(item.id()));
        }

        let id = CountItemId::new();
        self.items.push(InventoryCountItem {
            id,
            item_id: item.id(),
            expected_quantity: item.quantity(),
            counted_quantity: None,
            discrepancy: None,
            notes: None,
            counted_by: None,
            counted_at: None,
        });
        Ok(id)
    }

    pub fn record_count(
        &mut self,
        line: CountItemId,
        counted: u32,
        counted_by: Option<UserId>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_in_progress("record counts")?;
        let reference = &self.count_reference;
        let entry = self
            .items
            .iter_mut()
            .find(|entry| entry.id == line)
            .ok_or_else(|| DomainError::not_found(format!("count line {line} in count {reference}")))?;

        entry.counted_quantity = Some(counted);
        entry.discrepancy = Some(i64::from(counted) - i64::from(entry.expected_quantity));
        entry.counted_by = counted_by;
        entry.counted_at = Some(at);
        if notes.is_some() {
            entry.notes = notes;
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status != CountStatus::InProgress {
            return Err(DomainError::invalid_transition(format!(
                "count {} is {}, only in-progress counts can be cancelled",
                self.count_reference,
                self.status.label()
            )));
        }
        self.status = CountStatus::Cancelled;
        Ok(())
    }

    /// Reconcile every counted line against the items' *current* stock.
    ///
    /// `items` must contain every item on the count. Work happens on copies;
    /// `items` and `self` are only updated once every line has succeeded.
    pub fn complete(
        &mut self,
        items: &mut HashMap<ItemId, Item>,
        completed_by: Option<UserId>,
        at: DateTime<Utc>,
    ) -> DomainResult<CountCompletion> {
        if self.status != CountStatus::InProgress {
            return Err(DomainError::invalid_transition(format!(
                "count {} is {}, only in-progress counts can be completed",
                self.count_reference,
                self.status.label()
            )));
        }
        let uncounted = self.uncounted();
        if uncounted > 0 {
            return Err(DomainError::IncompleteCount { uncounted });
        }

        let reason = format!("Inventory Count #{}", self.count_reference);
        let reference = format!("Count #{}", self.count_reference);
        let mut staged = Vec::with_capacity(self.items.len());
        let mut completion = CountCompletion::default();

        for line in &self.items {
            let mut item = items
                .get(&line.item_id)
                .cloned()
                .ok_or_else(|| DomainError::not_found(format!("item {}", line.item_id)))?;
            let counted = line
                .counted_quantity
                .ok_or(DomainError::IncompleteCount { uncounted: 1 })?;

            if counted == item.quantity() {
                item.mark_counted(self.count_date);
                completion.unchanged.push(line.item_id);
            } else {
                let request = AdjustmentRequest::new(counted, reason.clone(), at)
                    .with_reference(reference.clone())
                    .performed_by(completed_by)
                    .at_location(self.location_id);
                let request = match &line.notes {
                    Some(notes) => request.with_notes(notes.clone()),
                    None => request,
                };
                completion.adjustments.push(adjustment::adjust(&mut item, request)?);
            }
            item.save(at);
            staged.push(item);
        }

        for item in staged {
            items.insert(item.id(), item);
        }
        self.status = CountStatus::Completed;
        self.completed_by = completed_by;
        self.completed_at = Some(at);
        Ok(completion)
    }

    pub fn uncounted(&self) -> usize {
        self.items.iter().filter(|line| !line.is_counted()).count()
    }

    /// `(counted lines, total lines)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.items.len() - self.uncounted(), self.items.len())
    }

    pub fn line(&self, id: CountItemId) -> Option<&InventoryCountItem> {
        self.items.iter().find(|line| line.id == id)
    }

    pub fn lines(&self) -> &[InventoryCountItem] {
        &self.items
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|line| line.item_id)
    }

    pub fn count_reference(&self) -> &str {
        &self.count_reference
    }

    pub fn status(&self) -> CountStatus {
        self.status
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    pub fn count_date(&self) -> NaiveDate {
        self.count_date
    }

    pub fn company(&self) -> Company {
        self.company
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_by(&self) -> Option<UserId> {
        self.completed_by
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl Entity for InventoryCount {
    type Id = InventoryCountId;

    fn id(&self) -> InventoryCountId {
        self.id
    }

    fn kind() -> &'static str {
        "inventory count"
    }
}
