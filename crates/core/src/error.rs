//! Domain error model.

use thiserror::Error;

use crate::id::ItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every stock operation surfaces one of these at its boundary. Storage and
/// transport failures are wrapped separately by the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An outgoing movement (or downward adjustment) would drive stock negative.
    #[error("insufficient stock for item {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: ItemId,
        available: u32,
        requested: u64,
    },

    /// A movement request is malformed (sign, zero quantity, missing location).
    #[error("invalid movement: {0}")]
    InvalidMovement(String),

    /// A workflow record was mutated outside its editable states.
    #[error("not editable: {0}")]
    NotEditable(String),

    /// The item is already part of the inventory count.
    #[error("item {0} is already part of this count")]
    DuplicateCountItem(ItemId),

    /// Completion attempted while some count lines have no counted quantity.
    #[error("inventory count has {uncounted} uncounted item(s)")]
    IncompleteCount { uncounted: usize },

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A state machine transition is not allowed from the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A value failed validation (e.g. empty name, negative price).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A write conflicted with a concurrent one (stale version, duplicate key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Recorded ledger entries disagree with the stock they claim to produce.
    #[error("ledger mismatch: {0}")]
    LedgerMismatch(String),
}

impl DomainError {
    pub fn invalid_movement(msg: impl Into<String>) -> Self {
        Self::InvalidMovement(msg.into())
    }

    pub fn not_editable(msg: impl Into<String>) -> Self {
        Self::NotEditable(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn ledger_mismatch(msg: impl Into<String>) -> Self {
        Self::LedgerMismatch(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_item_and_amounts() {
        let item = ItemId::new();
        let err = DomainError::InsufficientStock {
            item,
            available: 3,
            requested: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains(&item.to_string()));
        assert!(msg.contains("available 3"));
        assert!(msg.contains("requested 5"));
    }

    #[test]
    fn incomplete_count_reports_uncounted_lines() {
        let err = DomainError::IncompleteCount { uncounted: 2 };
        assert_eq!(err.to_string(), "inventory count has 2 uncounted item(s)");
    }
}
