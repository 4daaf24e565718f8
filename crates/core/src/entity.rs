//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Storage keys rows by `Entity::Id`, so every persisted record implements this.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Human-readable record kind used in `NotFound` / `Conflict` messages.
    fn kind() -> &'static str;
}
