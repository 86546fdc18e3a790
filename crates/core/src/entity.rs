//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Records that are upserted by id (stores, live collections) implement this.
/// The id's `Display` form is its storage key.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
