//! The payload contract for nodes of a [`CitationGraph`](crate::CitationGraph).

use std::fmt::Debug;
use std::hash::Hash;

/// A publication stored in the citation graph.
///
/// The graph creates payloads itself from their identifier, so the type must
/// be constructible from an id alone. The graph keeps its own copy of the id
/// for indexing; [`Publication::id`] is only consulted by the integrity
/// checker.
pub trait Publication {
    /// Identifier type. Must be unique among live publications.
    type Id: Clone + Ord + Hash + Debug;

    /// Build a fresh payload for `id`.
    fn from_id(id: &Self::Id) -> Self;

    /// The identifier this payload believes it has.
    fn id(&self) -> Self::Id;
}
