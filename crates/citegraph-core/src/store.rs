//! Arena-backed node store with parent-owned lifetimes.
//!
//! Every publication lives in a slot of a single arena and is addressed by a
//! generational [`NodeKey`]. Ownership is expressed through the edge lists:
//!
//! - A parent's `children` list is the owning side of an edge.
//! - A child's `parents` list holds non-owning back-references.
//! - The lookup table maps identifiers to keys and owns nothing.
//!
//! A node is released exactly when its `parents` list becomes empty (the root
//! never has parents and is never released). Release is a worklist cascade:
//! each released node detaches itself from its children, and any child left
//! without parents is released in turn. Released slots bump their generation,
//! so a key kept from before the release never resolves again.
//!
//! All primitives are failure-atomic: they either complete or return an error
//! with the store unchanged.

use std::collections::{HashMap, HashSet, TryReserveError};

use tracing::trace;

use crate::config::GraphLimits;
use crate::error::GraphError;
use crate::publication::Publication;

/// Stable handle to a slot in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeKey {
    index: usize,
    generation: u32,
}

/// A publication together with both sides of its citation edges.
#[derive(Debug)]
pub(crate) struct Node<P: Publication> {
    pub(crate) id: P::Id,
    pub(crate) publication: P,
    /// Publications citing this one. Owning.
    pub(crate) children: Vec<NodeKey>,
    /// Publications this one cites. Non-owning.
    pub(crate) parents: Vec<NodeKey>,
}

impl<P: Publication> Node<P> {
    const fn new(id: P::Id, publication: P) -> Self {
        Self {
            id,
            publication,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Slot<P: Publication> {
    generation: u32,
    node: Option<Node<P>>,
}

#[derive(Debug)]
pub(crate) struct NodeStore<P: Publication> {
    slots: Vec<Slot<P>>,
    free: Vec<usize>,
    index: HashMap<P::Id, NodeKey>,
    limits: GraphLimits,
    #[cfg(test)]
    pub(crate) faults: Faults,
}

/// Places where the store grows a collection and may run out of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrowSite {
    LookupTable,
    NodeArena,
    ParentList,
}

impl GrowSite {
    const fn what(self) -> &'static str {
        match self {
            Self::LookupTable => "lookup table",
            Self::NodeArena => "node arena",
            Self::ParentList => "parent list",
        }
    }
}

/// Allocation failures to simulate in test builds.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Faults {
    /// Fail the next lookup-table reservation.
    pub(crate) lookup_table: bool,
    /// Fail the next arena growth.
    pub(crate) node_arena: bool,
    /// Let this many back-references succeed, then fail the next one.
    pub(crate) parent_list_after: Option<usize>,
}

fn alloc_failed(what: &str) -> GraphError {
    GraphError::CapacityExceeded(format!("could not grow {what}"))
}

// Keys only reach the store after an index lookup, so this means a node was
// released mid-operation. Slot details stay out of the message.
fn stale() -> GraphError {
    GraphError::PublicationNotFound(String::from("publication released during the operation"))
}

impl<P: Publication> NodeStore<P> {
    /// Create a store holding only the parentless root node.
    pub(crate) fn with_root(id: P::Id, limits: GraphLimits) -> (Self, NodeKey) {
        let key = NodeKey {
            index: 0,
            generation: 0,
        };
        let publication = P::from_id(&id);

        let mut index = HashMap::new();
        index.insert(id.clone(), key);

        let store = Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(id, publication)),
            }],
            free: Vec::new(),
            index,
            limits,
            #[cfg(test)]
            faults: Faults::default(),
        };
        (store, key)
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) const fn limits(&self) -> GraphLimits {
        self.limits
    }

    pub(crate) fn lookup(&self, id: &P::Id) -> Option<NodeKey> {
        self.index.get(id).copied()
    }

    pub(crate) fn contains(&self, id: &P::Id) -> bool {
        self.index.contains_key(id)
    }

    pub(crate) fn node(&self, key: NodeKey) -> Option<&Node<P>> {
        self.slots
            .get(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node<P>> {
        self.slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Identifier of a live node.
    pub(crate) fn id_of(&self, key: NodeKey) -> Option<&P::Id> {
        self.node(key).map(|node| &node.id)
    }

    /// Live identifiers, in table order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = &P::Id> {
        self.index.keys()
    }

    /// Lookup-table entries, in table order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&P::Id, NodeKey)> {
        self.index.iter().map(|(id, key)| (id, *key))
    }

    /// Every occupied slot, in arena order.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node<P>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeKey {
                        index,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    /// Allocate a node with no edges and register it in the lookup table.
    ///
    /// The node is not owned by anything yet; the caller must link it to a
    /// parent or release it with [`Self::unlink_all_parents`].
    pub(crate) fn create_isolated(
        &mut self,
        id: P::Id,
        publication: P,
    ) -> Result<NodeKey, GraphError> {
        if self.index.contains_key(&id) {
            return Err(GraphError::already_created(&id));
        }
        if let Some(max) = self.limits.max_publications {
            if self.index.len() >= max.get() {
                return Err(GraphError::CapacityExceeded(format!(
                    "publication limit of {max} reached"
                )));
            }
        }

        let reserved = self.index.try_reserve(1);
        self.check_grow(GrowSite::LookupTable, reserved)?;

        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            let reserved = self.slots.try_reserve(1);
            self.check_grow(GrowSite::NodeArena, reserved)?;
            self.slots.push(Slot {
                generation: 0,
                node: None,
            });
            self.slots.len() - 1
        };

        let slot = &mut self.slots[index];
        slot.node = Some(Node::new(id.clone(), publication));
        let key = NodeKey {
            index,
            generation: slot.generation,
        };
        self.index.insert(id, key);
        Ok(key)
    }

    /// Add the edge `child` cites `parent`.
    ///
    /// Returns `Ok(false)` without touching anything if the edge already
    /// exists. If the back-reference cannot be recorded, the forward
    /// reference is retracted before the error is returned.
    pub(crate) fn link(&mut self, parent: NodeKey, child: NodeKey) -> Result<bool, GraphError> {
        if self.node(child).is_none() {
            return Err(stale());
        }
        let limit = self.limits.max_citations_received;
        let parent_node = self.node_mut(parent).ok_or_else(stale)?;

        if parent_node.children.contains(&child) {
            return Ok(false);
        }
        if let Some(max) = limit {
            if parent_node.children.len() >= max {
                return Err(GraphError::CapacityExceeded(format!(
                    "{:?} is already cited by {max} publications",
                    parent_node.id
                )));
            }
        }
        parent_node
            .children
            .try_reserve(1)
            .map_err(|_| alloc_failed("child list"))?;
        parent_node.children.push(child);

        let reserved = self.node_mut(child).map(|node| node.parents.try_reserve(1));
        let recorded = reserved.map_or_else(
            || Err(stale()),
            |reserved| self.check_grow(GrowSite::ParentList, reserved),
        );

        if let Err(err) = recorded {
            if let Some(parent_node) = self.node_mut(parent) {
                parent_node.children.pop();
            }
            return Err(err);
        }
        if let Some(child_node) = self.node_mut(child) {
            child_node.parents.push(parent);
        }
        Ok(true)
    }

    /// Detach `key` from every parent, releasing it and every node that
    /// loses its last parent as a consequence.
    ///
    /// Returns the released identifiers in release order.
    pub(crate) fn unlink_all_parents(&mut self, key: NodeKey) -> Vec<P::Id> {
        let Some(node) = self.node_mut(key) else {
            return Vec::new();
        };
        let parents = std::mem::take(&mut node.parents);

        for parent in parents.iter().rev() {
            if let Some(parent_node) = self.node_mut(*parent) {
                parent_node.children.retain(|child| *child != key);
            }
        }

        self.release_cascade(key)
    }

    /// Whether `candidate` is `ancestor` itself or reachable from it through
    /// child edges.
    pub(crate) fn is_descendant(&self, ancestor: NodeKey, candidate: NodeKey) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![ancestor];

        while let Some(key) = stack.pop() {
            if key == candidate {
                return true;
            }
            if !visited.insert(key) {
                continue;
            }
            if let Some(node) = self.node(key) {
                stack.extend(node.children.iter().copied());
            }
        }
        false
    }

    fn release_cascade(&mut self, start: NodeKey) -> Vec<P::Id> {
        let mut released = Vec::new();
        let mut pending = vec![start];

        while let Some(key) = pending.pop() {
            let Some(node) = self.take(key) else {
                continue;
            };

            for child in &node.children {
                if let Some(child_node) = self.node_mut(*child) {
                    child_node.parents.retain(|parent| *parent != key);
                    if child_node.parents.is_empty() {
                        pending.push(*child);
                    }
                }
            }

            trace!(id = ?node.id, children = node.children.len(), "released publication");
            released.push(node.id);
        }

        released
    }

    fn check_grow(
        &mut self,
        site: GrowSite,
        reserved: Result<(), TryReserveError>,
    ) -> Result<(), GraphError> {
        if self.inject_fault(site) {
            return Err(alloc_failed(site.what()));
        }
        reserved.map_err(|_| alloc_failed(site.what()))
    }

    #[cfg(test)]
    fn inject_fault(&mut self, site: GrowSite) -> bool {
        match site {
            GrowSite::LookupTable => std::mem::take(&mut self.faults.lookup_table),
            GrowSite::NodeArena => std::mem::take(&mut self.faults.node_arena),
            GrowSite::ParentList => match self.faults.parent_list_after {
                Some(0) => {
                    self.faults.parent_list_after = None;
                    true
                }
                Some(n) => {
                    self.faults.parent_list_after = Some(n - 1);
                    false
                }
                None => false,
            },
        }
    }

    #[cfg(not(test))]
    #[allow(clippy::unused_self)]
    const fn inject_fault(&self, _site: GrowSite) -> bool {
        false
    }

    /// Vacate a slot: unregister the id first, then hand the node back.
    fn take(&mut self, key: NodeKey) -> Option<Node<P>> {
        let slot = self
            .slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.index.remove(&node.id);
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publication::fixtures::Paper;
    use std::num::NonZeroUsize;

    fn store(root: &str) -> (NodeStore<Paper>, NodeKey) {
        NodeStore::with_root(root.to_string(), GraphLimits::unbounded())
    }

    fn add(store: &mut NodeStore<Paper>, id: &str) -> NodeKey {
        let id = id.to_string();
        let publication = Paper::from_id(&id);
        store.create_isolated(id, publication).expect("create")
    }

    fn ids(store: &NodeStore<Paper>) -> Vec<String> {
        let mut ids: Vec<String> = store.ids().cloned().collect();
        ids.sort();
        ids
    }

    #[test]
    fn root_is_registered() {
        let (store, root) = store("R");
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&"R".to_string()), Some(root));
        assert_eq!(store.id_of(root), Some(&"R".to_string()));
    }

    #[test]
    fn create_isolated_rejects_duplicates_without_side_effects() {
        let (mut store, _) = store("R");
        let a = add(&mut store, "A");

        let err = store
            .create_isolated("A".into(), Paper::from_id(&"A".into()))
            .expect_err("duplicate");
        assert!(matches!(err, GraphError::PublicationAlreadyCreated(_)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(&"A".to_string()), Some(a));
    }

    #[test]
    fn create_isolated_respects_publication_limit() {
        let limits = GraphLimits {
            max_publications: NonZeroUsize::new(2),
            max_citations_received: None,
        };
        let (mut store, _) = NodeStore::<Paper>::with_root("R".into(), limits);
        add(&mut store, "A");

        let err = store
            .create_isolated("B".into(), Paper::from_id(&"B".into()))
            .expect_err("limit");
        assert!(matches!(err, GraphError::CapacityExceeded(_)));
        assert!(!store.contains(&"B".to_string()));
    }

    #[test]
    fn link_records_both_sides_once() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");

        assert!(store.link(root, a).expect("link"));
        assert!(!store.link(root, a).expect("relink"));

        assert_eq!(store.node(root).expect("root").children, vec![a]);
        assert_eq!(store.node(a).expect("a").parents, vec![root]);
    }

    #[test]
    fn link_over_limit_leaves_no_half_edge() {
        let limits = GraphLimits {
            max_publications: None,
            max_citations_received: Some(1),
        };
        let (mut store, root) = NodeStore::<Paper>::with_root("R".into(), limits);
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        store.link(root, a).expect("link a");

        let err = store.link(root, b).expect_err("limit");
        assert!(matches!(err, GraphError::CapacityExceeded(_)));
        assert_eq!(store.node(root).expect("root").children, vec![a]);
        assert!(store.node(b).expect("b").parents.is_empty());
    }

    #[test]
    fn unlink_releases_single_owner_chain() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        store.link(root, a).expect("link");
        store.link(a, b).expect("link");

        let released = store.unlink_all_parents(a);
        assert_eq!(released, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(ids(&store), vec!["R".to_string()]);
        assert!(store.node(root).expect("root").children.is_empty());
        assert!(store.node(a).is_none());
        assert!(store.node(b).is_none());
    }

    #[test]
    fn unlink_spares_children_with_other_owners() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        store.link(root, a).expect("link");
        store.link(root, b).expect("link");
        store.link(a, b).expect("link");

        let released = store.unlink_all_parents(a);
        assert_eq!(released, vec!["A".to_string()]);
        assert_eq!(store.node(b).expect("b alive").parents, vec![root]);
        assert_eq!(store.node(root).expect("root").children, vec![b]);
    }

    #[test]
    fn released_slot_is_reused_with_new_generation() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        store.link(root, a).expect("link");
        store.unlink_all_parents(a);

        let again = add(&mut store, "A");
        assert_ne!(a, again);
        assert!(store.node(a).is_none());
        assert_eq!(store.id_of(again), Some(&"A".to_string()));
    }

    #[test]
    fn unlink_of_stale_key_is_a_no_op() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        store.link(root, a).expect("link");
        store.unlink_all_parents(a);

        assert!(store.unlink_all_parents(a).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn is_descendant_follows_child_edges() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        store.link(root, a).expect("link");
        store.link(a, b).expect("link");

        assert!(store.is_descendant(root, b));
        assert!(store.is_descendant(a, a));
        assert!(!store.is_descendant(b, root));
    }

    #[test]
    fn failed_back_reference_retracts_forward_edge() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        store.link(root, a).expect("link a");

        store.faults.parent_list_after = Some(0);
        let err = store.link(root, b).expect_err("parent list fault");
        assert_eq!(err, GraphError::CapacityExceeded("could not grow parent list".into()));
        assert_eq!(store.node(root).expect("root").children, vec![a]);
        assert!(store.node(b).expect("b").parents.is_empty());

        // The fault fires once; the same link then goes through.
        assert!(store.link(root, b).expect("retry"));
        assert_eq!(store.node(root).expect("root").children, vec![a, b]);
        assert_eq!(store.node(b).expect("b").parents, vec![root]);
    }

    #[test]
    fn lookup_table_failure_allocates_nothing() {
        let (mut store, _) = store("R");
        store.faults.lookup_table = true;

        let err = store
            .create_isolated("A".into(), Paper::from_id(&"A".into()))
            .expect_err("lookup table fault");
        assert_eq!(err, GraphError::CapacityExceeded("could not grow lookup table".into()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.slots.len(), 1);
        assert!(!store.contains(&"A".to_string()));
    }

    #[test]
    fn arena_failure_leaves_no_index_entry() {
        let (mut store, _) = store("R");
        store.faults.node_arena = true;

        let err = store
            .create_isolated("A".into(), Paper::from_id(&"A".into()))
            .expect_err("arena fault");
        assert_eq!(err, GraphError::CapacityExceeded("could not grow node arena".into()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.slots.len(), 1);
        assert!(!store.contains(&"A".to_string()));

        add(&mut store, "A");
        assert_eq!(store.slots.len(), 2);
    }

    #[test]
    fn link_with_released_key_hides_slot_details() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        store.link(root, a).expect("link");
        store.unlink_all_parents(a);

        let err = store.link(root, a).expect_err("stale child");
        let GraphError::PublicationNotFound(message) = &err else {
            panic!("unexpected error {err:?}");
        };
        assert!(!message.contains("generation"), "{message}");
        assert!(!message.contains("index"), "{message}");
        assert!(store.node(root).expect("root").children.is_empty());
    }

    #[test]
    fn nodes_iterates_live_slots_only() {
        let (mut store, root) = store("R");
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        store.link(root, a).expect("link");
        store.link(root, b).expect("link");
        store.unlink_all_parents(a);

        let live: Vec<NodeKey> = store.nodes().map(|(key, _)| key).collect();
        assert_eq!(live, vec![root, b]);
    }
}
