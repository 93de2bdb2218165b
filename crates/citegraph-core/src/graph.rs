//! Rooted citation graph with parent-owned publications.
//!
//! [`CitationGraph`] is the public face of the node store. It validates every
//! identifier against the lookup table before mutating anything, then
//! composes the store's failure-atomic primitives so that each public
//! operation either fully succeeds or leaves the graph untouched.
//!
//! # Edge direction
//!
//! `add_citation(child, parent)` means *child cites parent*. The parent owns
//! the child: a publication stays alive for as long as at least one of the
//! publications it cites is alive. Removing a publication therefore also
//! releases every publication that cited only it, transitively.
//!
//! # Ordering
//!
//! [`CitationGraph::parents`] and [`CitationGraph::children`] list neighbors in
//! the order the edges were added.

use tracing::{debug, warn};

use crate::config::{GraphConfig, GraphLimits};
use crate::error::GraphError;
use crate::publication::Publication;
use crate::store::{NodeKey, NodeStore};

/// An in-memory, rooted DAG of publications linked by citations.
#[derive(Debug)]
pub struct CitationGraph<P: Publication> {
    store: NodeStore<P>,
    root: NodeKey,
    root_id: P::Id,
}

impl<P: Publication> CitationGraph<P> {
    /// Create a graph holding only the root publication `root_id`.
    #[must_use]
    pub fn new(root_id: P::Id) -> Self {
        Self::with_config(root_id, &GraphConfig::default())
    }

    /// Create a graph with resource limits taken from `config`.
    #[must_use]
    pub fn with_config(root_id: P::Id, config: &GraphConfig) -> Self {
        let (store, root) = NodeStore::with_root(root_id.clone(), config.limits);
        Self {
            store,
            root,
            root_id,
        }
    }

    /// Identifier of the root publication.
    #[must_use]
    pub const fn root_id(&self) -> &P::Id {
        &self.root_id
    }

    /// Whether a publication with `id` is currently alive.
    #[must_use]
    pub fn exists(&self, id: &P::Id) -> bool {
        self.store.contains(id)
    }

    /// Number of live publications, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Always `false`: the root is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// All live identifiers, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<P::Id> {
        let mut ids: Vec<P::Id> = self.store.ids().cloned().collect();
        ids.sort();
        ids
    }

    /// Limits this graph was configured with.
    #[must_use]
    pub const fn limits(&self) -> GraphLimits {
        self.store.limits()
    }

    /// Payload of publication `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PublicationNotFound`] if `id` is not alive.
    pub fn get(&self, id: &P::Id) -> Result<&P, GraphError> {
        let key = self.key(id)?;
        self.store
            .node(key)
            .map(|node| &node.publication)
            .ok_or_else(|| GraphError::not_found(id))
    }

    /// Mutable payload of publication `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PublicationNotFound`] if `id` is not alive.
    pub fn get_mut(&mut self, id: &P::Id) -> Result<&mut P, GraphError> {
        let key = self.key(id)?;
        self.store
            .node_mut(key)
            .map(|node| &mut node.publication)
            .ok_or_else(|| GraphError::not_found(id))
    }

    /// Identifiers of the publications cited by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PublicationNotFound`] if `id` is not alive.
    pub fn parents(&self, id: &P::Id) -> Result<Vec<P::Id>, GraphError> {
        let key = self.key(id)?;
        let node = self
            .store
            .node(key)
            .ok_or_else(|| GraphError::not_found(id))?;
        Ok(self.resolve(&node.parents))
    }

    /// Identifiers of the publications citing `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PublicationNotFound`] if `id` is not alive.
    pub fn children(&self, id: &P::Id) -> Result<Vec<P::Id>, GraphError> {
        let key = self.key(id)?;
        let node = self
            .store
            .node(key)
            .ok_or_else(|| GraphError::not_found(id))?;
        Ok(self.resolve(&node.children))
    }

    /// Create publication `id` citing `parent_id`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::PublicationAlreadyCreated`] if `id` is alive.
    /// - [`GraphError::PublicationNotFound`] if `parent_id` is not alive.
    /// - [`GraphError::CapacityExceeded`] if a configured limit is hit.
    pub fn create(&mut self, id: P::Id, parent_id: &P::Id) -> Result<(), GraphError> {
        if self.exists(&id) {
            return Err(GraphError::already_created(&id));
        }
        self.create_with_parents(id, std::slice::from_ref(parent_id))
    }

    /// Create publication `id` citing every publication in `parent_ids`.
    ///
    /// Either every citation is added or none is: if linking to any parent
    /// fails, the citations already added are retracted and the new
    /// publication is released. Repeated parent ids yield a single edge.
    ///
    /// # Errors
    ///
    /// - [`GraphError::EmptyParentList`] if `parent_ids` is empty.
    /// - [`GraphError::PublicationAlreadyCreated`] if `id` is alive.
    /// - [`GraphError::PublicationNotFound`] if any parent is not alive.
    /// - [`GraphError::CapacityExceeded`] if a configured limit is hit.
    pub fn create_with_parents(
        &mut self,
        id: P::Id,
        parent_ids: &[P::Id],
    ) -> Result<(), GraphError> {
        if parent_ids.is_empty() {
            return Err(GraphError::EmptyParentList);
        }
        if self.exists(&id) {
            return Err(GraphError::already_created(&id));
        }
        let parents = parent_ids
            .iter()
            .map(|parent_id| self.key(parent_id))
            .collect::<Result<Vec<_>, _>>()?;

        let publication = P::from_id(&id);
        let key = self.store.create_isolated(id, publication)?;

        for (linked, parent) in parents.iter().enumerate() {
            if let Err(err) = self.store.link(*parent, key) {
                warn!(
                    id = ?self.store.id_of(key),
                    linked,
                    error = %err,
                    "citation failed, rolling back create"
                );
                self.store.unlink_all_parents(key);
                return Err(err);
            }
        }

        debug!(id = ?self.store.id_of(key), parents = parents.len(), "created publication");
        Ok(())
    }

    /// Record that `child_id` cites `parent_id`.
    ///
    /// Adding a citation that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// - [`GraphError::PublicationNotFound`] if either publication is not alive.
    /// - [`GraphError::CitationCycle`] if `parent_id` is `child_id` or cites it,
    ///   directly or transitively.
    /// - [`GraphError::CapacityExceeded`] if the parent's citation limit is hit.
    pub fn add_citation(&mut self, child_id: &P::Id, parent_id: &P::Id) -> Result<(), GraphError> {
        let parent = self.key(parent_id)?;
        let child = self.key(child_id)?;

        if self.store.is_descendant(child, parent) {
            return Err(GraphError::CitationCycle {
                child: format!("{child_id:?}"),
                parent: format!("{parent_id:?}"),
            });
        }

        if self.store.link(parent, child)? {
            debug!(child = ?child_id, parent = ?parent_id, "added citation");
        }
        Ok(())
    }

    /// Remove publication `id`, together with every publication that is left
    /// without any cited publication as a result.
    ///
    /// Returns the released identifiers, `id` first.
    ///
    /// # Errors
    ///
    /// - [`GraphError::PublicationNotFound`] if `id` is not alive.
    /// - [`GraphError::TriedToRemoveRoot`] if `id` is the root.
    pub fn remove(&mut self, id: &P::Id) -> Result<Vec<P::Id>, GraphError> {
        let key = self.key(id)?;
        if key == self.root {
            return Err(GraphError::TriedToRemoveRoot(format!("{id:?}")));
        }

        let released = self.store.unlink_all_parents(key);
        debug!(id = ?id, released = released.len(), "removed publication");
        Ok(released)
    }

    pub(crate) const fn store(&self) -> &NodeStore<P> {
        &self.store
    }

    pub(crate) const fn root_key(&self) -> NodeKey {
        self.root
    }

    fn key(&self, id: &P::Id) -> Result<NodeKey, GraphError> {
        self.store.lookup(id).ok_or_else(|| GraphError::not_found(id))
    }

    fn resolve(&self, keys: &[NodeKey]) -> Vec<P::Id> {
        keys.iter()
            .filter_map(|key| self.store.id_of(*key))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::publication::fixtures::Paper;
    use std::num::NonZeroUsize;

    fn s(id: &str) -> String {
        id.to_string()
    }

    fn graph() -> CitationGraph<Paper> {
        CitationGraph::new(s("A"))
    }

    #[test]
    fn new_graph_has_only_root() {
        let g = graph();
        assert_eq!(g.root_id(), "A");
        assert!(g.exists(&s("A")));
        assert_eq!(g.len(), 1);
        assert!(!g.is_empty());
        assert!(g.parents(&s("A")).expect("root").is_empty());
        assert!(g.children(&s("A")).expect("root").is_empty());
    }

    #[test]
    fn reference_scenario() {
        let mut g = graph();

        g.create(s("B"), &s("A")).expect("create B");
        assert_eq!(g.children(&s("A")).expect("A"), vec![s("B")]);
        assert_eq!(g.parents(&s("B")).expect("B"), vec![s("A")]);

        g.create_with_parents(s("C"), &[s("A"), s("B")])
            .expect("create C");
        assert_eq!(g.parents(&s("C")).expect("C"), vec![s("A"), s("B")]);

        g.remove(&s("B")).expect("remove B");
        assert!(!g.exists(&s("B")));
        assert_eq!(g.children(&s("A")).expect("A"), vec![s("C")]);
        assert!(g.exists(&s("C")));
        assert_eq!(g.parents(&s("C")).expect("C"), vec![s("A")]);
    }

    #[test]
    fn get_mut_edits_payload_in_place() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("create");
        g.get_mut(&s("B")).expect("B").title = "On Citations".into();
        assert_eq!(g.get(&s("B")).expect("B").title, "On Citations");
        assert_eq!(g.get(&s("B")).expect("B").id, "B");
    }

    #[test]
    fn queries_on_missing_ids_fail_not_found() {
        let mut g = graph();
        let missing = s("Z");
        assert_eq!(
            g.get(&missing).expect_err("get").code(),
            ErrorCode::PublicationNotFound
        );
        assert_eq!(
            g.get_mut(&missing).expect_err("get_mut").code(),
            ErrorCode::PublicationNotFound
        );
        assert_eq!(
            g.parents(&missing).expect_err("parents").code(),
            ErrorCode::PublicationNotFound
        );
        assert_eq!(
            g.children(&missing).expect_err("children").code(),
            ErrorCode::PublicationNotFound
        );
    }

    #[test]
    fn create_checks_duplicate_before_parent() {
        let mut g = graph();
        let err = g.create(s("A"), &s("missing")).expect_err("dup");
        assert!(matches!(err, GraphError::PublicationAlreadyCreated(_)));
    }

    #[test]
    fn create_with_empty_parents_checked_first() {
        let mut g = graph();
        let err = g.create_with_parents(s("A"), &[]).expect_err("empty");
        assert_eq!(err, GraphError::EmptyParentList);
    }

    #[test]
    fn create_with_missing_parent_leaves_no_orphan() {
        let mut g = graph();
        let err = g.create(s("B"), &s("X")).expect_err("missing");
        assert!(matches!(err, GraphError::PublicationNotFound(_)));
        assert!(!g.exists(&s("B")));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn multi_parent_create_is_all_or_nothing() {
        let mut g = graph();
        g.create(s("P1"), &s("A")).expect("p1");
        g.create(s("P3"), &s("A")).expect("p3");

        let err = g
            .create_with_parents(s("N"), &[s("P1"), s("P2"), s("P3")])
            .expect_err("missing p2");
        assert!(matches!(err, GraphError::PublicationNotFound(_)));
        assert!(!g.exists(&s("N")));
        assert!(g.children(&s("P1")).expect("p1").is_empty());
    }

    #[test]
    fn link_failure_mid_create_rolls_back_earlier_edges() {
        let config = GraphConfig {
            limits: GraphLimits {
                max_publications: None,
                max_citations_received: Some(1),
            },
        };
        let mut g: CitationGraph<Paper> = CitationGraph::with_config(s("A"), &config);
        g.create(s("P1"), &s("A")).expect("p1");
        g.create(s("P2"), &s("P1")).expect("p2");
        // P1 is now saturated; P2 still has room, so the first link succeeds.

        let err = g
            .create_with_parents(s("N"), &[s("P2"), s("P1")])
            .expect_err("saturated");
        assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        assert!(!g.exists(&s("N")));
        assert!(g.children(&s("P2")).expect("P2").is_empty());
        assert_eq!(g.children(&s("P1")).expect("P1"), vec![s("P2")]);
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn back_reference_failure_on_second_parent_rolls_back_create() {
        let mut g = graph();
        g.create(s("P1"), &s("A")).expect("p1");
        g.create(s("P2"), &s("A")).expect("p2");

        // P1's edge is recorded in full; P2's back-reference fails.
        g.store.faults.parent_list_after = Some(1);
        let err = g
            .create_with_parents(s("N"), &[s("P1"), s("P2")])
            .expect_err("parent list fault");
        assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        assert!(!g.exists(&s("N")));
        assert!(g.children(&s("P1")).expect("P1").is_empty());
        assert!(g.children(&s("P2")).expect("P2").is_empty());
        assert_eq!(g.len(), 3);
        assert!(crate::verify::verify_graph(&g).is_ok());

        g.create_with_parents(s("N"), &[s("P1"), s("P2")])
            .expect("create after fault");
        assert_eq!(g.parents(&s("N")).expect("N"), vec![s("P1"), s("P2")]);
    }

    #[test]
    fn back_reference_failure_leaves_citation_unrecorded() {
        let mut g = graph();
        g.create(s("P"), &s("A")).expect("p");
        g.create(s("C"), &s("A")).expect("c");

        g.store.faults.parent_list_after = Some(0);
        let err = g.add_citation(&s("C"), &s("P")).expect_err("parent list fault");
        assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        assert!(g.children(&s("P")).expect("P").is_empty());
        assert_eq!(g.parents(&s("C")).expect("C"), vec![s("A")]);
        assert!(crate::verify::verify_graph(&g).is_ok());
    }

    #[test]
    fn publication_limit_rejects_create() {
        let config = GraphConfig {
            limits: GraphLimits {
                max_publications: NonZeroUsize::new(2),
                max_citations_received: None,
            },
        };
        let mut g: CitationGraph<Paper> = CitationGraph::with_config(s("A"), &config);
        g.create(s("B"), &s("A")).expect("fits");
        let err = g.create(s("C"), &s("A")).expect_err("full");
        assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        assert!(!g.exists(&s("C")));

        g.remove(&s("B")).expect("remove");
        g.create(s("C"), &s("A")).expect("room again");
    }

    #[test]
    fn duplicate_parent_ids_collapse() {
        let mut g = graph();
        g.create_with_parents(s("B"), &[s("A"), s("A")])
            .expect("create");
        assert_eq!(g.parents(&s("B")).expect("B"), vec![s("A")]);
        assert_eq!(g.children(&s("A")).expect("A"), vec![s("B")]);
    }

    #[test]
    fn add_citation_is_idempotent() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        g.create(s("C"), &s("A")).expect("C");

        g.add_citation(&s("C"), &s("B")).expect("cite");
        g.add_citation(&s("C"), &s("B")).expect("cite again");

        assert_eq!(g.parents(&s("C")).expect("C"), vec![s("A"), s("B")]);
        assert_eq!(g.children(&s("B")).expect("B"), vec![s("C")]);
    }

    #[test]
    fn add_citation_requires_both_ends() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        assert!(matches!(
            g.add_citation(&s("B"), &s("X")),
            Err(GraphError::PublicationNotFound(_))
        ));
        assert!(matches!(
            g.add_citation(&s("X"), &s("B")),
            Err(GraphError::PublicationNotFound(_))
        ));
    }

    #[test]
    fn add_citation_rejects_cycles() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        g.create(s("C"), &s("B")).expect("C");

        let err = g.add_citation(&s("A"), &s("C")).expect_err("cycle");
        assert_eq!(err.code(), ErrorCode::CitationCycle);
        let err = g.add_citation(&s("B"), &s("B")).expect_err("self");
        assert_eq!(err.code(), ErrorCode::CitationCycle);

        assert!(g.parents(&s("A")).expect("A").is_empty());
        assert_eq!(g.parents(&s("B")).expect("B"), vec![s("A")]);
    }

    #[test]
    fn add_citation_to_newer_publication_is_allowed_when_acyclic() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        g.create(s("C"), &s("A")).expect("C");
        g.add_citation(&s("B"), &s("C")).expect("B cites newer C");
        assert_eq!(g.parents(&s("B")).expect("B"), vec![s("A"), s("C")]);
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        let err = g.remove(&s("A")).expect_err("root");
        assert!(matches!(err, GraphError::TriedToRemoveRoot(_)));
        assert_eq!(g.ids(), vec![s("A"), s("B")]);
    }

    #[test]
    fn remove_missing_fails_not_found() {
        let mut g = graph();
        assert!(matches!(
            g.remove(&s("Q")),
            Err(GraphError::PublicationNotFound(_))
        ));
    }

    #[test]
    fn remove_cascades_through_single_owner_chain() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        g.create(s("C"), &s("B")).expect("C");
        g.create(s("D"), &s("C")).expect("D");

        let released = g.remove(&s("B")).expect("remove");
        assert_eq!(released, vec![s("B"), s("C"), s("D")]);
        assert_eq!(g.ids(), vec![s("A")]);
    }

    #[test]
    fn remove_spares_child_with_surviving_parent() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        g.create_with_parents(s("C"), &[s("A"), s("B")])
            .expect("C");

        assert_eq!(g.remove(&s("B")).expect("remove"), vec![s("B")]);
        assert!(g.exists(&s("C")));
        assert_eq!(g.parents(&s("C")).expect("C"), vec![s("A")]);
    }

    #[test]
    fn removed_id_can_be_created_again() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        g.remove(&s("B")).expect("remove");
        g.create(s("B"), &s("A")).expect("recreate");
        assert_eq!(g.children(&s("A")).expect("A"), vec![s("B")]);
    }

    #[test]
    fn long_chain_release_does_not_recurse() {
        let mut g: CitationGraph<Paper> = CitationGraph::new(s("root"));
        let mut previous = s("root");
        for n in 0..50_000 {
            let id = format!("p{n}");
            g.create(id.clone(), &previous).expect("chain");
            previous = id;
        }
        assert_eq!(g.len(), 50_001);

        let released = g.remove(&s("p0")).expect("remove");
        assert_eq!(released.len(), 50_000);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn graph_is_movable() {
        let mut g = graph();
        g.create(s("B"), &s("A")).expect("B");
        let moved = g;
        assert!(moved.exists(&s("B")));
        assert_eq!(moved.root_id(), "A");
    }
}
