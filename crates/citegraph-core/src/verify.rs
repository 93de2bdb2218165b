//! Structural integrity checks for a live citation graph.
//!
//! [`verify_graph`] inspects the node arena and the lookup table directly and
//! reports every broken invariant it finds instead of stopping at the first.
//! It is meant for tests, simulations, and debugging; the graph's own
//! operations never call it.

use std::collections::{HashMap, HashSet};

use crate::graph::CitationGraph;
use crate::publication::Publication;
use crate::store::NodeKey;

/// A single broken invariant, with identifiers rendered via `Debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// `parent` lists `child` as a child, but `child` does not list `parent`.
    MissingBackReference { parent: String, child: String },
    /// `child` lists `parent` as a parent, but `parent` does not own `child`.
    MissingOwnership { parent: String, child: String },
    /// The same edge is recorded twice on one side.
    DuplicateEdge { parent: String, child: String },
    /// An edge points at a slot that is no longer alive.
    DanglingEdge { from: String },
    /// A lookup-table entry resolves to nothing or to another publication.
    StaleIndexEntry { id: String },
    /// A live node is not reachable through the lookup table.
    UnindexedNode { id: String },
    /// A non-root publication has no parents left.
    Orphan { id: String },
    /// The root has parents.
    RootHasParents { id: String },
    /// The payload reports a different identifier than its key.
    PayloadIdMismatch { key: String, payload: String },
    /// A live publication cannot be reached from the root.
    Unreachable { id: String },
}

/// Outcome of [`verify_graph`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerifyReport {
    /// Number of live nodes inspected.
    pub nodes_checked: usize,
    /// Number of edges inspected (counted once, from the owning side).
    pub edges_checked: usize,
    /// Every violation found.
    pub violations: Vec<IntegrityViolation>,
}

impl VerifyReport {
    /// Return `true` when no invariant is broken.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every structural invariant of `graph`.
#[must_use]
pub fn verify_graph<P: Publication>(graph: &CitationGraph<P>) -> VerifyReport {
    let store = graph.store();
    let root = graph.root_key();
    let mut report = VerifyReport::default();

    let live: HashMap<NodeKey, &P::Id> = store.nodes().map(|(key, node)| (key, &node.id)).collect();
    let name = |key: &NodeKey| {
        live.get(key)
            .map_or_else(|| format!("{key:?}"), |id| format!("{id:?}"))
    };

    for (id, key) in store.entries() {
        match store.node(key) {
            Some(node) if node.id == *id => {}
            _ => report
                .violations
                .push(IntegrityViolation::StaleIndexEntry { id: format!("{id:?}") }),
        }
    }

    for (key, node) in store.nodes() {
        report.nodes_checked += 1;

        if store.lookup(&node.id) != Some(key) {
            report.violations.push(IntegrityViolation::UnindexedNode {
                id: format!("{:?}", node.id),
            });
        }

        let payload_id = node.publication.id();
        if payload_id != node.id {
            report.violations.push(IntegrityViolation::PayloadIdMismatch {
                key: format!("{:?}", node.id),
                payload: format!("{payload_id:?}"),
            });
        }

        if key == root {
            if !node.parents.is_empty() {
                report.violations.push(IntegrityViolation::RootHasParents {
                    id: format!("{:?}", node.id),
                });
            }
        } else if node.parents.is_empty() {
            report.violations.push(IntegrityViolation::Orphan {
                id: format!("{:?}", node.id),
            });
        }

        let mut seen = HashSet::new();
        for child in &node.children {
            report.edges_checked += 1;
            if !seen.insert(*child) {
                report.violations.push(IntegrityViolation::DuplicateEdge {
                    parent: name(&key),
                    child: name(child),
                });
            }
            match store.node(*child) {
                Some(child_node) if child_node.parents.contains(&key) => {}
                Some(_) => report.violations.push(IntegrityViolation::MissingBackReference {
                    parent: name(&key),
                    child: name(child),
                }),
                None => report.violations.push(IntegrityViolation::DanglingEdge { from: name(&key) }),
            }
        }

        let mut seen = HashSet::new();
        for parent in &node.parents {
            if !seen.insert(*parent) {
                report.violations.push(IntegrityViolation::DuplicateEdge {
                    parent: name(parent),
                    child: name(&key),
                });
            }
            match store.node(*parent) {
                Some(parent_node) if parent_node.children.contains(&key) => {}
                Some(_) => report.violations.push(IntegrityViolation::MissingOwnership {
                    parent: name(parent),
                    child: name(&key),
                }),
                None => report.violations.push(IntegrityViolation::DanglingEdge { from: name(&key) }),
            }
        }
    }

    let reachable = reachable_from(graph, root);
    let mut unreachable: Vec<String> = live
        .iter()
        .filter(|(key, _)| !reachable.contains(*key))
        .map(|(_, id)| format!("{id:?}"))
        .collect();
    unreachable.sort();
    report.violations.extend(
        unreachable
            .into_iter()
            .map(|id| IntegrityViolation::Unreachable { id }),
    );

    report
}

fn reachable_from<P: Publication>(graph: &CitationGraph<P>, root: NodeKey) -> HashSet<NodeKey> {
    let store = graph.store();
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(key) = stack.pop() {
        if !visited.insert(key) {
            continue;
        }
        if let Some(node) = store.node(key) {
            stack.extend(node.children.iter().copied());
        }
    }
    visited
}
