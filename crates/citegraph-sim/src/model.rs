//! Naive reference model of the citation graph.
//!
//! The model stores nothing but each live publication's parent list and
//! recomputes liveness from scratch after every removal: a publication is
//! alive iff it can be reached from the root by following citations
//! backwards. That definition is independent of the graph's
//! ownership-driven cascade, which is exactly what makes it a useful oracle.

use std::collections::{BTreeMap, BTreeSet};

use citegraph_core::{ErrorCode, GraphLimits};

use crate::workload::Op;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceModel {
    root: String,
    /// Live publication -> the publications it cites, in citation order.
    parents: BTreeMap<String, Vec<String>>,
    limits: GraphLimits,
}

impl ReferenceModel {
    #[must_use]
    pub fn new(root: &str, limits: GraphLimits) -> Self {
        let mut parents = BTreeMap::new();
        parents.insert(root.to_string(), Vec::new());
        Self {
            root: root.to_string(),
            parents,
            limits,
        }
    }

    /// Live identifiers, sorted.
    #[must_use]
    pub fn alive_ids(&self) -> Vec<String> {
        self.parents.keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    /// Parents of `id` in citation order.
    #[must_use]
    pub fn parents_of(&self, id: &str) -> Option<&[String]> {
        self.parents.get(id).map(Vec::as_slice)
    }

    /// Children of `id`, sorted.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<String> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.iter().any(|p| p == id))
            .map(|(child, _)| child.clone())
            .collect()
    }

    /// Apply `op` and return the expected outcome plus the released ids
    /// (sorted) for a successful remove.
    ///
    /// # Errors
    ///
    /// Returns the error code the graph is expected to report.
    pub fn apply(&mut self, op: &Op) -> Result<Vec<String>, ErrorCode> {
        match op {
            Op::Create { id, parents } => self.create(id, parents).map(|()| Vec::new()),
            Op::Cite { child, parent } => self.cite(child, parent).map(|()| Vec::new()),
            Op::Remove { id } => self.remove(id),
            Op::Touch { id } => {
                if self.contains(id) {
                    Ok(Vec::new())
                } else {
                    Err(ErrorCode::PublicationNotFound)
                }
            }
        }
    }

    fn create(&mut self, id: &str, parents: &[String]) -> Result<(), ErrorCode> {
        if parents.is_empty() {
            return Err(ErrorCode::PublicationNotFound);
        }
        if self.contains(id) {
            return Err(ErrorCode::PublicationAlreadyCreated);
        }
        if parents.iter().any(|p| !self.contains(p)) {
            return Err(ErrorCode::PublicationNotFound);
        }
        if let Some(max) = self.limits.max_publications {
            if self.parents.len() >= max.get() {
                return Err(ErrorCode::CapacityExceeded);
            }
        }

        let mut distinct: Vec<String> = Vec::new();
        for parent in parents {
            if !distinct.contains(parent) {
                distinct.push(parent.clone());
            }
        }
        if distinct.iter().any(|p| self.saturated(p)) {
            return Err(ErrorCode::CapacityExceeded);
        }

        self.parents.insert(id.to_string(), distinct);
        Ok(())
    }

    fn cite(&mut self, child: &str, parent: &str) -> Result<(), ErrorCode> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(ErrorCode::PublicationNotFound);
        }
        if self.reaches(child, parent) {
            return Err(ErrorCode::CitationCycle);
        }
        if self.parents_of(child).is_some_and(|ps| ps.iter().any(|p| p == parent)) {
            return Ok(());
        }
        if self.saturated(parent) {
            return Err(ErrorCode::CapacityExceeded);
        }
        if let Some(ps) = self.parents.get_mut(child) {
            ps.push(parent.to_string());
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<Vec<String>, ErrorCode> {
        if !self.contains(id) {
            return Err(ErrorCode::PublicationNotFound);
        }
        if id == self.root {
            return Err(ErrorCode::TriedToRemoveRoot);
        }

        if let Some(ps) = self.parents.get_mut(id) {
            ps.clear();
        }

        let reachable = self.reachable();
        let released: Vec<String> = self
            .parents
            .keys()
            .filter(|k| !reachable.contains(*k))
            .cloned()
            .collect();

        for dead in &released {
            self.parents.remove(dead);
        }
        for ps in self.parents.values_mut() {
            ps.retain(|p| reachable.contains(p));
        }
        Ok(released)
    }

    fn saturated(&self, parent: &str) -> bool {
        self.limits
            .max_citations_received
            .is_some_and(|max| self.children_of(parent).len() >= max)
    }

    /// Whether `to` is `from` or one of the publications citing it,
    /// transitively.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current.clone()) {
                stack.extend(self.children_of(&current));
            }
        }
        false
    }

    fn reachable(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.root.clone()];
        while let Some(current) = stack.pop() {
            if seen.insert(current.clone()) {
                stack.extend(self.children_of(&current));
            }
        }
        seen
    }
}
