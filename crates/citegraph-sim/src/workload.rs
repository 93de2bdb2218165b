//! Seeded generation of graph operations.
//!
//! The generator looks at the reference model's live set so most operations
//! hit real publications, and mixes in a configurable share of invalid ones
//! (unknown ids, duplicates, empty parent lists, root removals) so that every
//! failure path of the graph gets exercised too.

use serde::{Deserialize, Serialize};

use crate::SimGraph;
use crate::model::ReferenceModel;
use crate::rng::DeterministicRng;
use citegraph_core::GraphError;

/// One operation against the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Create { id: String, parents: Vec<String> },
    Cite { child: String, parent: String },
    Remove { id: String },
    Touch { id: String },
}

impl Op {
    /// Apply the operation to a real graph.
    ///
    /// Returns the identifiers released by a successful remove, empty
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns whatever [`GraphError`] the graph reports.
    pub fn apply(&self, graph: &mut SimGraph) -> Result<Vec<String>, GraphError> {
        match self {
            Self::Create { id, parents } => {
                let created = match parents.as_slice() {
                    [parent] => graph.create(id.clone(), parent),
                    _ => graph.create_with_parents(id.clone(), parents),
                };
                created.map(|()| Vec::new())
            }
            Self::Cite { child, parent } => graph.add_citation(child, parent).map(|()| Vec::new()),
            Self::Remove { id } => graph.remove(id),
            Self::Touch { id } => graph.get_mut(id).map(|paper| {
                paper.edits = paper.edits.saturating_add(1);
                Vec::new()
            }),
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create { id, parents } => write!(f, "create {id} {}", parents.join(",")),
            Self::Cite { child, parent } => write!(f, "cite {child} {parent}"),
            Self::Remove { id } => write!(f, "remove {id}"),
            Self::Touch { id } => write!(f, "touch {id}"),
        }
    }
}

/// Relative weights of each operation kind, in percent.
///
/// Whatever remains after create, cite and remove goes to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpMix {
    pub create_percent: u8,
    pub cite_percent: u8,
    pub remove_percent: u8,
    /// Chance that an id in an operation is replaced by an invalid one.
    pub invalid_percent: u8,
    /// Upper bound on parents per create.
    pub max_parents: usize,
}

impl Default for OpMix {
    fn default() -> Self {
        Self {
            create_percent: 55,
            cite_percent: 20,
            remove_percent: 15,
            invalid_percent: 8,
            max_parents: 3,
        }
    }
}

impl OpMix {
    /// Sum of the explicit weights; must not exceed 100.
    #[must_use]
    pub fn explicit_total(&self) -> u16 {
        u16::from(self.create_percent) + u16::from(self.cite_percent) + u16::from(self.remove_percent)
    }
}

/// Produces a reproducible stream of [`Op`]s for one seed.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    rng: DeterministicRng,
    mix: OpMix,
    next_id: u64,
}

impl WorkloadGenerator {
    #[must_use]
    pub const fn new(seed: u64, mix: OpMix) -> Self {
        Self {
            rng: DeterministicRng::new(seed),
            mix,
            next_id: 0,
        }
    }

    /// Draw the next operation given the current live set.
    pub fn next_op(&mut self, model: &ReferenceModel) -> Op {
        let alive = model.alive_ids();
        let roll = self.rng.next_bounded(100);
        let create = u64::from(self.mix.create_percent);
        let cite = create + u64::from(self.mix.cite_percent);
        let remove = cite + u64::from(self.mix.remove_percent);

        if roll < create {
            self.create_op(&alive)
        } else if roll < cite {
            Op::Cite {
                child: self.existing_or_invalid(&alive),
                parent: self.existing_or_invalid(&alive),
            }
        } else if roll < remove {
            Op::Remove {
                id: self.existing_or_invalid(&alive),
            }
        } else {
            Op::Touch {
                id: self.existing_or_invalid(&alive),
            }
        }
    }

    fn create_op(&mut self, alive: &[String]) -> Op {
        let id = if self.rng.hit_rate_percent(self.mix.invalid_percent) {
            // Usually a duplicate of a live id.
            self.existing_or_invalid(alive)
        } else {
            self.fresh_id()
        };

        if self.rng.hit_rate_percent(self.mix.invalid_percent / 2) {
            return Op::Create {
                id,
                parents: Vec::new(),
            };
        }

        let max = u64::try_from(self.mix.max_parents.max(1)).unwrap_or(1);
        let count = self.rng.next_bounded(max) + 1;
        let parents = (0..count).map(|_| self.existing_or_invalid(alive)).collect();
        Op::Create { id, parents }
    }

    fn existing_or_invalid(&mut self, alive: &[String]) -> String {
        if self.rng.hit_rate_percent(self.mix.invalid_percent) {
            return format!("ghost-{}", self.rng.next_bounded(1000));
        }
        self.rng
            .pick(alive)
            .cloned()
            .unwrap_or_else(|| crate::ROOT_ID.to_string())
    }

    fn fresh_id(&mut self) -> String {
        let id = format!("p{}", self.next_id);
        self.next_id += 1;
        id
    }
}
