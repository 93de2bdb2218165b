use std::collections::BTreeSet;

use citegraph_core::{ErrorCode, verify_graph};

use crate::SimGraph;
use crate::model::ReferenceModel;
use crate::workload::Op;

// ── Core result types ─────────────────────────────────────────────────────────

/// Oracle result for an invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    /// Detailed description of every invariant that was violated.
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    /// Construct a passing result.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    /// Construct a result from collected violations.
    #[must_use]
    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    /// Merge another result into this one (failures accumulate).
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

// ── Invariant violation diagnostics ──────────────────────────────────────────

/// Diagnostic information for a single failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Graph and model disagree on whether (and how) an op fails.
    Outcome {
        step: usize,
        op: String,
        graph: Option<ErrorCode>,
        model: Option<ErrorCode>,
    },

    /// A remove released a different set of publications than expected.
    Released {
        step: usize,
        graph: Vec<String>,
        model: Vec<String>,
    },

    /// The set of live publications differs.
    AliveSet {
        step: usize,
        only_in_graph: Vec<String>,
        only_in_model: Vec<String>,
    },

    /// A publication's parent list differs (order included).
    Parents {
        step: usize,
        id: String,
        graph: Vec<String>,
        model: Vec<String>,
    },

    /// A publication's child set differs.
    Children {
        step: usize,
        id: String,
        graph: Vec<String>,
        model: Vec<String>,
    },

    /// The graph's own integrity checker found a problem.
    Integrity { step: usize, detail: String },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outcome {
                step,
                op,
                graph,
                model,
            } => write!(
                f,
                "Outcome: step {step} `{op}` graph={} model={}",
                code_label(*graph),
                code_label(*model)
            ),
            Self::Released { step, graph, model } => {
                write!(f, "Released: step {step} graph={graph:?} model={model:?}")
            }
            Self::AliveSet {
                step,
                only_in_graph,
                only_in_model,
            } => write!(
                f,
                "AliveSet: step {step} only_in_graph={only_in_graph:?} only_in_model={only_in_model:?}"
            ),
            Self::Parents {
                step,
                id,
                graph,
                model,
            } => write!(f, "Parents: step {step} {id} graph={graph:?} model={model:?}"),
            Self::Children {
                step,
                id,
                graph,
                model,
            } => write!(f, "Children: step {step} {id} graph={graph:?} model={model:?}"),
            Self::Integrity { step, detail } => write!(f, "Integrity: step {step} {detail}"),
        }
    }
}

fn code_label(code: Option<ErrorCode>) -> &'static str {
    code.map_or("ok", ErrorCode::code)
}

/// What the graph did with one op, plus the oracle's verdict on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCheck {
    /// Released ids (sorted) on success, the graph's error code otherwise.
    pub outcome: Result<Vec<String>, ErrorCode>,
    pub result: OracleResult,
}

// ── Oracle ────────────────────────────────────────────────────────────────────

/// Differential oracle between a [`SimGraph`] and a [`ReferenceModel`].
///
/// # Checks
///
/// 1. **Outcome**: both sides accept or reject each op with the same code.
/// 2. **Release set**: a remove releases exactly the unreachable publications.
/// 3. **State**: live sets, parent lists and child sets match.
/// 4. **Integrity**: [`verify_graph`] reports nothing.
pub struct GraphOracle;

impl GraphOracle {
    /// Apply `op` to both sides and compare the immediate outcome.
    #[must_use]
    pub fn step(graph: &mut SimGraph, model: &mut ReferenceModel, step: usize, op: &Op) -> StepCheck {
        let graph_outcome = op.apply(graph).map_err(|err| err.code()).map(|mut released| {
            released.sort();
            released
        });
        let model_outcome = model.apply(op);

        let mut violations = Vec::new();
        match (&graph_outcome, &model_outcome) {
            (Ok(released), Ok(expected)) if released != expected => {
                violations.push(InvariantViolation::Released {
                    step,
                    graph: released.clone(),
                    model: expected.clone(),
                });
            }
            (Ok(_), Ok(_)) => {}
            (Err(code), Err(expected)) if code == expected => {}
            _ => violations.push(InvariantViolation::Outcome {
                step,
                op: op.to_string(),
                graph: graph_outcome.as_ref().err().copied(),
                model: model_outcome.as_ref().err().copied(),
            }),
        }

        StepCheck {
            outcome: graph_outcome,
            result: OracleResult::from_violations(violations),
        }
    }

    /// Compare the full state of both sides.
    #[must_use]
    pub fn check_state(graph: &SimGraph, model: &ReferenceModel, step: usize) -> OracleResult {
        let mut violations = Vec::new();

        let graph_ids: BTreeSet<String> = graph.ids().into_iter().collect();
        let model_ids: BTreeSet<String> = model.alive_ids().into_iter().collect();
        if graph_ids != model_ids {
            violations.push(InvariantViolation::AliveSet {
                step,
                only_in_graph: graph_ids.difference(&model_ids).cloned().collect(),
                only_in_model: model_ids.difference(&graph_ids).cloned().collect(),
            });
        }

        for id in graph_ids.intersection(&model_ids) {
            let parents = graph.parents(id).unwrap_or_default();
            let expected = model.parents_of(id).map(<[String]>::to_vec).unwrap_or_default();
            if parents != expected {
                violations.push(InvariantViolation::Parents {
                    step,
                    id: id.clone(),
                    graph: parents,
                    model: expected,
                });
            }

            let mut children = graph.children(id).unwrap_or_default();
            children.sort();
            let expected = model.children_of(id);
            if children != expected {
                violations.push(InvariantViolation::Children {
                    step,
                    id: id.clone(),
                    graph: children,
                    model: expected,
                });
            }
        }

        let report = verify_graph(graph);
        violations.extend(
            report
                .violations
                .into_iter()
                .map(|violation| InvariantViolation::Integrity {
                    step,
                    detail: format!("{violation:?}"),
                }),
        );

        OracleResult::from_violations(violations)
    }
}
