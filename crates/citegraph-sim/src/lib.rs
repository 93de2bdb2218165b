//! citegraph-sim library.
//!
//! Seeded workloads are applied to a [`CitationGraph`] and to a deliberately
//! naive [`model::ReferenceModel`] side by side; the [`oracle`] compares them
//! after every step. The [`script`] module runs hand-written command files
//! against a graph for manual exploration.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod campaign;
pub mod config;
pub mod model;
pub mod oracle;
pub mod rng;
pub mod script;
pub mod workload;

use citegraph_core::{CitationGraph, Publication};
use serde::{Deserialize, Serialize};

pub use campaign::{CampaignConfig, CampaignReport, SeedRun, replay_seed, run_campaign};
pub use config::{SimConfig, load_sim_config};
pub use workload::{Op, OpMix, WorkloadGenerator};

/// Payload used by every simulated graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimPaper {
    pub id: String,
    /// Number of times the payload was edited through `get_mut`.
    pub edits: u32,
}

impl Publication for SimPaper {
    type Id = String;

    fn from_id(id: &String) -> Self {
        Self {
            id: id.clone(),
            edits: 0,
        }
    }

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Graph type driven by the simulator.
pub type SimGraph = CitationGraph<SimPaper>;

/// Identifier of the root publication in every simulated graph.
pub const ROOT_ID: &str = "root";
