//! Campaign runner for deterministic simulation campaigns.
//!
//! Executes many seeds, each driving a fresh graph and reference model
//! through the same generated workload, collecting pass/fail results and
//! identifying the first failing seed for replay.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::model::ReferenceModel;
use crate::oracle::{GraphOracle, OracleResult};
use crate::workload::{Op, OpMix, WorkloadGenerator};
use crate::{ROOT_ID, SimGraph};

/// Campaign-level configuration controlling how many seeds to run and how
/// long each one is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// First seed to execute.
    #[serde(default)]
    pub seed_start: u64,
    /// Number of consecutive seeds to execute.
    #[serde(default = "default_seed_count")]
    pub seed_count: u64,
    /// Operations applied per seed.
    #[serde(default = "default_ops_per_seed")]
    pub ops_per_seed: usize,
    /// Compare full state every N operations (outcomes are always compared).
    #[serde(default = "default_check_every")]
    pub check_every: usize,
    #[serde(default)]
    pub mix: OpMix,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            seed_start: 0,
            seed_count: default_seed_count(),
            ops_per_seed: default_ops_per_seed(),
            check_every: default_check_every(),
            mix: OpMix::default(),
        }
    }
}

impl CampaignConfig {
    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_count == 0 {
            bail!("seed_count must be > 0");
        }
        if self.seed_start.checked_add(self.seed_count).is_none() {
            bail!("seed range overflows u64");
        }
        if self.ops_per_seed == 0 {
            bail!("ops_per_seed must be > 0");
        }
        if self.check_every == 0 {
            bail!("check_every must be > 0");
        }
        if self.mix.explicit_total() > 100 {
            bail!(
                "create/cite/remove percentages add up to {} (> 100)",
                self.mix.explicit_total()
            );
        }
        if self.mix.invalid_percent > 100 {
            bail!("invalid_percent must be <= 100");
        }
        Ok(())
    }
}

/// One applied operation in a seed's trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: usize,
    pub op: Op,
    /// `"ok"` or the error code reported by the graph.
    pub outcome: String,
    /// Publications released by this step.
    pub released: Vec<String>,
}

/// Result of running a single seed.
#[derive(Debug, Clone)]
pub struct SeedRun {
    pub seed: u64,
    pub trace: Vec<TraceStep>,
    /// Oracle verdict; the run stops at the first failing step.
    pub oracle: OracleResult,
    /// Live publications at the end of the run.
    pub final_len: usize,
}

impl SeedRun {
    fn rejected(&self) -> usize {
        self.trace.iter().filter(|t| t.outcome != "ok").count()
    }

    fn released(&self) -> usize {
        self.trace.iter().map(|t| t.released.len()).sum()
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    /// Step at which the first violation appeared.
    pub step: usize,
    pub violations: Vec<String>,
}

/// Aggregate report produced by a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First seed that failed (for prioritized replay).
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    pub ops_applied: usize,
    /// Operations the graph rejected with an error (expected and checked).
    pub ops_rejected: usize,
    pub publications_released: usize,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run a full campaign across all seeds in the config.
///
/// # Errors
///
/// Returns an error if config validation fails.
pub fn run_campaign(config: &SimConfig) -> Result<CampaignReport> {
    config.campaign.validate()?;
    let campaign = &config.campaign;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        ops_applied: 0,
        ops_rejected: 0,
        publications_released: 0,
    };

    for seed in campaign.seed_start..campaign.seed_start + campaign.seed_count {
        let run = run_seed(seed, config);
        report.seeds_run += 1;
        report.ops_applied += run.trace.len();
        report.ops_rejected += run.rejected();
        report.publications_released += run.released();

        if run.oracle.passed {
            report.seeds_passed += 1;
            continue;
        }

        warn!(seed, violations = run.oracle.violations.len(), "seed failed");
        if report.first_failure.is_none() {
            report.first_failure = Some(seed);
        }
        report.failures.push(SeedFailure {
            seed,
            step: run.trace.len().saturating_sub(1),
            violations: run.oracle.violations.iter().map(ToString::to_string).collect(),
        });
    }

    info!(
        seeds = report.seeds_run,
        passed = report.seeds_passed,
        ops = report.ops_applied,
        "campaign finished"
    );
    Ok(report)
}

/// Replay a single seed with its full trace for debugging.
///
/// # Errors
///
/// Returns an error when config validation fails.
pub fn replay_seed(seed: u64, config: &SimConfig) -> Result<SeedRun> {
    config.campaign.validate()?;
    Ok(run_seed(seed, config))
}

fn run_seed(seed: u64, config: &SimConfig) -> SeedRun {
    let campaign = &config.campaign;
    let mut graph = SimGraph::with_config(ROOT_ID.to_string(), &config.graph);
    let mut model = ReferenceModel::new(ROOT_ID, config.graph.limits);
    let mut generator = WorkloadGenerator::new(seed, campaign.mix);
    let mut trace = Vec::with_capacity(campaign.ops_per_seed);
    let mut oracle = OracleResult::pass();

    for step in 0..campaign.ops_per_seed {
        let op = generator.next_op(&model);

        let check = GraphOracle::step(&mut graph, &mut model, step, &op);
        let mut result = check.result;
        let last = step + 1 == campaign.ops_per_seed;
        if last || (step + 1) % campaign.check_every == 0 {
            result = result.merge(GraphOracle::check_state(&graph, &model, step));
        }

        let (outcome, released) = match check.outcome {
            Ok(released) => (String::from("ok"), released),
            Err(code) => (code.code().to_string(), Vec::new()),
        };
        debug!(seed, step, op = %op, outcome = %outcome, released = released.len(), "applied");
        trace.push(TraceStep {
            step,
            op,
            outcome,
            released,
        });

        oracle = oracle.merge(result);
        if !oracle.passed {
            break;
        }
    }

    SeedRun {
        seed,
        trace,
        oracle,
        final_len: graph.len(),
    }
}

const fn default_seed_count() -> u64 {
    100
}

const fn default_ops_per_seed() -> usize {
    200
}

const fn default_check_every() -> usize {
    1
}
