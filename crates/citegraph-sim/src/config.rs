//! Simulator configuration: campaign shape plus the graph limits under test.
//!
//! ```toml
//! [campaign]
//! seed_count = 500
//! ops_per_seed = 300
//!
//! [campaign.mix]
//! create_percent = 60
//! invalid_percent = 5
//!
//! [graph.limits]
//! max_citations_received = 4
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use citegraph_core::GraphConfig;
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub campaign: CampaignConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Load a simulator config from `path`, or the defaults when no path is
/// given. Unlike the graph config, an explicitly named file must exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or describes
/// an invalid campaign.
pub fn load_sim_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = toml::from_str::<SimConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .campaign
        .validate()
        .with_context(|| format!("Invalid campaign in {}", path.display()))?;
    Ok(config)
}
