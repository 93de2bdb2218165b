use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Top-level graph configuration, usually read from a `citegraph.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub limits: GraphLimits,
}

/// Resource limits enforced by the node store.
///
/// Unset limits are unbounded. `max_publications` counts the root, so the
/// smallest possible graph (root only) always fits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLimits {
    #[serde(default)]
    pub max_publications: Option<NonZeroUsize>,
    #[serde(default)]
    pub max_citations_received: Option<usize>,
}

impl GraphLimits {
    /// No limits at all.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_publications: None,
            max_citations_received: None,
        }
    }
}

/// Parse a graph config from TOML text.
///
/// # Errors
///
/// Returns an error if the text is not a valid config document.
pub fn parse_graph_config(content: &str) -> Result<GraphConfig> {
    toml::from_str::<GraphConfig>(content).context("Failed to parse graph config")
}

/// Load a graph config from `path`, falling back to defaults when the file is
/// absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_graph_config(path: &Path) -> Result<GraphConfig> {
    if !path.exists() {
        return Ok(GraphConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<GraphConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
