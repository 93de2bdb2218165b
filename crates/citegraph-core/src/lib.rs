//! citegraph-core library.
//!
//! An in-memory, rooted citation DAG. Publications own the publications that
//! cite them, so removing a publication releases everything that cited only
//! it. See [`graph`] for the public operations; the private `store` module holds the
//! arena and the ownership model.
//!
//! # Conventions
//!
//! - **Errors**: Graph operations return [`GraphError`]; config loading uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod graph;
pub mod publication;
mod store;
pub mod verify;

pub use config::{GraphConfig, GraphLimits};
pub use error::{ErrorCode, GraphError};
pub use graph::CitationGraph;
pub use publication::Publication;
pub use verify::{IntegrityViolation, VerifyReport, verify_graph};
