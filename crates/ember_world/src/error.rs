//! Error types for the simulation core.
//!
//! Errors are categorized by the subsystem they originate in. Configuration
//! and zone errors are recoverable at world load (the failing zone is skipped);
//! everything else is logged at the owning task and never propagated across
//! task boundaries.

use crate::types::{ShardId, TemplateId};

/// Enumeration of simulation-core errors.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Malformed or inconsistent world configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A spawn zone that cannot be registered (bad count, bad rect)
    #[error("Zone rejected: {0}")]
    Zone(String),

    /// The referenced mob template does not exist in the store
    #[error("Mob template {0} not found")]
    TemplateMissing(TemplateId),

    /// The bounded per-shard sight-id pool has no free ids left
    #[error("Sight id pool exhausted on {0}")]
    SightIdExhausted(ShardId),

    /// World store access failure
    #[error("Store error: {0}")]
    Store(String),

    /// Intent payload that does not decode into the expected shape
    #[error("Malformed intent payload: {0}")]
    Intent(String),

    /// Broadcast bus failure (dispatch task gone)
    #[error("Bus error: {0}")]
    Bus(String),
}
