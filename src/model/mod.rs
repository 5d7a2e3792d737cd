mod component;
mod cost;
mod issue;
mod spec;

pub use component::{
    Boundary, Component, ConfigMap, Connection, DEFAULT_TIER, MAX_ID_LEN, Provider, is_iac_safe,
    sanitize_id, suffixed_id,
};
pub(crate) use component::is_truthy;
pub use cost::{ComponentCost, Constraints, CostEstimate, format_usd, round2};
pub use issue::{Issue, IssueSeverity, LintRule};
pub use spec::{Alternative, ArchSpec, ArchVersion};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("{kind} id {id:?} is not IaC-safe (must match [a-zA-Z_][a-zA-Z0-9_-]*)")]
    InvalidId { kind: &'static str, id: String },
    #[error("Duplicate component id: {0}")]
    DuplicateComponent(String),
    #[error("Duplicate boundary id: {0}")]
    DuplicateBoundary(String),
    #[error("Duplicate connection {from} -> {to}")]
    DuplicateConnection { from: String, to: String },
    #[error("Failed to parse YAML spec: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to parse JSON spec: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
