//! Diagram and document exporters.
//!
//! Each `ExportFormat` maps to exactly one `Renderer`; adding a format means
//! adding a variant and one arm in `ExportFormat::renderer`.

mod d2;
mod data;
mod mermaid;

pub use d2::D2Renderer;
pub use data::{JsonRenderer, YamlRenderer};
pub use mermaid::MermaidRenderer;

use crate::model::{ArchSpec, Component, Connection};
use clap::ValueEnum;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize spec as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to serialize spec as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub trait Renderer {
    fn render(&self, spec: &ArchSpec) -> Result<String, ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ExportFormat {
    Mermaid,
    D2,
    Json,
    Yaml,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Mermaid,
        ExportFormat::D2,
        ExportFormat::Json,
        ExportFormat::Yaml,
    ];

    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            ExportFormat::Mermaid => Box::new(MermaidRenderer),
            ExportFormat::D2 => Box::new(D2Renderer),
            ExportFormat::Json => Box::new(JsonRenderer),
            ExportFormat::Yaml => Box::new(YamlRenderer),
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mermaid => "mmd",
            ExportFormat::D2 => "d2",
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Mermaid => write!(f, "mermaid"),
            ExportFormat::D2 => write!(f, "d2"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Render `spec` in the given format.
pub fn export(spec: &ArchSpec, format: ExportFormat) -> Result<String, ExportError> {
    format.renderer().render(spec)
}

/// Diagram group: either a boundary or, when the spec has none, a tier.
pub(crate) struct Group<'a> {
    pub id: String,
    pub label: String,
    pub members: Vec<&'a Component>,
}

/// Components grouped for diagrams, plus those outside every group.
pub(crate) fn group_components(spec: &ArchSpec) -> (Vec<Group<'_>>, Vec<&Component>) {
    if spec.boundaries.is_empty() {
        let groups = spec
            .tiers()
            .into_iter()
            .map(|(tier, members)| Group {
                id: format!("tier_{}", tier).replace('-', "neg"),
                label: format!("Tier {} - {}", tier, tier_label(tier)),
                members,
            })
            .collect();
        return (groups, Vec::new());
    }

    let membership = spec.boundary_membership();
    let groups = spec
        .boundaries
        .iter()
        .map(|b| Group {
            id: safe_id(&b.id),
            label: b.display_label().to_string(),
            members: spec
                .components
                .iter()
                .filter(|c| membership.get(c.id.as_str()) == Some(&b.id.as_str()))
                .collect(),
        })
        .collect();
    let unassigned = spec
        .components
        .iter()
        .filter(|c| !membership.contains_key(c.id.as_str()))
        .collect();
    (groups, unassigned)
}

pub(crate) fn tier_label(tier: i32) -> String {
    match tier {
        0 => "Edge".to_string(),
        1 => "Ingress".to_string(),
        2 => "Compute".to_string(),
        3 => "Data".to_string(),
        4 => "Storage".to_string(),
        n => format!("Tier {}", n),
    }
}

/// Diagram identifier: anything outside `[A-Za-z0-9_]` becomes `_`.
pub(crate) fn safe_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// `label (protocol/port)`, or just the parts that are set.
pub(crate) fn edge_label(conn: &Connection) -> String {
    let mut parts = Vec::new();
    if let Some(protocol) = conn.protocol.as_deref().filter(|p| !p.is_empty()) {
        parts.push(protocol.to_string());
    }
    if let Some(port) = conn.port {
        parts.push(port.to_string());
    }
    let transport = parts.join("/");
    match (conn.label.is_empty(), transport.is_empty()) {
        (true, _) => transport,
        (false, true) => conn.label.clone(),
        (false, false) => format!("{} ({})", conn.label, transport),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeShape {
    Rectangle,
    Cylinder,
    Queue,
    Hexagon,
}

pub(crate) fn node_shape(service: &str) -> NodeShape {
    match service {
        "rds" | "aurora" | "dynamodb" | "elasticache" | "redshift" | "s3" | "cloud_sql"
        | "firestore" | "spanner" | "bigquery" | "memorystore" | "cloud_storage" | "azure_sql"
        | "cosmos_db" | "azure_cache" | "blob_storage" => NodeShape::Cylinder,
        "sqs" | "sns" | "kinesis" | "pub_sub" | "service_bus" | "event_hubs" => NodeShape::Queue,
        "waf" | "cognito" | "iam" | "kms" | "cloud_armor" | "azure_waf" | "azure_ad"
        | "key_vault" => NodeShape::Hexagon,
        _ => NodeShape::Rectangle,
    }
}
