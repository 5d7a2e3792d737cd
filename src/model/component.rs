use super::SpecError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Open key/value settings attached to a component or boundary.
pub type ConfigMap = BTreeMap<String, Value>;

pub const DEFAULT_TIER: i32 = 2;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Aws,
    Gcp,
    Azure,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Aws => write!(f, "aws"),
            Provider::Gcp => write!(f, "gcp"),
            Provider::Azure => write!(f, "azure"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "gcp" | "google" => Ok(Provider::Gcp),
            "azure" => Ok(Provider::Azure),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// A single cloud service in the architecture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub id: String,
    /// Catalog key, e.g. `ec2` or `cloud_sql`
    pub service: String,
    pub provider: Provider,
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Logical layer: 0 is edge-most, larger values sit further back
    #[serde(default = "default_tier")]
    pub tier: i32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
}

fn default_tier() -> i32 {
    DEFAULT_TIER
}

impl Component {
    /// Build a component, rejecting ids that can't be used as IaC identifiers.
    pub fn new(
        id: impl Into<String>,
        service: impl Into<String>,
        provider: Provider,
        label: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let id = id.into();
        if !is_iac_safe(&id) {
            return Err(SpecError::InvalidId {
                kind: "Component",
                id,
            });
        }
        Ok(Self {
            id,
            service: service.into(),
            provider,
            label: label.into(),
            description: String::new(),
            tier: DEFAULT_TIER,
            config: ConfigMap::new(),
        })
    }

    pub fn with_tier(mut self, tier: i32) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Truthiness of a config flag (`true`, non-zero numbers, non-empty strings).
    pub fn config_flag(&self, key: &str) -> bool {
        self.config.get(key).is_some_and(is_truthy)
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Directed edge between two components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_monthly_gb: Option<f64>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: String::new(),
            protocol: None,
            port: None,
            estimated_monthly_gb: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>, port: Option<u16>) -> Self {
        self.protocol = Some(protocol.into());
        self.port = port;
        self
    }

    pub fn with_monthly_gb(mut self, gb: f64) -> Self {
        self.estimated_monthly_gb = Some(gb);
        self
    }

    /// Diff identity of the connection.
    pub fn key(&self) -> (&str, &str) {
        (self.source.as_str(), self.target.as_str())
    }
}

/// A grouping of components drawn as a box (VPC, subnet, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Boundary {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
}

impl Boundary {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Result<Self, SpecError> {
        let id = id.into();
        if !is_iac_safe(&id) {
            return Err(SpecError::InvalidId {
                kind: "Boundary",
                id,
            });
        }
        Ok(Self {
            id,
            kind: kind.into(),
            label: String::new(),
            component_ids: Vec::new(),
            parent: None,
            config: ConfigMap::new(),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_members<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Display name, falling back to the id.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_-]*`
pub fn is_iac_safe(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Longest id accepted by IaC tools.
pub const MAX_ID_LEN: usize = 64;

/// Turn an arbitrary name into an IaC-safe id (max 64 chars).
pub fn sanitize_id(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches('_');
    let mut safe = if trimmed.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        trimmed.to_string()
    } else {
        format!("svc_{}", trimmed)
    };
    safe.truncate(MAX_ID_LEN);
    safe
}

/// `base` with a `_n` suffix, cutting `base` so the suffix survives the
/// length limit. `base` must already be sanitized.
pub fn suffixed_id(base: &str, n: usize) -> String {
    let suffix = format!("_{}", n);
    let keep = base.len().min(MAX_ID_LEN - suffix.len());
    format!("{}{}", &base[..keep], suffix)
}
