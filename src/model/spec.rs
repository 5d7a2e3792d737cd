use super::component::{Boundary, Component, ConfigMap, Connection, Provider};
use super::cost::{Constraints, CostEstimate};
use super::SpecError;
use crate::fs::{FileSystem, default_fs};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// The same architecture priced on another provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    pub provider: Provider,
    pub monthly_total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Box<ArchSpec>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_differences: Vec<String>,
}

/// One entry of the provenance chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArchVersion {
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_version: String,
}

/// Architecture specification: components, connections and everything
/// attached to them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchSpec {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundaries: Vec<Boundary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<CostEstimate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ConfigMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ArchVersion>,
}

fn default_version() -> u32 {
    1
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl ArchSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            provider: Provider::default(),
            region: default_region(),
            constraints: None,
            components: Vec::new(),
            connections: Vec::new(),
            boundaries: Vec::new(),
            cost_estimate: None,
            alternatives: Vec::new(),
            metadata: ConfigMap::new(),
            history: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: Provider, region: impl Into<String>) -> Self {
        self.provider = provider;
        self.region = region.into();
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundaries.push(boundary);
        self
    }

    pub fn with_cost_estimate(mut self, estimate: CostEstimate) -> Self {
        self.cost_estimate = Some(estimate);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn component_ids(&self) -> HashSet<&str> {
        self.components.iter().map(|c| c.id.as_str()).collect()
    }

    /// Latest history entry, if the spec has been versioned.
    pub fn current_version(&self) -> Option<&ArchVersion> {
        self.history.last()
    }

    /// Check the structural invariants. Dangling connection endpoints are
    /// not an error here; see [`ArchSpec::dangling_connections`].
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for component in &self.components {
            if !super::is_iac_safe(&component.id) {
                return Err(SpecError::InvalidId {
                    kind: "Component",
                    id: component.id.clone(),
                });
            }
            if !seen.insert(component.id.as_str()) {
                return Err(SpecError::DuplicateComponent(component.id.clone()));
            }
        }

        let mut boundary_ids: HashSet<&str> = HashSet::new();
        for boundary in &self.boundaries {
            if !super::is_iac_safe(&boundary.id) {
                return Err(SpecError::InvalidId {
                    kind: "Boundary",
                    id: boundary.id.clone(),
                });
            }
            if !boundary_ids.insert(boundary.id.as_str()) {
                return Err(SpecError::DuplicateBoundary(boundary.id.clone()));
            }
        }

        let mut pairs: HashSet<(&str, &str)> = HashSet::new();
        for conn in &self.connections {
            if !pairs.insert(conn.key()) {
                return Err(SpecError::DuplicateConnection {
                    from: conn.source.clone(),
                    to: conn.target.clone(),
                });
            }
        }

        Ok(())
    }

    /// Connections whose source or target names no component.
    pub fn dangling_connections(&self) -> Vec<&Connection> {
        let ids = self.component_ids();
        self.connections
            .iter()
            .filter(|c| !ids.contains(c.source.as_str()) || !ids.contains(c.target.as_str()))
            .collect()
    }

    /// Component ids grouped by tier, tiers ascending.
    pub fn tiers(&self) -> BTreeMap<i32, Vec<&Component>> {
        let mut tiers: BTreeMap<i32, Vec<&Component>> = BTreeMap::new();
        for component in &self.components {
            tiers.entry(component.tier).or_default().push(component);
        }
        tiers
    }

    /// Boundary id each component belongs to (innermost listed last wins).
    pub fn boundary_membership(&self) -> HashMap<&str, &str> {
        let mut membership = HashMap::new();
        for boundary in &self.boundaries {
            for cid in &boundary.component_ids {
                membership.insert(cid.as_str(), boundary.id.as_str());
            }
        }
        membership
    }

    pub fn from_yaml(text: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_yaml::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load from a `.yaml`/`.yml` (YAML) or any other (JSON) file.
    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self, SpecError> {
        let text = fs
            .read_to_string(path)
            .map_err(|source| SpecError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if is_yaml_path(path) {
            Self::from_yaml(&text)
        } else {
            Self::from_json(&text)
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SpecError> {
        Self::load(path, default_fs())
    }

    pub fn to_yaml(&self) -> Result<String, SpecError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize in the format implied by the path's extension.
    pub fn save(&self, path: &Path, fs: &dyn FileSystem) -> Result<(), SpecError> {
        let content = if is_yaml_path(path) {
            self.to_yaml()?
        } else {
            self.to_json()?
        };
        fs.write(path, &content).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub(crate) fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
