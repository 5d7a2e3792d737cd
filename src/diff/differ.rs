use super::compliance::{SecurityServices, assess_compliance_impact};
use super::format::format_cost_delta;
use crate::model::{ArchSpec, Component, Connection, format_usd, round2};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Structured difference between two specs, joined on component id.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DiffResult {
    pub added: Vec<Component>,
    pub removed: Vec<Component>,
    pub changed: Vec<ComponentChange>,
    pub connection_changes: Vec<ConnectionChange>,
    pub cost_delta: f64,
    pub summary: String,
    pub compliance_impact: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComponentChange {
    pub component_id: String,
    pub field: ComponentField,
    pub old_value: String,
    pub new_value: String,
    /// Breakdown delta for the component when both specs price it
    pub cost_delta: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentField {
    Service,
    Provider,
    Label,
    Config,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionChange {
    pub change_type: ChangeType,
    pub source: String,
    pub target: String,
    /// Empty for added/removed entries
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

impl ComponentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentField::Service => "service",
            ComponentField::Provider => "provider",
            ComponentField::Label => "label",
            ComponentField::Config => "config",
        }
    }
}

impl std::fmt::Display for ComponentField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.connection_changes.is_empty()
    }

    pub fn connections_of(&self, change_type: ChangeType) -> impl Iterator<Item = &ConnectionChange> {
        self.connection_changes
            .iter()
            .filter(move |c| c.change_type == change_type)
    }
}

/// Diff two specs with the built-in security service list.
pub fn compute_diff(old: &ArchSpec, new: &ArchSpec) -> DiffResult {
    compute_diff_with(old, new, &SecurityServices::default())
}

pub fn compute_diff_with(
    old: &ArchSpec,
    new: &ArchSpec,
    security: &SecurityServices,
) -> DiffResult {
    let old_map: HashMap<&str, &Component> =
        old.components.iter().map(|c| (c.id.as_str(), c)).collect();
    let new_map: HashMap<&str, &Component> =
        new.components.iter().map(|c| (c.id.as_str(), c)).collect();

    let added: Vec<Component> = new
        .components
        .iter()
        .filter(|c| !old_map.contains_key(c.id.as_str()))
        .cloned()
        .collect();

    let removed: Vec<Component> = old
        .components
        .iter()
        .filter(|c| !new_map.contains_key(c.id.as_str()))
        .cloned()
        .collect();

    let changed = find_component_changes(old, new, &new_map);

    let cost_delta = match (&old.cost_estimate, &new.cost_estimate) {
        (Some(o), Some(n)) => round2(n.monthly_total - o.monthly_total),
        _ => 0.0,
    };

    let connection_changes = find_connection_changes(&old.connections, &new.connections);
    let compliance_impact =
        assess_compliance_impact(&removed, &changed, &old_map, &new_map, security);
    let summary = build_summary(&added, &removed, &changed, &connection_changes, old, new, cost_delta);

    DiffResult {
        added,
        removed,
        changed,
        connection_changes,
        cost_delta,
        summary,
        compliance_impact,
    }
}

fn find_component_changes(
    old: &ArchSpec,
    new: &ArchSpec,
    new_map: &HashMap<&str, &Component>,
) -> Vec<ComponentChange> {
    let mut changes = Vec::new();

    for old_c in &old.components {
        let Some(new_c) = new_map.get(old_c.id.as_str()) else {
            continue;
        };

        let component_delta = match (&old.cost_estimate, &new.cost_estimate) {
            (Some(o), Some(n)) => match (
                o.component_monthly(&old_c.id),
                n.component_monthly(&new_c.id),
            ) {
                (Some(before), Some(after)) => round2(after - before),
                _ => 0.0,
            },
            _ => 0.0,
        };

        let fields = [
            (
                ComponentField::Service,
                old_c.service.clone(),
                new_c.service.clone(),
            ),
            (
                ComponentField::Provider,
                old_c.provider.to_string(),
                new_c.provider.to_string(),
            ),
            (
                ComponentField::Label,
                old_c.label.clone(),
                new_c.label.clone(),
            ),
        ];

        for (field, before, after) in fields {
            if before != after {
                changes.push(ComponentChange {
                    component_id: old_c.id.clone(),
                    field,
                    old_value: before,
                    new_value: after,
                    cost_delta: component_delta,
                });
            }
        }

        // The config map is compared as one value: any nested difference
        // flags the whole field.
        if old_c.config != new_c.config {
            changes.push(ComponentChange {
                component_id: old_c.id.clone(),
                field: ComponentField::Config,
                old_value: render_config(old_c),
                new_value: render_config(new_c),
                cost_delta: component_delta,
            });
        }
    }

    changes
}

fn render_config(component: &Component) -> String {
    serde_json::to_string(&component.config).unwrap_or_else(|_| "{}".to_string())
}

fn find_connection_changes(old: &[Connection], new: &[Connection]) -> Vec<ConnectionChange> {
    let old_map: HashMap<(&str, &str), &Connection> = old.iter().map(|c| (c.key(), c)).collect();
    let new_map: HashMap<(&str, &str), &Connection> = new.iter().map(|c| (c.key(), c)).collect();

    let mut changes = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for conn in new {
        let key = conn.key();
        if !old_map.contains_key(&key) && seen.insert(key) {
            changes.push(ConnectionChange::endpoint(ChangeType::Added, conn));
        }
    }

    seen.clear();
    for conn in old {
        let key = conn.key();
        if !new_map.contains_key(&key) && seen.insert(key) {
            changes.push(ConnectionChange::endpoint(ChangeType::Removed, conn));
        }
    }

    seen.clear();
    for conn in old {
        let key = conn.key();
        let Some(new_conn) = new_map.get(&key) else {
            continue;
        };
        if !seen.insert(key) {
            continue;
        }
        let old_conn = old_map[&key];

        let fields = [
            ("label", old_conn.label.clone(), new_conn.label.clone()),
            (
                "protocol",
                old_conn.protocol.clone().unwrap_or_default(),
                new_conn.protocol.clone().unwrap_or_default(),
            ),
            (
                "port",
                render_opt(old_conn.port),
                render_opt(new_conn.port),
            ),
            (
                "estimated_monthly_gb",
                render_opt(old_conn.estimated_monthly_gb),
                render_opt(new_conn.estimated_monthly_gb),
            ),
        ];

        for (field, before, after) in fields {
            if before != after {
                changes.push(ConnectionChange {
                    change_type: ChangeType::Changed,
                    source: old_conn.source.clone(),
                    target: old_conn.target.clone(),
                    field: field.to_string(),
                    old_value: before,
                    new_value: after,
                });
            }
        }
    }

    changes
}

fn render_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ConnectionChange {
    fn endpoint(change_type: ChangeType, conn: &Connection) -> Self {
        Self {
            change_type,
            source: conn.source.clone(),
            target: conn.target.clone(),
            field: String::new(),
            old_value: String::new(),
            new_value: String::new(),
        }
    }
}

fn build_summary(
    added: &[Component],
    removed: &[Component],
    changed: &[ComponentChange],
    connection_changes: &[ConnectionChange],
    old: &ArchSpec,
    new: &ArchSpec,
    cost_delta: f64,
) -> String {
    let mut parts = Vec::new();

    for comp in added {
        parts.push(format!("Added {} ({})", comp.service, comp.id));
    }
    for comp in removed {
        parts.push(format!("Removed {} ({})", comp.service, comp.id));
    }

    for change in changed.iter().filter(|c| c.field == ComponentField::Service) {
        parts.push(format!(
            "{}: {} -> {}",
            change.component_id, change.old_value, change.new_value
        ));
    }

    let other = changed
        .iter()
        .filter(|c| c.field != ComponentField::Service)
        .count();
    if other > 0 {
        parts.push(format!("{} config/label change(s)", other));
    }

    let count = |t: ChangeType| connection_changes.iter().filter(|c| c.change_type == t).count();
    for (change_type, verb) in [
        (ChangeType::Added, "added"),
        (ChangeType::Removed, "removed"),
        (ChangeType::Changed, "modified"),
    ] {
        let n = count(change_type);
        if n > 0 {
            parts.push(format!("{} connection(s) {}", n, verb));
        }
    }

    let mut summary = if parts.is_empty() {
        "No changes detected.".to_string()
    } else {
        format!("{}.", parts.join(". "))
    };

    if let (Some(o), Some(n)) = (&old.cost_estimate, &new.cost_estimate) {
        summary.push_str(&format!(
            " Cost: {} -> {} ({}/mo).",
            format_usd(o.monthly_total),
            format_usd(n.monthly_total),
            format_cost_delta(cost_delta)
        ));
    }

    summary
}
