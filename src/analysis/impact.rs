use crate::analysis::DependencyGraph;
use crate::model::ArchSpec;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};

const MAX_TREE_DEPTH: usize = 10;

/// Blast radius of a single component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentImpact {
    pub component_id: String,
    pub service: String,
    pub label: String,
    pub tier: i32,
    pub direct_dependents: Vec<String>,
    pub transitive_dependents: Vec<String>,
    /// Number of components affected if this one fails
    pub blast_radius: usize,
    /// Sole upstream of at least one direct dependent
    pub is_spof: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub total_components: usize,
    pub max_blast_radius: usize,
    pub spofs: Vec<String>,
    pub critical_path: Vec<String>,
    pub components: Vec<ComponentImpact>,
    pub graph: BTreeMap<String, Vec<String>>,
    pub reverse_graph: BTreeMap<String, Vec<String>>,
}

/// Compute blast radius, SPOFs and the critical path for every component.
///
/// With `component_id`, the graph-wide fields stay complete and only
/// `components` is narrowed to that entry (left as is for unknown ids).
pub fn analyze(spec: &ArchSpec, component_id: Option<&str>) -> AnalysisResult {
    let graph = DependencyGraph::build(spec);

    let mut impacts: Vec<ComponentImpact> = spec
        .components
        .iter()
        .map(|comp| {
            let transitive = graph.transitive_dependents(&comp.id);
            ComponentImpact {
                component_id: comp.id.clone(),
                service: comp.service.clone(),
                label: comp.label.clone(),
                tier: comp.tier,
                direct_dependents: graph.direct_dependents(&comp.id).to_vec(),
                blast_radius: transitive.len(),
                transitive_dependents: transitive,
                is_spof: graph.is_spof(&comp.id),
            }
        })
        .collect();

    // Stable: equal blast radius keeps spec order
    impacts.sort_by(|a, b| b.blast_radius.cmp(&a.blast_radius));

    let spofs = impacts
        .iter()
        .filter(|i| i.is_spof)
        .map(|i| i.component_id.clone())
        .collect();
    let max_blast_radius = impacts.first().map_or(0, |i| i.blast_radius);
    let critical_path = find_critical_path(&impacts, &graph);

    if let Some(id) = component_id
        && impacts.iter().any(|i| i.component_id == id)
    {
        impacts.retain(|i| i.component_id == id);
    }

    AnalysisResult {
        total_components: spec.components.len(),
        max_blast_radius,
        spofs,
        critical_path,
        components: impacts,
        graph: graph.forward_map(),
        reverse_graph: graph.reverse_map(),
    }
}

/// Longest greedy walk (by node count) starting from any component,
/// always stepping to the unvisited dependent with the largest blast radius.
fn find_critical_path(impacts: &[ComponentImpact], graph: &DependencyGraph) -> Vec<String> {
    let blast: HashMap<&str, usize> = impacts
        .iter()
        .map(|i| (i.component_id.as_str(), i.blast_radius))
        .collect();

    let mut best: Vec<String> = Vec::new();
    for impact in impacts {
        let path = trace_path(&impact.component_id, graph, &blast);
        if path.len() > best.len() {
            best = path;
        }
    }
    best
}

fn trace_path(start: &str, graph: &DependencyGraph, blast: &HashMap<&str, usize>) -> Vec<String> {
    let mut path = vec![start.to_string()];
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut current = start;

    loop {
        let mut next: Option<(&str, usize)> = None;
        for dep in graph.direct_dependents(current) {
            if visited.contains(dep.as_str()) {
                continue;
            }
            let radius = blast.get(dep.as_str()).copied().unwrap_or(0);
            // First maximum wins
            if next.is_none_or(|(_, best)| radius > best) {
                next = Some((dep.as_str(), radius));
            }
        }
        let Some((node, _)) = next else {
            break;
        };
        path.push(node.to_string());
        visited.insert(node);
        current = node;
    }

    path
}

/// Render the forward graph as a tree from its roots.
///
/// Roots are components with no upstream, in result order (falling back
/// to the first component when every node is on a cycle). A node already
/// printed is marked `(cycle)` and not expanded again.
pub fn format_dependency_tree(result: &AnalysisResult) -> String {
    let targets: HashSet<&str> = result
        .graph
        .values()
        .flatten()
        .map(String::as_str)
        .collect();

    let mut roots: Vec<&str> = result
        .components
        .iter()
        .map(|c| c.component_id.as_str())
        .filter(|id| !targets.contains(id))
        .collect();
    if roots.is_empty()
        && let Some(first) = result.components.first()
    {
        roots.push(first.component_id.as_str());
    }

    let mut output = String::new();
    let mut visited: HashSet<&str> = HashSet::new();
    for (idx, root) in roots.iter().enumerate() {
        let is_last = idx == roots.len() - 1;
        format_tree_node(&mut output, root, &result.graph, &mut visited, "", is_last, 0);
    }
    output
}

fn format_tree_node<'a>(
    output: &mut String,
    node: &'a str,
    graph: &'a BTreeMap<String, Vec<String>>,
    visited: &mut HashSet<&'a str>,
    prefix: &str,
    is_last: bool,
    depth: usize,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }

    let connector = if is_last { "└── " } else { "├── " };
    if visited.contains(node) {
        output.push_str(&format!("{}{}{} (cycle)\n", prefix, connector, node));
        return;
    }
    output.push_str(&format!("{}{}{}\n", prefix, connector, node));
    visited.insert(node);

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let children = graph.get(node).map(Vec::as_slice).unwrap_or(&[]);
    for (idx, child) in children.iter().enumerate() {
        let is_last_child = idx == children.len() - 1;
        format_tree_node(
            output,
            child,
            graph,
            visited,
            &child_prefix,
            is_last_child,
            depth + 1,
        );
    }
}

/// Format analysis as markdown
pub fn format_analysis_markdown(result: &AnalysisResult, spec_name: &str, show_tree: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Blast Radius Analysis: {}\n\n", spec_name));

    output.push_str("## Summary\n\n");
    output.push_str(&format!(
        "- **Components**: {}\n",
        result.total_components
    ));
    output.push_str(&format!(
        "- **Max Blast Radius**: {}\n",
        result.max_blast_radius
    ));
    output.push_str(&format!("- **SPOFs**: {}\n\n", result.spofs.len()));

    if !result.spofs.is_empty() {
        output.push_str(&format!(
            "**Single Points of Failure**: {}\n\n",
            result.spofs.join(", ")
        ));
    }

    if !result.critical_path.is_empty() {
        output.push_str(&format!(
            "**Critical Path**: {}\n\n",
            result.critical_path.join(" -> ")
        ));
    }

    output.push_str("## Component Impact\n\n");
    output.push_str("| Component | Service | Tier | Direct Deps | Blast Radius | SPOF |\n");
    output.push_str("|---|---|---:|---:|---:|---|\n");
    for impact in &result.components {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} |\n",
            impact.component_id,
            impact.service,
            impact.tier,
            impact.direct_dependents.len(),
            impact.blast_radius,
            if impact.is_spof { "YES" } else { "" }
        ));
    }
    output.push('\n');

    if show_tree && !result.components.is_empty() {
        output.push_str("## Dependency Graph\n\n");
        output.push_str("```\n");
        output.push_str(&format_dependency_tree(result));
        output.push_str("```\n");
    }

    output
}

/// Format analysis as JSON
pub fn format_analysis_json(result: &AnalysisResult) -> String {
    let output = json!({
        "total_components": result.total_components,
        "max_blast_radius": result.max_blast_radius,
        "spofs": result.spofs,
        "critical_path": result.critical_path,
        "components": result.components,
        "graph": result.graph,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}
