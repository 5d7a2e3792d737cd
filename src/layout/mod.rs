//! Layered diagram layout.
//!
//! Components are placed in rows by tier, rows are reordered with
//! barycenter sweeps to reduce edge crossings, then centred against the
//! widest row. Boundaries become padded bounding boxes around their members.

mod ordering;

use crate::model::ArchSpec;
use ordering::{Neighbours, reduce_crossings};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutOptions {
    pub node_width: f64,
    pub node_height: f64,
    pub h_gap: f64,
    pub v_gap: f64,
    pub boundary_padding: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_width: 200.0,
            node_height: 80.0,
            h_gap: 40.0,
            v_gap: 120.0,
            boundary_padding: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePosition {
    pub node_id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryRect {
    pub boundary_id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeWaypoint {
    pub source: String,
    pub target: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    /// Row by row, left to right
    pub positions: Vec<NodePosition>,
    pub boundary_rects: Vec<BoundaryRect>,
    pub edge_waypoints: Vec<EdgeWaypoint>,
    pub width: f64,
    pub height: f64,
}

impl LayoutResult {
    pub fn position(&self, id: &str) -> Option<&NodePosition> {
        self.positions.iter().find(|p| p.node_id == id)
    }
}

pub fn compute_layout(spec: &ArchSpec, options: &LayoutOptions) -> LayoutResult {
    if spec.components.is_empty() {
        return LayoutResult::default();
    }

    let mut by_tier: BTreeMap<i32, Vec<&str>> = BTreeMap::new();
    for comp in &spec.components {
        by_tier.entry(comp.tier).or_default().push(comp.id.as_str());
    }
    let mut layers: Vec<Vec<&str>> = by_tier.into_values().collect();

    let ids: HashSet<&str> = spec.component_ids();
    let mut neighbours: Neighbours<'_> = ids.iter().map(|id| (*id, Vec::new())).collect();
    for conn in &spec.connections {
        let (source, target) = conn.key();
        if !ids.contains(source) || !ids.contains(target) {
            continue;
        }
        if let Some(list) = neighbours.get_mut(source) {
            list.push(target);
        }
        if let Some(list) = neighbours.get_mut(target) {
            list.push(source);
        }
    }

    reduce_crossings(&mut layers, &neighbours);

    let LayoutOptions {
        node_width,
        node_height,
        h_gap,
        v_gap,
        boundary_padding,
    } = *options;

    let row_width = |count: usize| count as f64 * (node_width + h_gap) - h_gap;
    let widest = layers
        .iter()
        .map(|layer| row_width(layer.len()))
        .fold(f64::MIN, f64::max);

    let mut positions = Vec::with_capacity(spec.components.len());
    for (row, layer) in layers.iter().enumerate() {
        let x_offset = (widest - row_width(layer.len())) / 2.0;
        let y = row as f64 * (node_height + v_gap);
        for (col, id) in layer.iter().enumerate() {
            positions.push(NodePosition {
                node_id: id.to_string(),
                x: x_offset + col as f64 * (node_width + h_gap),
                y,
                width: node_width,
                height: node_height,
            });
        }
    }

    let by_id: HashMap<&str, &NodePosition> =
        positions.iter().map(|p| (p.node_id.as_str(), p)).collect();

    let boundary_rects = spec
        .boundaries
        .iter()
        .filter_map(|boundary| {
            let members: Vec<&NodePosition> = boundary
                .component_ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).copied())
                .collect();
            if members.is_empty() {
                return None;
            }
            let min_x = members.iter().map(|p| p.x).fold(f64::MAX, f64::min) - boundary_padding;
            let min_y = members.iter().map(|p| p.y).fold(f64::MAX, f64::min) - boundary_padding;
            let max_x = members
                .iter()
                .map(|p| p.x + p.width)
                .fold(f64::MIN, f64::max)
                + boundary_padding;
            let max_y = members
                .iter()
                .map(|p| p.y + p.height)
                .fold(f64::MIN, f64::max)
                + boundary_padding;
            Some(BoundaryRect {
                boundary_id: boundary.id.clone(),
                x: min_x,
                y: min_y,
                width: max_x - min_x,
                height: max_y - min_y,
            })
        })
        .collect();

    let edge_waypoints = spec
        .connections
        .iter()
        .filter_map(|conn| {
            let src = by_id.get(conn.source.as_str())?;
            let tgt = by_id.get(conn.target.as_str())?;
            Some(EdgeWaypoint {
                source: conn.source.clone(),
                target: conn.target.clone(),
                points: vec![
                    (src.x + src.width / 2.0, src.y + src.height),
                    (tgt.x + tgt.width / 2.0, tgt.y),
                ],
            })
        })
        .collect();

    let width = positions
        .iter()
        .map(|p| p.x + p.width)
        .fold(0.0, f64::max);
    let height = positions
        .iter()
        .map(|p| p.y + p.height)
        .fold(0.0, f64::max);

    LayoutResult {
        positions,
        boundary_rects,
        edge_waypoints,
        width,
        height,
    }
}

pub fn format_layout_markdown(layout: &LayoutResult, spec_name: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Layout: {}\n\n", spec_name));
    output.push_str(&format!(
        "**Canvas**: {} x {}\n\n",
        layout.width, layout.height
    ));

    if layout.positions.is_empty() {
        output.push_str("*No components to lay out.*\n");
        return output;
    }

    output.push_str("## Nodes\n\n");
    output.push_str("| Component | x | y | Width | Height |\n");
    output.push_str("|---|---:|---:|---:|---:|\n");
    for p in &layout.positions {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            p.node_id, p.x, p.y, p.width, p.height
        ));
    }
    output.push('\n');

    if !layout.boundary_rects.is_empty() {
        output.push_str("## Boundaries\n\n");
        for b in &layout.boundary_rects {
            output.push_str(&format!(
                "- `{}`: ({}, {}) {} x {}\n",
                b.boundary_id, b.x, b.y, b.width, b.height
            ));
        }
        output.push('\n');
    }

    if !layout.edge_waypoints.is_empty() {
        output.push_str("## Edges\n\n");
        for e in &layout.edge_waypoints {
            let points: Vec<String> = e
                .points
                .iter()
                .map(|(x, y)| format!("({}, {})", x, y))
                .collect();
            output.push_str(&format!(
                "- `{}` → `{}`: {}\n",
                e.source,
                e.target,
                points.join(" → ")
            ));
        }
        output.push('\n');
    }

    output
}

/// Format layout as JSON
pub fn format_layout_json(layout: &LayoutResult) -> String {
    let output = json!({
        "width": layout.width,
        "height": layout.height,
        "positions": layout.positions,
        "boundary_rects": layout.boundary_rects,
        "edge_waypoints": layout.edge_waypoints,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Boundary, Component, Connection, Provider};

    fn comp(id: &str, tier: i32) -> Component {
        Component::new(id, "ec2", Provider::Aws, id).unwrap().with_tier(tier)
    }

    fn web_app() -> ArchSpec {
        ArchSpec::new("Web")
            .with_component(comp("cdn", 0))
            .with_component(comp("web1", 2))
            .with_component(comp("web2", 2))
            .with_component(comp("db", 3))
            .with_connection(Connection::new("cdn", "web1"))
            .with_connection(Connection::new("cdn", "web2"))
            .with_connection(Connection::new("web1", "db"))
            .with_connection(Connection::new("web2", "db"))
    }

    #[test]
    fn test_empty_spec() {
        let layout = compute_layout(&ArchSpec::new("empty"), &LayoutOptions::default());
        assert!(layout.positions.is_empty());
        assert_eq!(layout.width, 0.0);
        assert_eq!(layout.height, 0.0);
    }

    #[test]
    fn test_single_node_at_origin() {
        let spec = ArchSpec::new("one").with_component(comp("only", 5));
        let layout = compute_layout(&spec, &LayoutOptions::default());
        let p = layout.position("only").unwrap();
        assert_eq!((p.x, p.y), (0.0, 0.0));
        assert_eq!((layout.width, layout.height), (200.0, 80.0));
    }

    #[test]
    fn test_tiers_stack_vertically() {
        let layout = compute_layout(&web_app(), &LayoutOptions::default());
        let y = |id: &str| layout.position(id).unwrap().y;
        assert_eq!(y("cdn"), 0.0);
        assert_eq!(y("web1"), 200.0);
        assert_eq!(y("db"), 400.0);
        assert!(y("cdn") < y("web1"));
    }

    #[test]
    fn test_rows_centred_and_increasing() {
        let layout = compute_layout(&web_app(), &LayoutOptions::default());
        let x = |id: &str| layout.position(id).unwrap().x;
        // Widest row is 2 * 240 - 40 = 440; single nodes centre at 120
        assert_eq!(x("cdn"), 120.0);
        assert_eq!(x("db"), 120.0);
        let row: Vec<f64> = layout
            .positions
            .iter()
            .filter(|p| p.y == 200.0)
            .map(|p| p.x)
            .collect();
        assert_eq!(row, vec![0.0, 240.0]);
        assert_eq!(layout.width, 440.0);
        assert_eq!(layout.height, 480.0);
    }

    #[test]
    fn test_boundary_contains_members_with_padding() {
        let spec = web_app()
            .with_boundary(Boundary::new("app", "subnet").unwrap().with_members(["web1", "web2"]))
            .with_boundary(Boundary::new("ghost", "vpc").unwrap().with_members(["nope"]));
        let options = LayoutOptions::default();
        let layout = compute_layout(&spec, &options);

        assert_eq!(layout.boundary_rects.len(), 1);
        let rect = &layout.boundary_rects[0];
        for id in ["web1", "web2"] {
            let p = layout.position(id).unwrap();
            assert!(rect.x <= p.x - options.boundary_padding);
            assert!(rect.y <= p.y - options.boundary_padding);
            assert!(rect.x + rect.width >= p.x + p.width + options.boundary_padding);
            assert!(rect.y + rect.height >= p.y + p.height + options.boundary_padding);
        }
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (-40.0, 160.0, 520.0, 160.0));
    }

    #[test]
    fn test_edge_waypoints() {
        let spec = web_app().with_connection(Connection::new("db", "ghost"));
        let layout = compute_layout(&spec, &LayoutOptions::default());
        assert_eq!(layout.edge_waypoints.len(), 4);
        let edge = &layout.edge_waypoints[0];
        assert_eq!(edge.points, vec![(220.0, 80.0), (100.0, 200.0)]);
    }

    #[test]
    fn test_custom_options() {
        let options = LayoutOptions {
            node_width: 100.0,
            h_gap: 10.0,
            ..LayoutOptions::default()
        };
        let layout = compute_layout(&web_app(), &options);
        assert_eq!(layout.width, 210.0);
    }
}
