use super::{
    ExportError, NodeShape, Renderer, edge_label, group_components, node_shape, safe_id,
};
use crate::model::{ArchSpec, Component};
use std::collections::HashMap;

/// Services whose edges are drawn dashed.
const ASYNC_SERVICES: &[&str] = &["sqs", "sns", "pub_sub", "kinesis", "service_bus", "event_hubs"];

/// D2 source with one container per boundary (or tier).
pub struct D2Renderer;

impl Renderer for D2Renderer {
    fn render(&self, spec: &ArchSpec) -> Result<String, ExportError> {
        let mut lines = vec![
            format!("# {}", spec.name),
            String::new(),
            "direction: down".to_string(),
            String::new(),
        ];

        // Container path of each node, for edge endpoints
        let mut paths: HashMap<&str, String> = HashMap::new();

        let (groups, unassigned) = group_components(spec);
        for group in &groups {
            lines.push(format!("{}: {} {{", group.id, quote(&group.label)));
            for comp in &group.members {
                push_node(&mut lines, comp, "  ");
                paths.insert(comp.id.as_str(), format!("{}.{}", group.id, safe_id(&comp.id)));
            }
            lines.push("}".to_string());
            lines.push(String::new());
        }
        for comp in unassigned {
            push_node(&mut lines, comp, "");
            paths.insert(comp.id.as_str(), safe_id(&comp.id));
        }

        let services: HashMap<&str, &str> = spec
            .components
            .iter()
            .map(|c| (c.id.as_str(), c.service.as_str()))
            .collect();
        let is_async = |id: &str| {
            services
                .get(id)
                .is_some_and(|service| ASYNC_SERVICES.contains(service))
        };

        for conn in &spec.connections {
            let source = paths
                .get(conn.source.as_str())
                .cloned()
                .unwrap_or_else(|| safe_id(&conn.source));
            let target = paths
                .get(conn.target.as_str())
                .cloned()
                .unwrap_or_else(|| safe_id(&conn.target));
            let label = edge_label(conn);
            let head = if label.is_empty() {
                format!("{} -> {}", source, target)
            } else {
                format!("{} -> {}: {}", source, target, quote(&label))
            };
            if is_async(&conn.source) || is_async(&conn.target) {
                lines.push(format!("{} {{ style.stroke-dash: 5 }}", head));
            } else {
                lines.push(head);
            }
        }

        Ok(lines.join("\n") + "\n")
    }
}

fn push_node(lines: &mut Vec<String>, comp: &Component, indent: &str) {
    let shape = match node_shape(&comp.service) {
        NodeShape::Cylinder => "cylinder",
        NodeShape::Queue => "queue",
        NodeShape::Hexagon => "hexagon",
        NodeShape::Rectangle => "rectangle",
    };
    let badge = comp.provider.to_string().to_uppercase();
    lines.push(format!(
        "{}{}: {} {{",
        indent,
        safe_id(&comp.id),
        quote(&format!("{} [{}]", comp.label, badge))
    ));
    lines.push(format!("{}  shape: {}", indent, shape));
    lines.push(format!("{}}}", indent));
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
