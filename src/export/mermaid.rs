use super::{
    ExportError, NodeShape, Renderer, edge_label, group_components, node_shape, safe_id,
};
use crate::model::{ArchSpec, Component};

const CLASS_DEFS: &[(&str, &str)] = &[
    ("compute", "#10b981"),
    ("data", "#8b5cf6"),
    ("queue", "#f97316"),
    ("security", "#ef4444"),
];

/// Mermaid `flowchart TD` with one subgraph per boundary (or tier).
pub struct MermaidRenderer;

impl Renderer for MermaidRenderer {
    fn render(&self, spec: &ArchSpec) -> Result<String, ExportError> {
        let mut lines = vec!["flowchart TD".to_string()];
        for (class, stroke) in CLASS_DEFS {
            lines.push(format!(
                "    classDef {} fill:#1e293b,stroke:{},color:#f8fafc",
                class, stroke
            ));
        }

        let (groups, unassigned) = group_components(spec);
        for group in &groups {
            lines.push(format!("    subgraph {}[\"{}\"]", group.id, escape(&group.label)));
            for comp in &group.members {
                push_node(&mut lines, comp, "        ");
            }
            lines.push("    end".to_string());
        }
        for comp in unassigned {
            push_node(&mut lines, comp, "    ");
        }

        if !spec.connections.is_empty() {
            lines.push(String::new());
        }
        for conn in &spec.connections {
            let source = safe_id(&conn.source);
            let target = safe_id(&conn.target);
            let label = edge_label(conn);
            if label.is_empty() {
                lines.push(format!("    {} --> {}", source, target));
            } else {
                lines.push(format!("    {} -->|\"{}\"| {}", source, escape(&label), target));
            }
        }

        Ok(lines.join("\n") + "\n")
    }
}

fn push_node(lines: &mut Vec<String>, comp: &Component, indent: &str) {
    let id = safe_id(&comp.id);
    let label = escape(&comp.label);
    let (node, class) = match node_shape(&comp.service) {
        NodeShape::Cylinder => (format!("{}[(\"{}\")]", id, label), "data"),
        NodeShape::Queue => (format!("{}[/\"{}\"/]", id, label), "queue"),
        NodeShape::Hexagon => (format!("{}{{{{\"{}\"}}}}", id, label), "security"),
        NodeShape::Rectangle => (format!("{}[\"{}\"]", id, label), "compute"),
    };
    lines.push(format!("{}{}", indent, node));
    lines.push(format!("{}class {} {}", indent, id, class));
}

/// Mermaid has no backslash escapes inside quoted labels.
fn escape(text: &str) -> String {
    text.replace('"', "#quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Boundary, Connection, Provider};

    fn spec() -> ArchSpec {
        ArchSpec::new("Mermaid")
            .with_component(Component::new("web", "ec2", Provider::Aws, "Web").unwrap())
            .with_component(
                Component::new("db", "rds", Provider::Aws, "Main \"DB\"")
                    .unwrap()
                    .with_tier(3),
            )
            .with_connection(
                Connection::new("web", "db")
                    .with_label("reads")
                    .with_protocol("TCP", Some(5432)),
            )
    }

    #[test]
    fn test_flowchart_with_tier_subgraphs() {
        let out = MermaidRenderer.render(&spec()).unwrap();
        assert!(out.starts_with("flowchart TD\n"));
        assert!(out.contains("    subgraph tier_2[\"Tier 2 - Compute\"]"));
        assert!(out.contains("        web[\"Web\"]"));
        assert!(out.contains("        db[(\"Main #quot;DB#quot;\")]"));
        assert!(out.contains("class db data"));
        assert!(out.contains("    web -->|\"reads (TCP/5432)\"| db"));
    }

    #[test]
    fn test_boundary_subgraphs_and_unassigned() {
        let spec = spec().with_boundary(
            Boundary::new("private-net", "subnet")
                .unwrap()
                .with_members(["db"]),
        );
        let out = MermaidRenderer.render(&spec).unwrap();
        assert!(out.contains("subgraph private_net[\"private-net\"]"));
        assert!(!out.contains("Tier 2"));
        // web sits outside every boundary, at top level
        assert!(out.contains("\n    web[\"Web\"]\n"));
    }

    #[test]
    fn test_unlabelled_edge() {
        let spec = ArchSpec::new("plain")
            .with_component(Component::new("a", "ec2", Provider::Aws, "A").unwrap())
            .with_component(Component::new("b", "ec2", Provider::Aws, "B").unwrap())
            .with_connection(Connection::new("a", "b"));
        let out = MermaidRenderer.render(&spec).unwrap();
        assert!(out.contains("    a --> b\n"));
    }
}
