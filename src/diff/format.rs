use super::differ::{ChangeType, DiffResult};
use crate::model::format_usd;
use serde_json::json;

pub fn format_diff_markdown(diff: &DiffResult) -> String {
    let mut output = String::new();

    output.push_str("# Architecture Diff\n\n");
    output.push_str(&format!("{}\n\n", diff.summary));

    output.push_str("## Summary\n\n");
    output.push_str(&format!(
        "- **Components**: +{} added, -{} removed, {} field change(s)\n",
        diff.added.len(),
        diff.removed.len(),
        diff.changed.len()
    ));
    output.push_str(&format!(
        "- **Connections**: +{} / -{} / ~{}\n",
        diff.connections_of(ChangeType::Added).count(),
        diff.connections_of(ChangeType::Removed).count(),
        diff.connections_of(ChangeType::Changed).count()
    ));
    output.push_str(&format!(
        "- **Cost delta**: {}/mo\n\n",
        format_cost_delta(diff.cost_delta)
    ));

    if !diff.compliance_impact.is_empty() {
        output.push_str(&format!(
            "## Compliance Impact ({})\n\n",
            diff.compliance_impact.len()
        ));
        for impact in &diff.compliance_impact {
            output.push_str(&format!("- ⚠ {}\n", impact));
        }
        output.push('\n');
    }

    if !diff.added.is_empty() {
        output.push_str(&format!("## Added Components ({})\n\n", diff.added.len()));
        for comp in &diff.added {
            output.push_str(&format!("- `{}` {} ({})\n", comp.id, comp.label, comp.service));
        }
        output.push('\n');
    }

    if !diff.removed.is_empty() {
        output.push_str(&format!(
            "## Removed Components ({})\n\n",
            diff.removed.len()
        ));
        for comp in &diff.removed {
            output.push_str(&format!("- `{}` {} ({})\n", comp.id, comp.label, comp.service));
        }
        output.push('\n');
    }

    if !diff.changed.is_empty() {
        output.push_str(&format!(
            "## Changed Components ({})\n\n",
            diff.changed.len()
        ));
        for change in &diff.changed {
            output.push_str(&format!(
                "- `{}`.{}: `{}` -> `{}`",
                change.component_id, change.field, change.old_value, change.new_value
            ));
            if change.cost_delta != 0.0 {
                output.push_str(&format!(" ({}/mo)", format_cost_delta(change.cost_delta)));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    if !diff.connection_changes.is_empty() {
        output.push_str(&format!(
            "## Connection Changes ({})\n\n",
            diff.connection_changes.len()
        ));
        for change in &diff.connection_changes {
            match change.change_type {
                ChangeType::Added => output.push_str(&format!(
                    "- + `{}` → `{}`\n",
                    change.source, change.target
                )),
                ChangeType::Removed => output.push_str(&format!(
                    "- - `{}` → `{}`\n",
                    change.source, change.target
                )),
                ChangeType::Changed => output.push_str(&format!(
                    "- ~ `{}` → `{}` {}: `{}` -> `{}`\n",
                    change.source, change.target, change.field, change.old_value, change.new_value
                )),
            }
        }
        output.push('\n');
    }

    output
}

/// Format diff as JSON
pub fn format_diff_json(diff: &DiffResult) -> String {
    let output = json!({
        "summary": diff.summary,
        "cost_delta": diff.cost_delta,
        "added": diff.added.iter().map(|c| {
            json!({"id": c.id, "service": c.service, "label": c.label})
        }).collect::<Vec<_>>(),
        "removed": diff.removed.iter().map(|c| {
            json!({"id": c.id, "service": c.service, "label": c.label})
        }).collect::<Vec<_>>(),
        "changed": diff.changed,
        "connection_changes": diff.connection_changes,
        "compliance_impact": diff.compliance_impact,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

pub(crate) fn format_cost_delta(delta: f64) -> String {
    if delta < 0.0 {
        format!("-{}", format_usd(delta))
    } else {
        format!("+{}", format_usd(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compute_diff;
    use crate::model::{ArchSpec, Component, Connection, CostEstimate, Provider};

    fn pair() -> (ArchSpec, ArchSpec) {
        let web = Component::new("web", "ec2", Provider::Aws, "Web").unwrap();
        let db = Component::new("db", "rds", Provider::Aws, "DB").unwrap();
        let old = ArchSpec::new("a")
            .with_component(web.clone())
            .with_component(Component::new("waf", "waf", Provider::Aws, "WAF").unwrap())
            .with_cost_estimate(CostEstimate::new(120.0));
        let new = ArchSpec::new("a")
            .with_component(web)
            .with_component(db)
            .with_connection(Connection::new("web", "db"))
            .with_cost_estimate(CostEstimate::new(100.0));
        (old, new)
    }

    #[test]
    fn test_markdown_sections() {
        let (old, new) = pair();
        let md = format_diff_markdown(&compute_diff(&old, &new));
        assert!(md.contains("# Architecture Diff"));
        assert!(md.contains("## Added Components (1)"));
        assert!(md.contains("## Removed Components (1)"));
        assert!(md.contains("## Compliance Impact (1)"));
        assert!(md.contains("+ `web` → `db`"));
        assert!(md.contains("-$20.00/mo"));
    }

    #[test]
    fn test_markdown_empty_diff_has_no_detail_sections() {
        let (old, _) = pair();
        let md = format_diff_markdown(&compute_diff(&old, &old));
        assert!(md.contains("No changes detected."));
        assert!(!md.contains("## Added"));
        assert!(!md.contains("## Connection Changes"));
    }

    #[test]
    fn test_json_output() {
        let (old, new) = pair();
        let json = format_diff_json(&compute_diff(&old, &new));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["cost_delta"], -20.0);
        assert_eq!(parsed["added"][0]["id"], "db");
        assert_eq!(parsed["removed"][0]["id"], "waf");
        assert_eq!(parsed["connection_changes"][0]["change_type"], "added");
    }

    #[test]
    fn test_format_cost_delta_sign() {
        assert_eq!(format_cost_delta(48.6), "+$48.60");
        assert_eq!(format_cost_delta(-1234.5), "-$1,234.50");
        assert_eq!(format_cost_delta(0.0), "+$0.00");
    }
}
