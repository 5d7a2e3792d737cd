use crate::analysis::DependencyGraph;
use crate::cli::ValidateArgs;
use crate::fs::{FileSystem, default_fs};
use crate::style;

use super::load_spec;

pub fn cmd_validate(args: ValidateArgs) -> i32 {
    cmd_validate_with_fs(args, default_fs())
}

/// Structural errors fail; dangling references and cycles only warn.
pub fn cmd_validate_with_fs(args: ValidateArgs, fs: &dyn FileSystem) -> i32 {
    let spec = match load_spec(&args.spec, fs) {
        Ok(spec) => spec,
        Err(code) => return code,
    };

    for conn in spec.dangling_connections() {
        style::warning(&format!(
            "Connection {} -> {} references an unknown component",
            conn.source, conn.target
        ));
    }

    let ids = spec.component_ids();
    for boundary in &spec.boundaries {
        for member in boundary
            .component_ids
            .iter()
            .filter(|id| !ids.contains(id.as_str()))
        {
            style::warning(&format!(
                "Boundary {} lists unknown component {}",
                boundary.id, member
            ));
        }
    }

    for cycle in DependencyGraph::build(&spec).cycles() {
        style::warning(&format!("Circular dependency: {}", cycle.join(" -> ")));
    }

    style::success(&format!("{} is valid", style::path(&args.spec)));
    println!("{}", style::metric("Components", spec.components.len()));
    println!("{}", style::metric("Connections", spec.connections.len()));
    println!("{}", style::metric("Boundaries", spec.boundaries.len()));
    println!("{}", style::metric("Versions", spec.history.len()));
    0
}
