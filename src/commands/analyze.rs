use crate::analysis::{analyze, format_analysis_json, format_analysis_markdown};
use crate::cli::AnalyzeArgs;
use crate::fs::{FileSystem, default_fs};
use crate::style;

use super::{CommandContext, write_report};

pub fn cmd_analyze(args: AnalyzeArgs) -> i32 {
    cmd_analyze_with_fs(args, default_fs())
}

pub fn cmd_analyze_with_fs(args: AnalyzeArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args.spec, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    if let Some(id) = args.component.as_deref()
        && ctx.spec.component(id).is_none()
    {
        style::error(&format!("Unknown component: {}", id));
        let ids: Vec<&str> = ctx.spec.components.iter().map(|c| c.id.as_str()).collect();
        style::hint(&format!("Components in this spec: {}", ids.join(", ")));
        return 1;
    }

    let result = analyze(&ctx.spec, args.component.as_deref());

    write_report(
        &args.report,
        || format_analysis_markdown(&result, &ctx.spec.name, args.tree),
        || format_analysis_json(&result),
        fs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{OutputFormat, ReportArgs};
    use crate::fs::mock::MockFs;
    use std::path::PathBuf;

    const SPEC: &str = "name: Chain
components:
  - {id: web, service: ec2, provider: aws, label: Web}
  - {id: db, service: rds, provider: aws, label: DB, tier: 3}
connections:
  - {source: web, target: db}
";

    fn args(component: Option<&str>) -> AnalyzeArgs {
        AnalyzeArgs {
            spec: PathBuf::from("/s/arch.yaml"),
            component: component.map(str::to_string),
            tree: true,
            report: ReportArgs {
                format: OutputFormat::Markdown,
                output: Some(PathBuf::from("/s/out.md")),
            },
        }
    }

    #[test]
    fn test_analyze_writes_report() {
        let fs = MockFs::with_files([("/s/arch.yaml", SPEC)]);
        assert_eq!(cmd_analyze_with_fs(args(None), &fs), 0);
        let out = &fs.files()["/s/out.md"];
        assert!(out.contains("# Blast Radius Analysis: Chain"));
        assert!(out.contains("## Dependency Graph"));
    }

    #[test]
    fn test_analyze_unknown_component() {
        let fs = MockFs::with_files([("/s/arch.yaml", SPEC)]);
        assert_eq!(cmd_analyze_with_fs(args(Some("cache")), &fs), 1);
        assert!(!fs.files().contains_key("/s/out.md"));
    }
}
