use crate::analysis::{format_lint_json, format_lint_markdown, lint};
use crate::cli::LintArgs;
use crate::fs::{FileSystem, default_fs};
use crate::model::{Issue, IssueSeverity};

use super::{CommandContext, write_report};

pub fn cmd_lint(args: LintArgs) -> i32 {
    cmd_lint_with_fs(args, default_fs())
}

pub fn cmd_lint_with_fs(args: LintArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args.spec, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let issues: Vec<Issue> = lint(&ctx.spec, &ctx.config.lint)
        .into_iter()
        .filter(|issue| issue.severity >= args.min_severity)
        .collect();

    let code = write_report(
        &args.report,
        || format_lint_markdown(&issues, &ctx.spec.name),
        || format_lint_json(&issues),
        fs,
    );
    if code != 0 {
        return code;
    }

    // Warnings and info stay informational; errors block CI when asked
    let has_errors = issues
        .iter()
        .any(|issue| issue.severity == IssueSeverity::Error);

    if args.fail_on_error && has_errors { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{OutputFormat, ReportArgs};
    use crate::fs::mock::MockFs;
    use std::path::PathBuf;

    const PUBLIC_DB: &str = "name: Exposed
components:
  - id: db
    service: rds
    provider: aws
    label: DB
    tier: 3
    config:
      publicly_accessible: true
";

    fn args(min_severity: IssueSeverity, fail_on_error: bool) -> LintArgs {
        LintArgs {
            spec: PathBuf::from("/x/arch.yaml"),
            min_severity,
            fail_on_error,
            report: ReportArgs {
                format: OutputFormat::Json,
                output: Some(PathBuf::from("/x/lint.json")),
            },
        }
    }

    #[test]
    fn test_lint_fail_on_error() {
        let fs = MockFs::with_files([("/x/arch.yaml", PUBLIC_DB)]);
        assert_eq!(cmd_lint_with_fs(args(IssueSeverity::Info, false), &fs), 0);
        assert_eq!(cmd_lint_with_fs(args(IssueSeverity::Info, true), &fs), 1);
    }

    #[test]
    fn test_min_severity_filters() {
        let fs = MockFs::with_files([("/x/arch.yaml", PUBLIC_DB)]);
        cmd_lint_with_fs(args(IssueSeverity::Error, false), &fs);
        let json: serde_json::Value = serde_json::from_str(&fs.files()["/x/lint.json"]).unwrap();
        let issues = json.as_array().unwrap();
        assert!(!issues.is_empty());
        assert!(issues.iter().all(|i| i["severity"] == "error"));
    }
}
