use crate::cli::DriftArgs;
use crate::drift::{detect_drift_against, format_drift_json, format_drift_markdown};
use crate::fs::{FileSystem, default_fs};
use crate::style;

use super::{CommandContext, write_report};

pub fn cmd_drift(args: DriftArgs) -> i32 {
    cmd_drift_with_fs(args, default_fs())
}

pub fn cmd_drift_with_fs(args: DriftArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args.design, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    if !fs.exists(&args.infra) {
        style::error(&format!(
            "Could not find infrastructure file: {}",
            style::path(&args.infra)
        ));
        return 1;
    }

    let security = ctx.config.diff.security_services();
    let report = match detect_drift_against(
        fs,
        &ctx.spec,
        &args.infra,
        args.infra_format,
        &security,
    ) {
        Ok(report) => report,
        Err(e) => {
            style::error(&e.to_string());
            style::hint("Use --infra-format terraform, cloudformation or spec to pick an importer");
            return 1;
        }
    };

    let code = write_report(
        &args.report,
        || format_drift_markdown(&report),
        || format_drift_json(&report),
        fs,
    );
    if code != 0 {
        return code;
    }

    // Exit code 1 on drift only when asked, so the report alone stays informational
    if args.fail_on_drift && report.has_drift() { 1 } else { 0 }
}
