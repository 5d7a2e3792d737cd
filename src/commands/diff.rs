use crate::cli::DiffArgs;
use crate::diff::{compute_diff_with, format_diff_json, format_diff_markdown};
use crate::fs::{FileSystem, default_fs};

use super::{CommandContext, load_spec, write_report};

pub fn cmd_diff(args: DiffArgs) -> i32 {
    cmd_diff_with_fs(args, default_fs())
}

pub fn cmd_diff_with_fs(args: DiffArgs, fs: &dyn FileSystem) -> i32 {
    let old = match load_spec(&args.old, fs) {
        Ok(spec) => spec,
        Err(code) => return code,
    };
    // Config next to the new spec wins
    let ctx = match CommandContext::new(&args.new, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let security = ctx.config.diff.security_services();
    let diff = compute_diff_with(&old, &ctx.spec, &security);

    let code = write_report(
        &args.report,
        || format_diff_markdown(&diff),
        || format_diff_json(&diff),
        fs,
    );
    if code != 0 {
        return code;
    }

    if args.fail_on_changes && !diff.is_empty() { 1 } else { 0 }
}
