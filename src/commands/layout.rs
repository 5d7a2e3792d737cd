use crate::cli::LayoutArgs;
use crate::fs::{FileSystem, default_fs};
use crate::layout::{compute_layout, format_layout_json, format_layout_markdown};

use super::{CommandContext, write_report};

pub fn cmd_layout(args: LayoutArgs) -> i32 {
    cmd_layout_with_fs(args, default_fs())
}

pub fn cmd_layout_with_fs(args: LayoutArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args.spec, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let layout = compute_layout(&ctx.spec, &ctx.config.layout);

    write_report(
        &args.report,
        || format_layout_markdown(&layout, &ctx.spec.name),
        || format_layout_json(&layout),
        fs,
    )
}
