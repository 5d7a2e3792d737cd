use crate::analysis::{evaluate, format_policy_json, format_policy_markdown, load_rules};
use crate::cli::PolicyArgs;
use crate::fs::{FileSystem, default_fs};
use crate::style;

use super::{CommandContext, write_report};

pub fn cmd_policy(args: PolicyArgs) -> i32 {
    cmd_policy_with_fs(args, default_fs())
}

pub fn cmd_policy_with_fs(args: PolicyArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args.spec, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let rules = match load_rules(&args.rules, fs) {
        Ok(rules) => rules,
        Err(e) => {
            style::error(&e.to_string());
            return 1;
        }
    };
    if rules.is_empty() {
        style::warning(&format!(
            "No rules found in {}",
            style::path(&args.rules)
        ));
    }

    let result = evaluate(&ctx.spec, &rules, ctx.spec.cost_estimate.as_ref());

    let code = write_report(
        &args.report,
        || format_policy_markdown(&result, &ctx.spec.name),
        || format_policy_json(&result),
        fs,
    );
    if code != 0 {
        return code;
    }

    // Only deny rules block
    if result.passed { 0 } else { 1 }
}
