use crate::cli::{HistoryArgs, OutputFormat, VersionArgs};
use crate::fs::{FileSystem, default_fs};
use crate::history::{
    create_version, diff_versions, format_timeline_json, format_timeline_markdown,
    format_version_diff_markdown, verify_chain,
};
use crate::style;

use super::{load_spec, write_report};

pub fn cmd_version(args: VersionArgs) -> i32 {
    cmd_version_with_fs(args, default_fs())
}

pub fn cmd_version_with_fs(args: VersionArgs, fs: &dyn FileSystem) -> i32 {
    let spec = match load_spec(&args.spec, fs) {
        Ok(spec) => spec,
        Err(code) => return code,
    };

    if let Err(e) = verify_chain(&spec.history) {
        style::warning(&format!("Existing history is inconsistent: {}", e));
    }

    let (stamped, id) = match create_version(&spec, &args.message, &args.author) {
        Ok(result) => result,
        Err(e) => {
            style::error(&e.to_string());
            return 1;
        }
    };

    let output_path = args.output.as_deref().unwrap_or(args.spec.as_path());
    if let Err(e) = stamped.save(output_path, fs) {
        style::error(&format!("Failed to save spec: {}", e));
        return 1;
    }

    style::success(&format!(
        "Stamped version {} into {}",
        id,
        style::path(output_path)
    ));
    println!("{}", style::metric("Versions", stamped.history.len()));
    if let Some(parent) = stamped
        .current_version()
        .map(|v| v.parent_version.as_str())
        .filter(|p| !p.is_empty())
    {
        println!("{}", style::metric("Parent", parent));
    }
    0
}

pub fn cmd_history(args: HistoryArgs) -> i32 {
    cmd_history_with_fs(args, default_fs())
}

pub fn cmd_history_with_fs(args: HistoryArgs, fs: &dyn FileSystem) -> i32 {
    let spec = match load_spec(&args.spec, fs) {
        Ok(spec) => spec,
        Err(code) => return code,
    };

    if let Some(other_path) = &args.against {
        let other = match load_spec(other_path, fs) {
            Ok(spec) => spec,
            Err(code) => return code,
        };
        let diff = diff_versions(&spec, &other);
        return write_report(
            &args.report,
            || format_version_diff_markdown(&diff),
            || serde_json::to_string_pretty(&diff).unwrap_or_else(|_| "{}".to_string()),
            fs,
        );
    }

    let code = write_report(
        &args.report,
        || format_timeline_markdown(&spec),
        || format_timeline_json(&spec),
        fs,
    );
    if code != 0 {
        return code;
    }

    match verify_chain(&spec.history) {
        Ok(()) => 0,
        Err(e) => {
            // The markdown report already says so
            if args.report.format == OutputFormat::Json || args.report.output.is_some() {
                style::error(&e.to_string());
            }
            1
        }
    }
}
