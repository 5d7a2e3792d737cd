mod analyze;
mod diff;
mod drift;
mod export;
mod history;
mod init;
mod layout;
mod lint;
mod policy;
mod validate;

pub use analyze::cmd_analyze;
pub use diff::cmd_diff;
pub use drift::cmd_drift;
pub use export::cmd_export;
pub use history::{cmd_history, cmd_version};
pub use init::cmd_init;
pub use layout::cmd_layout;
pub use lint::cmd_lint;
pub use policy::cmd_policy;
pub use validate::cmd_validate;

use crate::api::config_dir;
use crate::cli::{OutputFormat, ReportArgs};
use crate::config::Config;
use crate::fs::FileSystem;
use crate::model::ArchSpec;
use crate::style;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Shared context for command execution, reducing boilerplate across commands.
pub struct CommandContext {
    pub path: PathBuf,
    pub spec: ArchSpec,
    pub config: Config,
}

impl CommandContext {
    /// Load the spec and the config next to it.
    /// Returns Err(exit_code) if the spec cannot be loaded.
    pub fn new(path: &Path, fs: &dyn FileSystem) -> Result<Self, i32> {
        let spec = load_spec(path, fs)?;

        let config = Config::load_with_fs(config_dir(path), fs).unwrap_or_else(|e| {
            style::warning(&format!("Failed to load config: {}. Using defaults.", e));
            Config::default()
        });

        Ok(Self {
            path: path.to_path_buf(),
            spec,
            config,
        })
    }
}

/// Load a spec, reporting failures. Returns Err(exit_code) on failure.
pub(crate) fn load_spec(path: &Path, fs: &dyn FileSystem) -> Result<ArchSpec, i32> {
    if !fs.exists(path) {
        style::error(&format!("Could not find spec: {}", style::path(path)));
        return Err(1);
    }
    ArchSpec::load(path, fs).map_err(|e| {
        style::error(&e.to_string());
        1
    })
}

/// Write a rendered report to `--output` or stdout.
///
/// Markdown headed for stdout goes through the terminal renderer; files and
/// JSON are written as is.
pub(crate) fn write_report(
    report: &ReportArgs,
    markdown: impl FnOnce() -> String,
    json: impl FnOnce() -> String,
    fs: &dyn FileSystem,
) -> i32 {
    let output_str = match report.format {
        OutputFormat::Markdown => markdown(),
        OutputFormat::Json => json(),
    };
    let render = report.output.is_none() && report.format == OutputFormat::Markdown;
    write_output(report.output.as_deref(), &output_str, render, fs)
}

pub(crate) fn write_output(
    output_path: Option<&Path>,
    content: &str,
    render_markdown: bool,
    fs: &dyn FileSystem,
) -> i32 {
    let mut output: Box<dyn Write> = match output_path {
        Some(path) => match fs.create_file(path) {
            Ok(writer) => writer,
            Err(e) => {
                style::error(&format!("Could not create output file: {}", e));
                return 1;
            }
        },
        None => Box::new(io::stdout()),
    };

    let write_result = if render_markdown {
        style::render_markdown(content, &mut output)
    } else {
        writeln!(output, "{}", content.trim_end())
    };

    if let Err(e) = write_result.and_then(|_| output.flush()) {
        style::error(&format!("Failed to write output: {}", e));
        return 1;
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFs;

    const SPEC: &str = "name: Ctx\ncomponents:\n  - id: web\n    service: ec2\n    provider: aws\n    label: Web\n";

    #[test]
    fn test_context_loads_spec_and_config() {
        let fs = MockFs::with_files([
            ("/p/arch.yaml", SPEC),
            ("/p/.cloudwright.toml", "[layout]\nnode_width = 150.0\n"),
        ]);
        let ctx = CommandContext::new(Path::new("/p/arch.yaml"), &fs).ok().unwrap();
        assert_eq!(ctx.spec.name, "Ctx");
        assert_eq!(ctx.config.layout.node_width, 150.0);
    }

    #[test]
    fn test_context_bad_config_falls_back() {
        let fs = MockFs::with_files([
            ("/p/arch.yaml", SPEC),
            ("/p/.cloudwright.toml", "[lint]\ndisabled = [\"bogus\"]\n"),
        ]);
        let ctx = CommandContext::new(Path::new("/p/arch.yaml"), &fs).ok().unwrap();
        assert!(ctx.config.lint.disabled.is_empty());
    }

    #[test]
    fn test_context_missing_spec() {
        let fs = MockFs::new();
        assert_eq!(CommandContext::new(Path::new("/p/none.yaml"), &fs).err(), Some(1));
    }

    #[test]
    fn test_write_report_to_file() {
        let fs = MockFs::new();
        let report = ReportArgs {
            format: OutputFormat::Json,
            output: Some(PathBuf::from("/out.json")),
        };
        let code = write_report(&report, || "# md".to_string(), || "{}".to_string(), &fs);
        assert_eq!(code, 0);
        assert_eq!(fs.files()["/out.json"], "{}\n");
    }
}
