use crate::drift::InfraFormat;
use crate::export::ExportFormat;
use crate::model::IssueSeverity;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cloudwright")]
#[command(about = "Diff, analyze, lint and export cloud architecture specs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check that a spec parses and is internally consistent
    Validate(ValidateArgs),

    /// Blast radius, single points of failure and the critical path
    Analyze(AnalyzeArgs),

    /// Compare two versions of a spec
    Diff(DiffArgs),

    /// Compare a design spec against deployed infrastructure
    Drift(DriftArgs),

    /// Compute diagram coordinates for a spec
    Layout(LayoutArgs),

    /// Check a spec for architecture anti-patterns
    Lint(LintArgs),

    /// Evaluate a spec against policy rules
    Policy(PolicyArgs),

    /// Render a spec as a diagram or data document
    Export(ExportArgs),

    /// Stamp a new version into a spec's history
    Version(VersionArgs),

    /// Show a spec's version history
    History(HistoryArgs),

    /// Generate a starter .cloudwright.toml configuration file
    Init(InitArgs),
}

/// Report format and destination shared by reporting commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Output format
    #[arg(short, long, default_value = "markdown")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,

    /// Only analyze this component
    #[arg(short, long)]
    pub component: Option<String>,

    /// Show ASCII dependency tree
    #[arg(long)]
    pub tree: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    /// Baseline spec
    pub old: PathBuf,

    /// Updated spec
    pub new: PathBuf,

    /// Exit with error if any difference is found
    #[arg(long)]
    pub fail_on_changes: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct DriftArgs {
    /// Design spec
    pub design: PathBuf,

    /// Deployed infrastructure (Terraform state or spec file)
    pub infra: PathBuf,

    /// Format of the infrastructure file
    #[arg(long, default_value = "auto")]
    pub infra_format: InfraFormat,

    /// Exit with error if any drift is found
    #[arg(long)]
    pub fail_on_drift: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct LayoutArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct LintArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,

    /// Minimum severity to report
    #[arg(long, default_value = "info")]
    pub min_severity: IssueSeverity,

    /// Exit with error if any error-severity issue is found
    #[arg(long)]
    pub fail_on_error: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct PolicyArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,

    /// Policy rules file (YAML with a top-level `rules:` list)
    #[arg(short, long)]
    pub rules: PathBuf,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,

    /// Target format
    #[arg(long = "to", default_value = "mermaid")]
    pub to: ExportFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct VersionArgs {
    /// Spec file to stamp; rewritten in place unless --output is given
    pub spec: PathBuf,

    /// Description of this version
    #[arg(short, long)]
    pub message: String,

    /// Author recorded with the version
    #[arg(long, default_value = "")]
    pub author: String,

    /// Write the stamped spec here instead
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryArgs {
    /// Spec file (YAML or JSON)
    pub spec: PathBuf,

    /// Compare the latest version against this later (or earlier) spec
    #[arg(long)]
    pub against: Option<PathBuf>,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Path where to create .cloudwright.toml (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}
