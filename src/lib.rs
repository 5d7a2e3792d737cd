pub mod analysis;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod drift;
pub mod export;
pub mod fs;
pub mod history;
pub mod layout;
pub mod model;
pub mod style;

pub use api::{
    CloudwrightError, LintOptions, analyze_file, diff_files, drift_files, export_file,
    history_file, layout_file, lint_file, load_spec, policy_file, version_file,
};
pub use cli::Cli;
pub use commands::{
    cmd_analyze, cmd_diff, cmd_drift, cmd_export, cmd_history, cmd_init, cmd_layout, cmd_lint,
    cmd_policy, cmd_validate, cmd_version,
};
pub use config::Config;
pub use diff::{DiffResult, compute_diff};
pub use drift::{DriftReport, InfraFormat, detect_drift};
pub use export::ExportFormat;
pub use layout::{LayoutOptions, LayoutResult, compute_layout};
pub use model::{ArchSpec, Boundary, Component, Connection, Provider};
pub use analysis::{AnalysisResult, PolicyResult, PolicyRule, analyze};
