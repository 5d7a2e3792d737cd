//! Clean library API for cloudwright.
//!
//! This module provides a programmatic interface for using cloudwright as a Rust library.
//! Unlike the CLI commands which print output and return exit codes, these functions
//! take spec paths and return proper Result types that can be handled by calling code.
//! Each looks for a `.cloudwright.toml` next to the spec and falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use cloudwright::diff_files;
//! use std::path::Path;
//!
//! let diff = diff_files(Path::new("v1.yaml"), Path::new("v2.yaml"))?;
//! println!("{}", diff.summary);
//! for change in &diff.changed {
//!     println!("{}: {} -> {}", change.component_id, change.old_value, change.new_value);
//! }
//! # Ok::<(), cloudwright::CloudwrightError>(())
//! ```

use crate::analysis::{self, AnalysisResult, PolicyError, PolicyResult};
use crate::config::{Config, ConfigError};
use crate::diff::{self, DiffResult};
use crate::drift::{self, DriftReport, ImportError, InfraFormat};
use crate::export::{self, ExportError, ExportFormat};
use crate::fs::{FileSystem, default_fs};
use crate::history::{self, HistoryError, TimelineEntry};
use crate::layout::{self, LayoutResult};
use crate::model::{ArchSpec, Issue, IssueSeverity, SpecError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during cloudwright operations.
#[derive(Debug, Error)]
pub enum CloudwrightError {
    /// The specified spec file does not exist.
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The spec could not be read, parsed or validated.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// The deployed infrastructure could not be imported.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// The policy rules could not be read or parsed.
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Version history error.
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// IO error while writing results.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for the `lint_file` function.
#[derive(Debug, Clone, Copy)]
pub struct LintOptions {
    /// Drop issues below this severity.
    pub min_severity: IssueSeverity,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            min_severity: IssueSeverity::Info,
        }
    }
}

/// Directory whose `.cloudwright.toml` applies to `spec_path`.
pub(crate) fn config_dir(spec_path: &Path) -> &Path {
    match spec_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Load the config that applies to a spec, falling back to defaults.
pub(crate) fn config_for(spec_path: &Path, fs: &dyn FileSystem) -> Config {
    Config::load_with_fs(config_dir(spec_path), fs).unwrap_or_default()
}

fn load(path: &Path, fs: &dyn FileSystem) -> Result<ArchSpec, CloudwrightError> {
    if !fs.exists(path) {
        return Err(CloudwrightError::PathNotFound(path.to_path_buf()));
    }
    Ok(ArchSpec::load(path, fs)?)
}

/// Load and validate a spec file.
pub fn load_spec(path: &Path) -> Result<ArchSpec, CloudwrightError> {
    load(path, default_fs())
}

/// Diff two spec files.
///
/// Extra security services from the new spec's `.cloudwright.toml` feed the
/// compliance assessment.
pub fn diff_files(old: &Path, new: &Path) -> Result<DiffResult, CloudwrightError> {
    diff_files_with_fs(old, new, default_fs())
}

pub fn diff_files_with_fs(
    old: &Path,
    new: &Path,
    fs: &dyn FileSystem,
) -> Result<DiffResult, CloudwrightError> {
    let old_spec = load(old, fs)?;
    let new_spec = load(new, fs)?;
    let security = config_for(new, fs).diff.security_services();
    Ok(diff::compute_diff_with(&old_spec, &new_spec, &security))
}

/// Compare a design spec against deployed infrastructure.
///
/// # Example
///
/// ```no_run
/// use cloudwright::{drift_files, InfraFormat};
/// use std::path::Path;
///
/// let report = drift_files(
///     Path::new("design.yaml"),
///     Path::new("terraform.tfstate"),
///     InfraFormat::Auto,
/// )?;
/// println!("drift score {:.2}", report.drift_score);
/// # Ok::<(), cloudwright::CloudwrightError>(())
/// ```
pub fn drift_files(
    design: &Path,
    infra: &Path,
    format: InfraFormat,
) -> Result<DriftReport, CloudwrightError> {
    drift_files_with_fs(design, infra, format, default_fs())
}

pub fn drift_files_with_fs(
    design: &Path,
    infra: &Path,
    format: InfraFormat,
    fs: &dyn FileSystem,
) -> Result<DriftReport, CloudwrightError> {
    for path in [design, infra] {
        if !fs.exists(path) {
            return Err(CloudwrightError::PathNotFound(path.to_path_buf()));
        }
    }
    let security = config_for(design, fs).diff.security_services();
    drift::detect_drift_files_with(fs, design, infra, format, &security)
}

/// Blast radius analysis of a spec file, optionally narrowed to one component.
pub fn analyze_file(
    path: &Path,
    component: Option<&str>,
) -> Result<AnalysisResult, CloudwrightError> {
    let spec = load_spec(path)?;
    Ok(analysis::analyze(&spec, component))
}

/// Lint a spec file with the rules enabled in its config.
pub fn lint_file(path: &Path, options: LintOptions) -> Result<Vec<Issue>, CloudwrightError> {
    lint_file_with_fs(path, options, default_fs())
}

pub fn lint_file_with_fs(
    path: &Path,
    options: LintOptions,
    fs: &dyn FileSystem,
) -> Result<Vec<Issue>, CloudwrightError> {
    let spec = load(path, fs)?;
    let config = config_for(path, fs);
    Ok(analysis::lint(&spec, &config.lint)
        .into_iter()
        .filter(|issue| issue.severity >= options.min_severity)
        .collect())
}

/// Evaluate a spec file against a YAML policy file.
///
/// `budget_monthly` rules read the spec's attached cost estimate.
pub fn policy_file(path: &Path, rules: &Path) -> Result<PolicyResult, CloudwrightError> {
    policy_file_with_fs(path, rules, default_fs())
}

pub fn policy_file_with_fs(
    path: &Path,
    rules: &Path,
    fs: &dyn FileSystem,
) -> Result<PolicyResult, CloudwrightError> {
    let spec = load(path, fs)?;
    let rules = analysis::load_rules(rules, fs)?;
    Ok(analysis::evaluate(
        &spec,
        &rules,
        spec.cost_estimate.as_ref(),
    ))
}

/// Lay out a spec file with the dimensions from its config.
pub fn layout_file(path: &Path) -> Result<LayoutResult, CloudwrightError> {
    let fs = default_fs();
    let spec = load(path, fs)?;
    let config = config_for(path, fs);
    Ok(layout::compute_layout(&spec, &config.layout))
}

/// Render a spec file in the given export format.
pub fn export_file(path: &Path, format: ExportFormat) -> Result<String, CloudwrightError> {
    let spec = load_spec(path)?;
    Ok(export::export(&spec, format)?)
}

/// Stamp a new version into the spec file in place and return its id.
///
/// # Example
///
/// ```no_run
/// use cloudwright::version_file;
/// use std::path::Path;
///
/// let id = version_file(Path::new("arch.yaml"), "add read replica", "ops")?;
/// println!("stamped {}", id);
/// # Ok::<(), cloudwright::CloudwrightError>(())
/// ```
pub fn version_file(path: &Path, message: &str, author: &str) -> Result<String, CloudwrightError> {
    version_file_with_fs(path, path, message, author, default_fs())
}

/// Stamp the spec at `path` and write the result to `output`.
pub fn version_file_with_fs(
    path: &Path,
    output: &Path,
    message: &str,
    author: &str,
    fs: &dyn FileSystem,
) -> Result<String, CloudwrightError> {
    let spec = load(path, fs)?;
    let (stamped, id) = history::create_version(&spec, message, author)?;
    stamped.save(output, fs)?;
    Ok(id)
}

/// Version timeline of a spec file, oldest first. Fails on a broken chain.
pub fn history_file(path: &Path) -> Result<Vec<TimelineEntry>, CloudwrightError> {
    let spec = load_spec(path)?;
    history::verify_chain(&spec.history)?;
    Ok(history::timeline(&spec))
}
