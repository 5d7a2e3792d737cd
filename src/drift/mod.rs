//! Drift detection: compare a design spec against what is actually deployed.
//!
//! The design is the "old" side of a diff and the deployed spec the "new"
//! side, so added components are extra infrastructure, removed ones are
//! missing and changed ones have drifted.

mod cloudformation;
mod import;
mod terraform;

pub use cloudformation::CloudFormationImporter;
pub use import::{
    ImportError, Importer, InfraFormat, SpecImporter, align_ids, import_for_design, import_spec,
    importer_for,
};
pub use terraform::TerraformStateImporter;

use crate::api::CloudwrightError;
use crate::diff::{DiffResult, SecurityServices, compute_diff_with};
use crate::fs::FileSystem;
use crate::model::ArchSpec;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

pub const NO_DRIFT_SUMMARY: &str = "No drift detected. Deployed infrastructure matches design.";

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    #[serde(skip)]
    pub design_spec: ArchSpec,
    #[serde(skip)]
    pub deployed_spec: ArchSpec,
    pub diff: DiffResult,
    /// 0.0 identical, 1.0 completely different
    pub drift_score: f64,
    pub drifted_components: Vec<String>,
    pub extra_components: Vec<String>,
    pub missing_components: Vec<String>,
    pub summary: String,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !(self.drifted_components.is_empty()
            && self.extra_components.is_empty()
            && self.missing_components.is_empty())
    }
}

pub fn detect_drift(design: &ArchSpec, deployed: &ArchSpec) -> DriftReport {
    detect_drift_with(design, deployed, &SecurityServices::default())
}

pub fn detect_drift_with(
    design: &ArchSpec,
    deployed: &ArchSpec,
    security: &SecurityServices,
) -> DriftReport {
    let diff = compute_diff_with(design, deployed, security);

    let extra: Vec<String> = diff.added.iter().map(|c| c.id.clone()).collect();
    let missing: Vec<String> = diff.removed.iter().map(|c| c.id.clone()).collect();

    let mut seen = HashSet::new();
    let drifted: Vec<String> = diff
        .changed
        .iter()
        .filter(|ch| seen.insert(ch.component_id.as_str()))
        .map(|ch| ch.component_id.clone())
        .collect();

    let total_issues = extra.len() + missing.len() + drifted.len();
    let total_design = design.components.len().max(1);
    let drift_score = round3((total_issues as f64 / total_design as f64).min(1.0));

    let summary = build_drift_summary(&extra, &missing, &drifted, &diff, drift_score);

    DriftReport {
        design_spec: design.clone(),
        deployed_spec: deployed.clone(),
        diff,
        drift_score,
        drifted_components: drifted,
        extra_components: extra,
        missing_components: missing,
        summary,
    }
}

/// Load the design, import the deployed side and compare.
pub fn detect_drift_files(
    fs: &dyn FileSystem,
    design_path: &Path,
    infra_path: &Path,
    infra_format: InfraFormat,
) -> Result<DriftReport, CloudwrightError> {
    detect_drift_files_with(
        fs,
        design_path,
        infra_path,
        infra_format,
        &SecurityServices::default(),
    )
}

pub fn detect_drift_files_with(
    fs: &dyn FileSystem,
    design_path: &Path,
    infra_path: &Path,
    infra_format: InfraFormat,
    security: &SecurityServices,
) -> Result<DriftReport, CloudwrightError> {
    let design = ArchSpec::load(design_path, fs)?;
    Ok(detect_drift_against(fs, &design, infra_path, infra_format, security)?)
}

/// Import the deployed side and compare it with an already loaded design.
pub fn detect_drift_against(
    fs: &dyn FileSystem,
    design: &ArchSpec,
    infra_path: &Path,
    infra_format: InfraFormat,
    security: &SecurityServices,
) -> Result<DriftReport, ImportError> {
    let deployed = import_for_design(fs, infra_path, infra_format, design)?;
    Ok(detect_drift_with(design, &deployed, security))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn build_drift_summary(
    extra: &[String],
    missing: &[String],
    drifted: &[String],
    diff: &DiffResult,
    score: f64,
) -> String {
    if extra.is_empty() && missing.is_empty() && drifted.is_empty() {
        return NO_DRIFT_SUMMARY.to_string();
    }

    let mut parts = vec![format!("Drift score: {:.0}%", score * 100.0)];

    if !missing.is_empty() {
        parts.push(format!(
            "{} component(s) in design but not deployed: {}",
            missing.len(),
            missing.join(", ")
        ));
    }
    if !extra.is_empty() {
        parts.push(format!(
            "{} component(s) deployed but not in design: {}",
            extra.len(),
            extra.join(", ")
        ));
    }
    if !drifted.is_empty() {
        parts.push(format!(
            "{} component(s) with configuration drift: {}",
            drifted.len(),
            drifted.join(", ")
        ));
        for ch in &diff.changed {
            parts.push(format!(
                "  {}.{}: {} -> {}",
                ch.component_id, ch.field, ch.old_value, ch.new_value
            ));
        }
    }

    parts.join("\n")
}

pub fn format_drift_markdown(report: &DriftReport) -> String {
    let mut output = String::new();

    output.push_str("# Drift Report\n\n");
    output.push_str(&format!(
        "**Design**: {} | **Deployed**: {}\n\n",
        report.design_spec.name, report.deployed_spec.name
    ));
    output.push_str(&format!(
        "**Drift score**: {:.1}%\n\n",
        report.drift_score * 100.0
    ));

    if !report.has_drift() {
        output.push_str(NO_DRIFT_SUMMARY);
        output.push('\n');
        return output;
    }

    if !report.missing_components.is_empty() {
        output.push_str(&format!(
            "## Missing ({})\n\nIn the design but not deployed:\n\n",
            report.missing_components.len()
        ));
        for id in &report.missing_components {
            output.push_str(&format!("- `{}`\n", id));
        }
        output.push('\n');
    }

    if !report.extra_components.is_empty() {
        output.push_str(&format!(
            "## Extra ({})\n\nDeployed but not in the design:\n\n",
            report.extra_components.len()
        ));
        for id in &report.extra_components {
            output.push_str(&format!("- `{}`\n", id));
        }
        output.push('\n');
    }

    if !report.drifted_components.is_empty() {
        output.push_str(&format!(
            "## Drifted ({})\n\n",
            report.drifted_components.len()
        ));
        for ch in &report.diff.changed {
            output.push_str(&format!(
                "- `{}`.{}: `{}` -> `{}`\n",
                ch.component_id, ch.field, ch.old_value, ch.new_value
            ));
        }
        output.push('\n');
    }

    if !report.diff.compliance_impact.is_empty() {
        output.push_str("## Compliance Impact\n\n");
        for impact in &report.diff.compliance_impact {
            output.push_str(&format!("- ⚠ {}\n", impact));
        }
        output.push('\n');
    }

    output
}

/// Format drift report as JSON (specs omitted)
pub fn format_drift_json(report: &DriftReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}
