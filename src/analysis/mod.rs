//! Dependency analysis over a spec's connection graph: blast radius,
//! single points of failure, cycles, the architecture linter and
//! policy rules.

mod graph;
mod impact;
mod lint;
mod policy;

pub use graph::DependencyGraph;
pub use impact::{
    AnalysisResult, ComponentImpact, analyze, format_analysis_json, format_analysis_markdown,
    format_dependency_tree,
};
pub use lint::{format_lint_json, format_lint_markdown, lint};
pub use policy::{
    PolicyCheck, PolicyCheckResult, PolicyError, PolicyResult, PolicyRule, PolicySeverity,
    evaluate, format_policy_json, format_policy_markdown, load_rules, parse_rules,
};
