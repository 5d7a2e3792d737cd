//! Policy-as-code: named rules from a YAML file, each running one of a
//! fixed set of checks against a spec.

use crate::fs::FileSystem;
use crate::model::{ArchSpec, CostEstimate, format_usd};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_MAX_COMPONENTS: i64 = 20;
const DEFAULT_MIN_REDUNDANCY: i64 = 2;

/// Services that hold no data and need no encryption config.
const STATELESS_SERVICES: &[&str] = &[
    "alb",
    "nlb",
    "route53",
    "api_gateway",
    "waf",
    "cognito",
    "cloudfront",
];
const ENCRYPTION_KEYS: &[&str] = &["encryption", "storage_encrypted", "kms_key_id", "sse_algorithm"];
const MULTI_AZ_SERVICES: &[&str] = &["rds", "aurora", "elasticache", "cloud_sql", "azure_sql"];
/// Services the provider already replicates.
const MANAGED_REDUNDANT: &[&str] = &["s3", "cloud_storage", "blob_storage", "dynamodb", "route53"];
const COUNT_KEYS: &[&str] = &["count", "desired_count", "num_cache_nodes"];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read policy file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid policy file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicySeverity {
    /// Fails the evaluation
    Deny,
    #[default]
    Warn,
    Info,
}

impl PolicySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicySeverity::Deny => "deny",
            PolicySeverity::Warn => "warn",
            PolicySeverity::Info => "info",
        }
    }
}

/// The built-in checks a rule can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyCheck {
    MaxComponents,
    AllEncrypted,
    RequireMultiAz,
    BudgetMonthly,
    NoBannedServices,
    RequiredTags,
    MinRedundancy,
    AllowedProviders,
    AllowedRegions,
}

impl std::str::FromStr for PolicyCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max_components" => Ok(PolicyCheck::MaxComponents),
            "all_encrypted" => Ok(PolicyCheck::AllEncrypted),
            "require_multi_az" => Ok(PolicyCheck::RequireMultiAz),
            "budget_monthly" => Ok(PolicyCheck::BudgetMonthly),
            "no_banned_services" => Ok(PolicyCheck::NoBannedServices),
            "required_tags" => Ok(PolicyCheck::RequiredTags),
            "min_redundancy" => Ok(PolicyCheck::MinRedundancy),
            "allowed_providers" => Ok(PolicyCheck::AllowedProviders),
            "allowed_regions" => Ok(PolicyCheck::AllowedRegions),
            _ => Err(format!("Unknown check: {}", s)),
        }
    }
}

/// One rule from a policy file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: PolicySeverity,
    /// Name of a [`PolicyCheck`]; unknown names fail the rule
    pub check: String,
    /// Check argument: a limit, or a list of names
    #[serde(default)]
    pub value: Option<Value>,
}

impl PolicyRule {
    pub fn new(name: &str, check: &str, severity: PolicySeverity) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            severity,
            check: check.to_string(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyCheckResult {
    pub rule: String,
    pub description: String,
    pub severity: PolicySeverity,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyResult {
    /// No `deny` rule failed
    pub passed: bool,
    pub deny_count: usize,
    pub warn_count: usize,
    pub info_count: usize,
    pub results: Vec<PolicyCheckResult>,
}

#[derive(Debug, Deserialize)]
struct RawPolicyFile {
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

/// Parse the `rules:` list of a policy document.
pub fn parse_rules(text: &str) -> Result<Vec<PolicyRule>, PolicyError> {
    let raw: RawPolicyFile = serde_yaml::from_str(text)?;
    Ok(raw.rules)
}

pub fn load_rules(path: &Path, fs: &dyn FileSystem) -> Result<Vec<PolicyRule>, PolicyError> {
    let text = fs.read_to_string(path).map_err(|source| PolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rules(&text)
}

/// Run every rule against `spec`. `budget_monthly` reads `cost`.
pub fn evaluate(
    spec: &ArchSpec,
    rules: &[PolicyRule],
    cost: Option<&CostEstimate>,
) -> PolicyResult {
    let results: Vec<PolicyCheckResult> = rules
        .iter()
        .map(|rule| {
            let (passed, message) = match rule.check.parse::<PolicyCheck>() {
                Ok(check) => run_check(check, spec, rule.value.as_ref(), cost),
                Err(message) => (false, message),
            };
            PolicyCheckResult {
                rule: rule.name.clone(),
                description: rule.description.clone(),
                severity: rule.severity,
                passed,
                message,
            }
        })
        .collect();

    let failed = |severity: PolicySeverity| {
        results
            .iter()
            .filter(|r| !r.passed && r.severity == severity)
            .count()
    };
    let deny_count = failed(PolicySeverity::Deny);
    let warn_count = failed(PolicySeverity::Warn);
    let info_count = failed(PolicySeverity::Info);

    PolicyResult {
        passed: deny_count == 0,
        deny_count,
        warn_count,
        info_count,
        results,
    }
}

fn run_check(
    check: PolicyCheck,
    spec: &ArchSpec,
    value: Option<&Value>,
    cost: Option<&CostEstimate>,
) -> (bool, String) {
    match check {
        PolicyCheck::MaxComponents => check_max_components(spec, value),
        PolicyCheck::AllEncrypted => check_all_encrypted(spec),
        PolicyCheck::RequireMultiAz => check_require_multi_az(spec),
        PolicyCheck::BudgetMonthly => check_budget_monthly(value, cost),
        PolicyCheck::NoBannedServices => check_no_banned_services(spec, value),
        PolicyCheck::RequiredTags => check_required_tags(spec, value),
        PolicyCheck::MinRedundancy => check_min_redundancy(spec, value),
        PolicyCheck::AllowedProviders => check_allowed_providers(spec, value),
        PolicyCheck::AllowedRegions => check_allowed_regions(spec, value),
    }
}

fn value_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_int(value: Option<&Value>, default: i64) -> i64 {
    value_number(value).map_or(default, |n| n as i64)
}

/// String items of a list value; anything else is an empty list.
fn value_list(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => BTreeSet::new(),
    }
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn check_max_components(spec: &ArchSpec, value: Option<&Value>) -> (bool, String) {
    let limit = value_int(value, DEFAULT_MAX_COMPONENTS);
    let count = spec.components.len();
    (
        count as i64 <= limit,
        format!("{} components (limit: {})", count, limit),
    )
}

fn check_all_encrypted(spec: &ArchSpec) -> (bool, String) {
    let unencrypted: Vec<&str> = spec
        .components
        .iter()
        .filter(|c| !STATELESS_SERVICES.contains(&c.service.as_str()))
        .filter(|c| !ENCRYPTION_KEYS.iter().any(|key| c.config.contains_key(*key)))
        .map(|c| c.id.as_str())
        .collect();

    if unencrypted.is_empty() {
        (
            true,
            "All applicable components have encryption configured".to_string(),
        )
    } else {
        (
            false,
            format!(
                "Components without encryption config: {}",
                unencrypted.join(", ")
            ),
        )
    }
}

fn check_require_multi_az(spec: &ArchSpec) -> (bool, String) {
    let failing: Vec<&str> = spec
        .components
        .iter()
        .filter(|c| MULTI_AZ_SERVICES.contains(&c.service.as_str()) && !c.config_flag("multi_az"))
        .map(|c| c.id.as_str())
        .collect();

    if failing.is_empty() {
        (
            true,
            "All database components have Multi-AZ enabled".to_string(),
        )
    } else {
        (
            false,
            format!("Components without Multi-AZ: {}", failing.join(", ")),
        )
    }
}

fn check_budget_monthly(value: Option<&Value>, cost: Option<&CostEstimate>) -> (bool, String) {
    let limit = value_number(value).unwrap_or(0.0);
    let Some(cost) = cost else {
        return (
            false,
            "No cost estimate available; attach a cost_estimate to the spec".to_string(),
        );
    };
    (
        cost.monthly_total <= limit,
        format!(
            "{}/month (budget: {})",
            format_usd(cost.monthly_total),
            format_usd(limit)
        ),
    )
}

fn check_no_banned_services(spec: &ArchSpec, value: Option<&Value>) -> (bool, String) {
    let banned = value_list(value);
    let found: Vec<&str> = spec
        .components
        .iter()
        .filter(|c| banned.contains(&c.service))
        .map(|c| c.id.as_str())
        .collect();

    if found.is_empty() {
        (true, "No banned services found".to_string())
    } else {
        (
            false,
            format!("Banned services used by: {}", found.join(", ")),
        )
    }
}

fn check_required_tags(spec: &ArchSpec, value: Option<&Value>) -> (bool, String) {
    let required = value_list(value);
    let mut missing = Vec::new();
    for c in &spec.components {
        let tags = c.config.get("tags").and_then(Value::as_object);
        let absent: BTreeSet<String> = required
            .iter()
            .filter(|key| !tags.is_some_and(|t| t.contains_key(*key)))
            .cloned()
            .collect();
        if !absent.is_empty() {
            missing.push(format!("{} (missing: {})", c.id, join(&absent)));
        }
    }

    if missing.is_empty() {
        (true, "All components have required tags".to_string())
    } else {
        (
            false,
            format!("Components with missing tags: {}", missing.join("; ")),
        )
    }
}

fn check_min_redundancy(spec: &ArchSpec, value: Option<&Value>) -> (bool, String) {
    let min_count = value_int(value, DEFAULT_MIN_REDUNDANCY);
    let mut failing = Vec::new();
    for c in &spec.components {
        if MANAGED_REDUNDANT.contains(&c.service.as_str()) {
            continue;
        }
        let count = COUNT_KEYS
            .iter()
            .find_map(|key| c.config.get(*key))
            .map_or(1, |v| value_int(Some(v), 1));
        if count < min_count {
            failing.push(format!("{} (count: {})", c.id, count));
        }
    }

    if failing.is_empty() {
        (
            true,
            format!("All components meet minimum redundancy of {}", min_count),
        )
    } else {
        (
            false,
            format!(
                "Components below minimum redundancy ({}): {}",
                min_count,
                failing.join("; ")
            ),
        )
    }
}

fn check_allowed_providers(spec: &ArchSpec, value: Option<&Value>) -> (bool, String) {
    let allowed = value_list(value);
    let mut violations = Vec::new();
    if !allowed.contains(&spec.provider.to_string()) {
        violations.push(format!("spec.provider={}", spec.provider));
    }
    violations.extend(
        spec.components
            .iter()
            .filter(|c| !allowed.contains(&c.provider.to_string()))
            .map(|c| c.id.clone()),
    );

    if violations.is_empty() {
        (
            true,
            format!("All components use allowed providers: {}", join(&allowed)),
        )
    } else {
        (
            false,
            format!("Disallowed providers: {}", violations.join(", ")),
        )
    }
}

fn check_allowed_regions(spec: &ArchSpec, value: Option<&Value>) -> (bool, String) {
    let allowed = value_list(value);
    if allowed.contains(&spec.region) {
        (true, format!("Region {} is allowed", spec.region))
    } else {
        (
            false,
            format!(
                "Region {} not in allowed list: {}",
                spec.region,
                join(&allowed)
            ),
        )
    }
}

pub fn format_policy_markdown(result: &PolicyResult, spec_name: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Policy Evaluation: {}\n\n", spec_name));

    if result.results.is_empty() {
        output.push_str("*No rules defined.*\n");
        return output;
    }

    output.push_str("| Status | Rule | Severity | Message |\n");
    output.push_str("|---|---|---|---|\n");
    for check in &result.results {
        let status = if check.passed {
            "PASS"
        } else {
            match check.severity {
                PolicySeverity::Deny => "DENY",
                PolicySeverity::Warn => "WARN",
                PolicySeverity::Info => "INFO",
            }
        };
        output.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            status,
            check.rule,
            check.severity.as_str().to_uppercase(),
            check.message.replace('|', "\\|")
        ));
    }
    output.push('\n');

    if result.deny_count == 0 && result.warn_count == 0 && result.info_count == 0 {
        output.push_str("**All policies passed.**\n");
    } else {
        output.push_str(&format!(
            "**{}** denied, **{}** warning(s), **{}** info\n",
            result.deny_count, result.warn_count, result.info_count
        ));
    }

    output
}

pub fn format_policy_json(result: &PolicyResult) -> String {
    let output = json!({
        "passed": result.passed,
        "deny_count": result.deny_count,
        "warn_count": result.warn_count,
        "info_count": result.info_count,
        "results": result.results,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}
