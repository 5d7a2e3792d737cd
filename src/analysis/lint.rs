use crate::analysis::DependencyGraph;
use crate::config::LintConfig;
use crate::model::{ArchSpec, Component, Issue, IssueSeverity, LintRule};

const DATA_STORE_KEYWORDS: &[&str] = &[
    "rds",
    "dynamodb",
    "s3",
    "elasticache",
    "redshift",
    "aurora",
    "cosmos",
    "cloud_sql",
    "storage",
];
const COMPUTE_KEYWORDS: &[&str] = &["ec2", "ecs", "eks", "compute", "vm", "app_service", "cloud_run"];
const LB_KEYWORDS: &[&str] = &["alb", "nlb", "load_balancer", "elb", "app_gateway"];
const DB_KEYWORDS: &[&str] = &[
    "rds",
    "dynamodb",
    "elasticache",
    "redshift",
    "aurora",
    "cosmos",
    "cloud_sql",
];
const MONITORING_KEYWORDS: &[&str] = &[
    "monitoring",
    "cloudwatch",
    "logging",
    "stackdriver",
    "azure_monitor",
    "datadog",
    "newrelic",
];
const WAF_KEYWORDS: &[&str] = &["waf", "shield"];
const AUTH_KEYWORDS: &[&str] = &["cognito", "auth", "iam", "azure_ad", "identity", "okta"];
const API_GATEWAY_KEYWORDS: &[&str] = &["api_gateway", "apigw", "api-gateway"];
const OVERSIZED_KEYWORDS: &[&str] = &["16xlarge", "24xlarge", "metal"];

fn matches_any(service: &str, keywords: &[&str]) -> bool {
    let service = service.to_lowercase();
    keywords.iter().any(|k| service.contains(k))
}

fn is_data_store(c: &Component) -> bool {
    matches_any(&c.service, DATA_STORE_KEYWORDS)
}

fn is_db(c: &Component) -> bool {
    matches_any(&c.service, DB_KEYWORDS)
}

fn is_compute(c: &Component) -> bool {
    matches_any(&c.service, COMPUTE_KEYWORDS)
}

fn is_lb(c: &Component) -> bool {
    matches_any(&c.service, LB_KEYWORDS)
}

fn is_ingress(c: &Component) -> bool {
    is_lb(c) || matches_any(&c.service, API_GATEWAY_KEYWORDS)
}

/// Run every enabled rule, in rule order.
pub fn lint(spec: &ArchSpec, config: &LintConfig) -> Vec<Issue> {
    let checks: [(LintRule, fn(&ArchSpec) -> Vec<Issue>); 11] = [
        (LintRule::NoEncryption, check_no_encryption),
        (LintRule::SingleAz, check_single_az),
        (LintRule::OversizedInstances, check_oversized_instances),
        (LintRule::NoLoadBalancer, check_no_load_balancer),
        (LintRule::PublicDatabase, check_public_database),
        (LintRule::NoWaf, check_no_waf),
        (LintRule::NoMonitoring, check_no_monitoring),
        (LintRule::SinglePointOfFailure, check_single_point_of_failure),
        (LintRule::NoBackup, check_no_backup),
        (LintRule::NoAuth, check_no_auth),
        (LintRule::CircularDependency, check_circular_dependencies),
    ];

    checks
        .into_iter()
        .filter(|(rule, _)| config.is_enabled(*rule))
        .flat_map(|(_, check)| check(spec))
        .collect()
}

fn check_no_encryption(spec: &ArchSpec) -> Vec<Issue> {
    spec.components
        .iter()
        .filter(|c| is_data_store(c) && !c.config_flag("encryption"))
        .map(|c| Issue::no_encryption(&c.id, &c.label, &c.service))
        .collect()
}

fn check_single_az(spec: &ArchSpec) -> Vec<Issue> {
    if spec.components.len() < 3 {
        return Vec::new();
    }
    spec.components
        .iter()
        .filter(|c| is_db(c) && !c.config_flag("multi_az"))
        .map(|c| Issue::single_az(&c.id, &c.label, &c.service))
        .collect()
}

fn check_oversized_instances(spec: &ArchSpec) -> Vec<Issue> {
    let mut issues = Vec::new();
    for c in &spec.components {
        let instance_type = ["instance_type", "instance_class"]
            .iter()
            .filter_map(|key| c.config.get(*key))
            .find(|v| crate::model::is_truthy(v))
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            });
        let Some(instance_type) = instance_type else {
            continue;
        };
        if matches_any(&instance_type, OVERSIZED_KEYWORDS) {
            issues.push(Issue::oversized_instance(&c.id, &c.label, &instance_type));
        }
    }
    issues
}

fn check_no_load_balancer(spec: &ArchSpec) -> Vec<Issue> {
    let compute = spec.components.iter().filter(|c| is_compute(c)).count();
    if compute < 2 || spec.components.iter().any(is_lb) {
        return Vec::new();
    }
    vec![Issue::no_load_balancer(compute)]
}

fn check_public_database(spec: &ArchSpec) -> Vec<Issue> {
    spec.components
        .iter()
        .filter(|c| is_db(c) && c.config_flag("publicly_accessible"))
        .map(|c| Issue::public_database(&c.id, &c.label, &c.service))
        .collect()
}

fn check_no_waf(spec: &ArchSpec) -> Vec<Issue> {
    let has_ingress = spec.components.iter().any(is_ingress);
    let has_waf = spec
        .components
        .iter()
        .any(|c| matches_any(&c.service, WAF_KEYWORDS));
    if has_ingress && !has_waf {
        vec![Issue::no_waf()]
    } else {
        Vec::new()
    }
}

fn check_no_monitoring(spec: &ArchSpec) -> Vec<Issue> {
    if spec.components.len() < 3 {
        return Vec::new();
    }
    let has_monitoring = spec
        .components
        .iter()
        .any(|c| matches_any(&c.service, MONITORING_KEYWORDS));
    if has_monitoring {
        Vec::new()
    } else {
        vec![Issue::no_monitoring(spec.components.len())]
    }
}

fn check_single_point_of_failure(spec: &ArchSpec) -> Vec<Issue> {
    let compute: Vec<&Component> = spec.components.iter().filter(|c| is_compute(c)).collect();
    match compute.as_slice() {
        [only] if !only.config_flag("auto_scaling") => {
            vec![Issue::single_point_of_failure(&only.id, &only.label)]
        }
        _ => Vec::new(),
    }
}

fn check_no_backup(spec: &ArchSpec) -> Vec<Issue> {
    spec.components
        .iter()
        .filter(|c| {
            is_db(c) && !(c.config_flag("backup") || c.config_flag("point_in_time_recovery"))
        })
        .map(|c| Issue::no_backup(&c.id, &c.label, &c.service))
        .collect()
}

fn check_no_auth(spec: &ArchSpec) -> Vec<Issue> {
    let has_ingress = spec.components.iter().any(is_ingress);
    let has_auth = spec
        .components
        .iter()
        .any(|c| matches_any(&c.service, AUTH_KEYWORDS));
    if has_ingress && !has_auth {
        vec![Issue::no_auth()]
    } else {
        Vec::new()
    }
}

fn check_circular_dependencies(spec: &ArchSpec) -> Vec<Issue> {
    DependencyGraph::build(spec)
        .cycles()
        .iter()
        .map(|cycle| Issue::circular_dependency(cycle))
        .collect()
}

pub fn format_lint_markdown(issues: &[Issue], spec_name: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Lint: {}\n\n", spec_name));

    if issues.is_empty() {
        output.push_str("*No issues found.*\n");
        return output;
    }

    let count = |severity: IssueSeverity| issues.iter().filter(|i| i.severity == severity).count();
    output.push_str(&format!(
        "**{}** error(s), **{}** warning(s), **{}** info\n\n",
        count(IssueSeverity::Error),
        count(IssueSeverity::Warn),
        count(IssueSeverity::Info)
    ));

    for severity in [IssueSeverity::Error, IssueSeverity::Warn, IssueSeverity::Info] {
        let group: Vec<&Issue> = issues.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        let heading = match severity {
            IssueSeverity::Error => "Errors",
            IssueSeverity::Warn => "Warnings",
            IssueSeverity::Info => "Info",
        };
        output.push_str(&format!("## {} ({})\n\n", heading, group.len()));
        for issue in group {
            match &issue.component {
                Some(id) => output.push_str(&format!(
                    "- **{}** `{}`: {}\n",
                    issue.rule, id, issue.message
                )),
                None => output.push_str(&format!("- **{}**: {}\n", issue.rule, issue.message)),
            }
            output.push_str(&format!("  - {}\n", issue.recommendation));
        }
        output.push('\n');
    }

    output
}

pub fn format_lint_json(issues: &[Issue]) -> String {
    serde_json::to_string_pretty(issues).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, Provider};
    use std::collections::HashSet;

    #[test]
    fn test_format_lint_markdown_groups_by_severity() {
        let spec = ArchSpec::new("Open").with_component(comp("api", "api_gateway"));
        let md = format_lint_markdown(&lint(&spec, &LintConfig::default()), "Open");
        assert!(md.contains("**0** error(s), **2** warning(s)"));
        assert!(md.contains("## Warnings (2)"));
        assert!(!md.contains("## Errors"));
        assert!(md.contains("- **no_waf**:"));
    }

    fn comp(id: &str, service: &str) -> Component {
        Component::new(id, service, Provider::Aws, id.to_uppercase()).unwrap()
    }

    fn rules(issues: &[Issue]) -> Vec<LintRule> {
        issues.iter().map(|i| i.rule).collect()
    }

    fn well_architected() -> ArchSpec {
        ArchSpec::new("Good")
            .with_component(comp("waf", "waf"))
            .with_component(comp("auth", "cognito"))
            .with_component(comp("lb", "alb"))
            .with_component(comp("web", "ecs").with_config("auto_scaling", true))
            .with_component(
                comp("db", "rds")
                    .with_config("encryption", true)
                    .with_config("multi_az", true)
                    .with_config("backup", true),
            )
            .with_component(comp("logs", "cloudwatch"))
            .with_connection(Connection::new("lb", "web"))
            .with_connection(Connection::new("web", "db"))
    }

    #[test]
    fn test_clean_architecture_has_no_issues() {
        let issues = lint(&well_architected(), &LintConfig::default());
        assert!(issues.is_empty(), "unexpected: {:?}", rules(&issues));
    }

    #[test]
    fn test_database_rules() {
        let spec = ArchSpec::new("Bare")
            .with_component(comp("web", "ec2").with_config("auto_scaling", true))
            .with_component(comp("db", "rds").with_config("publicly_accessible", true))
            .with_component(comp("logs", "cloudwatch"));
        let found = rules(&lint(&spec, &LintConfig::default()));
        assert_eq!(
            found,
            vec![
                LintRule::NoEncryption,
                LintRule::SingleAz,
                LintRule::PublicDatabase,
                LintRule::NoBackup,
            ]
        );
    }

    #[test]
    fn test_single_az_needs_three_components() {
        let spec = ArchSpec::new("Small").with_component(comp("db", "rds").with_config("encryption", true));
        let found = rules(&lint(&spec, &LintConfig::default()));
        assert!(!found.contains(&LintRule::SingleAz));
        assert!(found.contains(&LintRule::NoBackup));
    }

    #[test]
    fn test_compute_rules() {
        let two = ArchSpec::new("Two")
            .with_component(comp("a", "ec2"))
            .with_component(comp("b", "ec2"));
        let issues = lint(&two, &LintConfig::default());
        assert_eq!(rules(&issues), vec![LintRule::NoLoadBalancer]);
        assert!(issues[0].message.contains("2 compute components"));
        assert!(issues[0].component.is_none());

        let one = ArchSpec::new("One").with_component(comp("a", "ec2"));
        let issues = lint(&one, &LintConfig::default());
        assert_eq!(rules(&issues), vec![LintRule::SinglePointOfFailure]);
        assert_eq!(issues[0].severity, IssueSeverity::Error);
    }

    #[test]
    fn test_oversized_instance() {
        let spec = ArchSpec::new("Big").with_component(
            comp("batch", "ec2")
                .with_config("instance_type", "m5.24xlarge")
                .with_config("auto_scaling", true),
        );
        let issues = lint(&spec, &LintConfig::default());
        assert_eq!(rules(&issues), vec![LintRule::OversizedInstances]);
        assert!(issues[0].message.contains("'m5.24xlarge'"));
    }

    #[test]
    fn test_ingress_without_waf_or_auth() {
        let spec = ArchSpec::new("Open").with_component(comp("api", "api_gateway"));
        let found = rules(&lint(&spec, &LintConfig::default()));
        assert_eq!(found, vec![LintRule::NoWaf, LintRule::NoAuth]);
    }

    #[test]
    fn test_cycle_reported_as_info() {
        let spec = well_architected().with_connection(Connection::new("db", "lb"));
        let issues = lint(&spec, &LintConfig::default());
        assert_eq!(rules(&issues), vec![LintRule::CircularDependency]);
        assert_eq!(issues[0].severity, IssueSeverity::Info);
        assert!(issues[0].message.contains("lb → web → db → lb"));
    }

    #[test]
    fn test_disabled_rules_skipped() {
        let spec = ArchSpec::new("Open").with_component(comp("api", "api_gateway"));
        let config = LintConfig {
            disabled: HashSet::from([LintRule::NoWaf]),
        };
        assert_eq!(rules(&lint(&spec, &config)), vec![LintRule::NoAuth]);
    }
}
