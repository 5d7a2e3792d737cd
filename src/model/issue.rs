use serde::{Deserialize, Serialize};

/// An architecture anti-pattern found by the linter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub rule: LintRule,
    pub severity: IssueSeverity,
    /// Offending component, or `None` for architecture-wide findings
    pub component: Option<String>,
    pub message: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LintRule {
    NoEncryption,
    SingleAz,
    OversizedInstances,
    NoLoadBalancer,
    PublicDatabase,
    NoWaf,
    NoMonitoring,
    SinglePointOfFailure,
    NoBackup,
    NoAuth,
    CircularDependency,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
}

impl LintRule {
    pub const ALL: [LintRule; 11] = [
        LintRule::NoEncryption,
        LintRule::SingleAz,
        LintRule::OversizedInstances,
        LintRule::NoLoadBalancer,
        LintRule::PublicDatabase,
        LintRule::NoWaf,
        LintRule::NoMonitoring,
        LintRule::SinglePointOfFailure,
        LintRule::NoBackup,
        LintRule::NoAuth,
        LintRule::CircularDependency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LintRule::NoEncryption => "no_encryption",
            LintRule::SingleAz => "single_az",
            LintRule::OversizedInstances => "oversized_instances",
            LintRule::NoLoadBalancer => "no_load_balancer",
            LintRule::PublicDatabase => "public_database",
            LintRule::NoWaf => "no_waf",
            LintRule::NoMonitoring => "no_monitoring",
            LintRule::SinglePointOfFailure => "single_point_of_failure",
            LintRule::NoBackup => "no_backup",
            LintRule::NoAuth => "no_auth",
            LintRule::CircularDependency => "circular_dependency",
        }
    }
}

impl std::fmt::Display for LintRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LintRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LintRule::ALL
            .into_iter()
            .find(|rule| rule.name() == s)
            .ok_or_else(|| format!("Unknown lint rule: {}", s))
    }
}

impl Issue {
    fn component_issue(
        rule: LintRule,
        severity: IssueSeverity,
        component: &str,
        message: String,
        recommendation: &str,
    ) -> Self {
        Self {
            rule,
            severity,
            component: Some(component.to_string()),
            message,
            recommendation: recommendation.to_string(),
        }
    }

    fn global_issue(
        rule: LintRule,
        severity: IssueSeverity,
        message: String,
        recommendation: &str,
    ) -> Self {
        Self {
            rule,
            severity,
            component: None,
            message,
            recommendation: recommendation.to_string(),
        }
    }

    pub fn no_encryption(id: &str, label: &str, service: &str) -> Self {
        Self::component_issue(
            LintRule::NoEncryption,
            IssueSeverity::Error,
            id,
            format!("{} ({}) has no encryption configured", label, service),
            "Set encryption: true in the component config",
        )
    }

    pub fn single_az(id: &str, label: &str, service: &str) -> Self {
        Self::component_issue(
            LintRule::SingleAz,
            IssueSeverity::Error,
            id,
            format!("{} ({}) is not configured for multi-AZ", label, service),
            "Enable multi_az: true to prevent a single availability zone failure from causing downtime",
        )
    }

    pub fn oversized_instance(id: &str, label: &str, instance_type: &str) -> Self {
        Self::component_issue(
            LintRule::OversizedInstances,
            IssueSeverity::Warn,
            id,
            format!("{} uses oversized instance type '{}'", label, instance_type),
            "Validate that this instance size is justified by workload requirements; consider right-sizing",
        )
    }

    pub fn no_load_balancer(compute_count: usize) -> Self {
        Self::global_issue(
            LintRule::NoLoadBalancer,
            IssueSeverity::Error,
            format!(
                "Architecture has {} compute components but no load balancer",
                compute_count
            ),
            "Add a load balancer (ALB/NLB) to distribute traffic across compute instances",
        )
    }

    pub fn public_database(id: &str, label: &str, service: &str) -> Self {
        Self::component_issue(
            LintRule::PublicDatabase,
            IssueSeverity::Error,
            id,
            format!("{} ({}) is publicly accessible", label, service),
            "Set publicly_accessible: false and restrict access via VPC security groups",
        )
    }

    pub fn no_waf() -> Self {
        Self::global_issue(
            LintRule::NoWaf,
            IssueSeverity::Warn,
            "Load balancer or API gateway present but no WAF/Shield configured".to_string(),
            "Add a WAF to protect against common web exploits and DDoS attacks",
        )
    }

    pub fn no_monitoring(component_count: usize) -> Self {
        Self::global_issue(
            LintRule::NoMonitoring,
            IssueSeverity::Warn,
            format!(
                "Architecture has {} components but no monitoring or logging service",
                component_count
            ),
            "Add a monitoring service (CloudWatch, Datadog, etc.) to observe system health",
        )
    }

    pub fn single_point_of_failure(id: &str, label: &str) -> Self {
        Self::component_issue(
            LintRule::SinglePointOfFailure,
            IssueSeverity::Error,
            id,
            format!(
                "{} is the sole compute component with no auto-scaling configured",
                label
            ),
            "Enable auto_scaling or add a second compute component behind a load balancer",
        )
    }

    pub fn no_backup(id: &str, label: &str, service: &str) -> Self {
        Self::component_issue(
            LintRule::NoBackup,
            IssueSeverity::Warn,
            id,
            format!(
                "{} ({}) has no backup or point-in-time recovery configured",
                label, service
            ),
            "Enable backup: true or point_in_time_recovery: true to protect against data loss",
        )
    }

    pub fn no_auth() -> Self {
        Self::global_issue(
            LintRule::NoAuth,
            IssueSeverity::Warn,
            "API gateway or load balancer present but no authentication service configured"
                .to_string(),
            "Add an auth service (Cognito, Azure AD, IAM) to secure public-facing endpoints",
        )
    }

    pub fn circular_dependency(cycle: &[String]) -> Self {
        let mut path = cycle.to_vec();
        if let Some(first) = cycle.first() {
            path.push(first.clone());
        }
        Self {
            rule: LintRule::CircularDependency,
            severity: IssueSeverity::Info,
            component: cycle.first().cloned(),
            message: format!("Circular dependency: {}", path.join(" → ")),
            recommendation: "Cycles make blast radius hard to reason about; confirm the loop is intentional (e.g. async callbacks)".to_string(),
        }
    }
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warn => write!(f, "warn"),
            IssueSeverity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for IssueSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(IssueSeverity::Info),
            "warn" | "warning" => Ok(IssueSeverity::Warn),
            "error" => Ok(IssueSeverity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}
