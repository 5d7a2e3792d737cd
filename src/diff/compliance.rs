use super::differ::{ComponentChange, ComponentField};
use crate::model::{Component, ConfigMap, is_truthy};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const BUILTIN_SECURITY_SERVICES: &[&str] = &[
    "waf",
    "cloud_armor",
    "azure_waf",
    "cognito",
    "firebase_auth",
    "azure_ad",
    "iam",
    "cloudtrail",
    "cloud_logging",
    "azure_monitor",
];

/// Service keys whose removal or reconfiguration affects compliance posture.
#[derive(Debug, Clone)]
pub struct SecurityServices {
    services: HashSet<String>,
}

impl Default for SecurityServices {
    fn default() -> Self {
        Self {
            services: BUILTIN_SECURITY_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SecurityServices {
    /// Built-in list plus additional service keys.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        set.services.extend(extra.into_iter().map(Into::into));
        set
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains(service)
    }
}

pub(super) fn assess_compliance_impact(
    removed: &[Component],
    changed: &[ComponentChange],
    old_map: &HashMap<&str, &Component>,
    new_map: &HashMap<&str, &Component>,
    security: &SecurityServices,
) -> Vec<String> {
    let mut impacts = Vec::new();

    for comp in removed {
        if security.contains(&comp.service) {
            impacts.push(format!(
                "Removed {} ({}) - may affect compliance posture",
                comp.service, comp.id
            ));
        }
    }

    for change in changed {
        let cid = change.component_id.as_str();
        match change.field {
            ComponentField::Service => {
                if security.contains(&change.old_value) && !security.contains(&change.new_value)
                {
                    impacts.push(format!(
                        "{}: replaced security service {} with {}",
                        cid, change.old_value, change.new_value
                    ));
                }
            }
            ComponentField::Config => {
                let old = old_map.get(cid);
                let new = new_map.get(cid);
                let touches_security = [old, new]
                    .into_iter()
                    .flatten()
                    .any(|c| security.contains(&c.service));
                if touches_security {
                    impacts.push(format!("{}: security component config changed", cid));
                }
                if let (Some(old), Some(new)) = (old, new)
                    && encryption_disabled(&old.config, &new.config)
                {
                    impacts.push(format!("{}: encryption may have been disabled", cid));
                }
            }
            ComponentField::Provider | ComponentField::Label => {}
        }
    }

    impacts
}

/// True when some `*encrypt*` key was truthy before and is explicitly false now.
fn encryption_disabled(old: &ConfigMap, new: &ConfigMap) -> bool {
    old.iter()
        .filter(|(key, value)| key.to_lowercase().contains("encrypt") && is_truthy(value))
        .any(|(key, _)| new.get(key).is_some_and(is_explicit_false))
}

fn is_explicit_false(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::String(s) => s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compute_diff_with;
    use crate::model::{ArchSpec, Provider};

    fn comp(id: &str, service: &str) -> Component {
        Component::new(id, service, Provider::Aws, id).unwrap()
    }

    #[test]
    fn test_removed_security_service_flagged() {
        let old = ArchSpec::new("a")
            .with_component(comp("web", "ec2"))
            .with_component(comp("firewall", "waf"));
        let new = ArchSpec::new("a").with_component(comp("web", "ec2"));
        let diff = compute_diff_with(&old, &new, &SecurityServices::default());
        assert_eq!(diff.compliance_impact.len(), 1);
        assert!(diff.compliance_impact[0].contains("waf (firewall)"));
    }

    #[test]
    fn test_security_service_replaced() {
        let old = ArchSpec::new("a").with_component(comp("auth", "cognito"));
        let new = ArchSpec::new("a").with_component(comp("auth", "lambda"));
        let diff = compute_diff_with(&old, &new, &SecurityServices::default());
        assert_eq!(
            diff.compliance_impact,
            vec!["auth: replaced security service cognito with lambda"]
        );
    }

    #[test]
    fn test_security_config_change_flagged() {
        let old = ArchSpec::new("a").with_component(comp("trail", "cloudtrail"));
        let new = ArchSpec::new("a")
            .with_component(comp("trail", "cloudtrail").with_config("retention_days", 30));
        let diff = compute_diff_with(&old, &new, &SecurityServices::default());
        assert_eq!(
            diff.compliance_impact,
            vec!["trail: security component config changed"]
        );
    }

    #[test]
    fn test_encryption_disabled_flagged() {
        let old = ArchSpec::new("a")
            .with_component(comp("db", "rds").with_config("encryption", true));
        let new = ArchSpec::new("a")
            .with_component(comp("db", "rds").with_config("encryption", false));
        let diff = compute_diff_with(&old, &new, &SecurityServices::default());
        assert_eq!(
            diff.compliance_impact,
            vec!["db: encryption may have been disabled"]
        );
    }

    #[test]
    fn test_unrelated_false_does_not_flag_encryption() {
        let old = ArchSpec::new("a").with_component(
            comp("db", "rds")
                .with_config("encryption", true)
                .with_config("multi_az", true),
        );
        let new = ArchSpec::new("a").with_component(
            comp("db", "rds")
                .with_config("encryption", true)
                .with_config("multi_az", false),
        );
        let diff = compute_diff_with(&old, &new, &SecurityServices::default());
        assert!(diff.compliance_impact.is_empty());
    }

    #[test]
    fn test_extra_security_services() {
        let old = ArchSpec::new("a").with_component(comp("vault", "secrets_manager"));
        let new = ArchSpec::new("a");
        let default = compute_diff_with(&old, &new, &SecurityServices::default());
        assert!(default.compliance_impact.is_empty());

        let extended = SecurityServices::with_extra(["secrets_manager"]);
        let diff = compute_diff_with(&old, &new, &extended);
        assert_eq!(diff.compliance_impact.len(), 1);
    }
}
