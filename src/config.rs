use crate::diff::SecurityServices;
use crate::fs::{FileSystem, default_fs};
use crate::layout::LayoutOptions;
use crate::model::LintRule;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".cloudwright.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutOptions,
    pub diff: DiffConfig,
    pub lint: LintConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DiffConfig {
    /// Extra service keys treated as security services, on top of the built-ins
    pub security_services: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LintConfig {
    pub disabled: HashSet<LintRule>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    layout: Option<RawLayout>,
    diff: Option<RawDiff>,
    lint: Option<RawLint>,
}

#[derive(Debug, Deserialize)]
struct RawLayout {
    node_width: Option<f64>,
    node_height: Option<f64>,
    h_gap: Option<f64>,
    v_gap: Option<f64>,
    boundary_padding: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawDiff {
    security_services: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawLint {
    disabled: Option<Vec<String>>,
}

impl DiffConfig {
    pub fn security_services(&self) -> SecurityServices {
        SecurityServices::with_extra(self.security_services.iter().cloned())
    }
}

impl LintConfig {
    pub fn is_enabled(&self, rule: LintRule) -> bool {
        !self.disabled.contains(&rule)
    }
}

impl Config {
    /// Load `.cloudwright.toml` from `dir`, or defaults when there is none.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Self::load_with_fs(dir, default_fs())
    }

    pub fn load_with_fs(dir: &Path, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if !fs.exists(&config_path) {
            return Ok(Self::default());
        }

        let content = fs.read_to_string(&config_path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let layout = match raw.layout {
            Some(l) => {
                let defaults = LayoutOptions::default();
                LayoutOptions {
                    node_width: l.node_width.unwrap_or(defaults.node_width),
                    node_height: l.node_height.unwrap_or(defaults.node_height),
                    h_gap: l.h_gap.unwrap_or(defaults.h_gap),
                    v_gap: l.v_gap.unwrap_or(defaults.v_gap),
                    boundary_padding: l.boundary_padding.unwrap_or(defaults.boundary_padding),
                }
            }
            None => LayoutOptions::default(),
        };

        let diff = DiffConfig {
            security_services: raw
                .diff
                .and_then(|d| d.security_services)
                .unwrap_or_default(),
        };

        let disabled = raw
            .lint
            .and_then(|l| l.disabled)
            .unwrap_or_default()
            .iter()
            .map(|name| name.parse::<LintRule>().map_err(ConfigError::Invalid))
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            layout,
            diff,
            lint: LintConfig { disabled },
        })
    }
}

/// Commented template written by `cloudwright init`.
pub fn generate_config_template() -> String {
    let defaults = LayoutOptions::default();
    let rules: Vec<&str> = LintRule::ALL.iter().map(|r| r.name()).collect();

    format!(
        r#"# cloudwright configuration

[layout]
node_width = {}
node_height = {}
h_gap = {}
v_gap = {}
boundary_padding = {}

[diff]
# Service keys treated as security services in addition to the built-ins
# (waf, cloud_armor, azure_waf, cognito, firebase_auth, azure_ad, iam,
# cloudtrail, cloud_logging, azure_monitor)
security_services = []

[lint]
# Rules to skip. Available: {}
disabled = []
"#,
        defaults.node_width,
        defaults.node_height,
        defaults.h_gap,
        defaults.v_gap,
        defaults.boundary_padding,
        rules.join(", ")
    )
}
