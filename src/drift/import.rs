use super::cloudformation::CloudFormationImporter;
use super::terraform::TerraformStateImporter;
use crate::fs::FileSystem;
use crate::model::{ArchSpec, Provider, SpecError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unknown import format: {0:?}. Supported: terraform, cloudformation, spec")]
    UnknownFormat(String),
    #[error("Cannot detect import format for {}; pass --infra-format explicitly", .0.display())]
    Undetectable(PathBuf),
    #[error("Malformed infrastructure file: {0}")]
    Malformed(String),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Format of the as-deployed side of a drift check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InfraFormat {
    /// Detect from the file name and contents
    #[default]
    Auto,
    /// Terraform state (.tfstate)
    Terraform,
    /// CloudFormation template (JSON or YAML)
    #[value(name = "cloudformation", alias = "cfn")]
    CloudFormation,
    /// An exported architecture spec (YAML or JSON)
    Spec,
}

impl std::str::FromStr for InfraFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InfraFormat::Auto),
            "terraform" | "tfstate" => Ok(InfraFormat::Terraform),
            "cloudformation" | "cfn" => Ok(InfraFormat::CloudFormation),
            "spec" | "yaml" | "json" => Ok(InfraFormat::Spec),
            _ => Err(ImportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Converts a deployed-infrastructure description into an [`ArchSpec`].
pub trait Importer {
    /// Short format name (e.g. `terraform`)
    fn format_name(&self) -> &'static str;

    /// Whether this importer recognises the file. May read it.
    fn can_import(&self, path: &Path, fs: &dyn FileSystem) -> bool;

    fn import(&self, path: &Path, fs: &dyn FileSystem) -> Result<ArchSpec, ImportError>;

    /// Component ids are generated by the importer rather than read from
    /// the file, so they need [`align_ids`] before a drift comparison.
    fn generates_ids(&self) -> bool {
        true
    }
}

/// The deployed side is already an architecture spec file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecImporter;

impl Importer for SpecImporter {
    fn format_name(&self) -> &'static str {
        "spec"
    }

    fn can_import(&self, path: &Path, _fs: &dyn FileSystem) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml") | Some("json")
        )
    }

    fn import(&self, path: &Path, fs: &dyn FileSystem) -> Result<ArchSpec, ImportError> {
        Ok(ArchSpec::load(path, fs)?)
    }

    fn generates_ids(&self) -> bool {
        false
    }
}

/// Pick the importer for `format`. `Auto` tries Terraform state, then
/// CloudFormation templates, then spec files.
pub fn importer_for(
    format: InfraFormat,
    path: &Path,
    fs: &dyn FileSystem,
) -> Result<Box<dyn Importer>, ImportError> {
    let terraform = TerraformStateImporter::new();
    let cloudformation = CloudFormationImporter::new();
    match format {
        InfraFormat::Terraform => Ok(Box::new(terraform)),
        InfraFormat::CloudFormation => Ok(Box::new(cloudformation)),
        InfraFormat::Spec => Ok(Box::new(SpecImporter)),
        InfraFormat::Auto if terraform.can_import(path, fs) => Ok(Box::new(terraform)),
        InfraFormat::Auto if cloudformation.can_import(path, fs) => Ok(Box::new(cloudformation)),
        InfraFormat::Auto if SpecImporter.can_import(path, fs) => Ok(Box::new(SpecImporter)),
        InfraFormat::Auto => Err(ImportError::Undetectable(path.to_path_buf())),
    }
}

/// Import a deployed spec with the importer selected by `format`.
pub fn import_spec(
    fs: &dyn FileSystem,
    path: &Path,
    format: InfraFormat,
) -> Result<ArchSpec, ImportError> {
    importer_for(format, path, fs)?.import(path, fs)
}

/// Import the deployed side of a drift check against `design`.
///
/// Ids generated by an importer are aligned to the design; ids read from a
/// spec file are kept as written.
pub fn import_for_design(
    fs: &dyn FileSystem,
    path: &Path,
    format: InfraFormat,
    design: &ArchSpec,
) -> Result<ArchSpec, ImportError> {
    let importer = importer_for(format, path, fs)?;
    let imported = importer.import(path, fs)?;
    if importer.generates_ids() {
        Ok(align_ids(imported, design))
    } else {
        Ok(imported)
    }
}

/// Rename imported component ids to the design's ids, matching on
/// `(service, provider)` in order. An imported id that already names a
/// design component of the same service keeps it. Connections follow the
/// renames.
pub fn align_ids(imported: ArchSpec, design: &ArchSpec) -> ArchSpec {
    let mut design_by_service: HashMap<(&str, Provider), Vec<&str>> = HashMap::new();
    for c in &design.components {
        design_by_service
            .entry((c.service.as_str(), c.provider))
            .or_default()
            .push(c.id.as_str());
    }

    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut used: HashSet<&str> = HashSet::new();

    for c in &imported.components {
        if let Some(ids) = design_by_service.get(&(c.service.as_str(), c.provider))
            && let Some(&design_id) = ids.iter().find(|id| **id == c.id)
        {
            used.insert(design_id);
            id_map.insert(c.id.clone(), design_id.to_string());
        }
    }

    for c in &imported.components {
        if id_map.contains_key(&c.id) {
            continue;
        }
        let candidates = design_by_service
            .get(&(c.service.as_str(), c.provider))
            .into_iter()
            .flatten();
        for &design_id in candidates {
            if used.insert(design_id) {
                id_map.insert(c.id.clone(), design_id.to_string());
                break;
            }
        }
    }

    if id_map.iter().all(|(from, to)| from == to) {
        return imported;
    }

    let rename = |id: &mut String| {
        if let Some(new_id) = id_map.get(id.as_str()) {
            *id = new_id.clone();
        }
    };

    let mut aligned = imported;
    for c in &mut aligned.components {
        rename(&mut c.id);
    }
    for conn in &mut aligned.connections {
        rename(&mut conn.source);
        rename(&mut conn.target);
    }
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFs;
    use crate::model::{Component, Connection};

    fn comp(id: &str, service: &str) -> Component {
        Component::new(id, service, Provider::Aws, id).unwrap()
    }

    #[test]
    fn test_align_ids_by_service() {
        let design = ArchSpec::new("design")
            .with_component(comp("web_server", "ec2"))
            .with_component(comp("database", "rds"));
        let imported = ArchSpec::new("state")
            .with_component(comp("ec2", "ec2"))
            .with_component(comp("rds", "rds"))
            .with_component(comp("s3", "s3"))
            .with_connection(Connection::new("ec2", "rds"))
            .with_connection(Connection::new("ec2", "s3"));

        let aligned = align_ids(imported, &design);
        let ids: Vec<_> = aligned.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["web_server", "database", "s3"]);
        assert_eq!(aligned.connections[0].key(), ("web_server", "database"));
        assert_eq!(aligned.connections[1].key(), ("web_server", "s3"));
    }

    #[test]
    fn test_align_ids_each_design_id_used_once() {
        let design = ArchSpec::new("design").with_component(comp("app", "ec2"));
        let imported = ArchSpec::new("state")
            .with_component(comp("ec2", "ec2"))
            .with_component(comp("ec2_worker", "ec2"));
        let aligned = align_ids(imported, &design);
        let ids: Vec<_> = aligned.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["app", "ec2_worker"]);
    }

    #[test]
    fn test_align_ids_keeps_exact_matches() {
        let design = ArchSpec::new("design")
            .with_component(comp("web", "ec2"))
            .with_component(comp("worker", "ec2"));
        let imported = ArchSpec::new("deployed")
            .with_component(comp("worker", "ec2"))
            .with_component(comp("web", "ec2"))
            .with_connection(Connection::new("web", "worker"));
        let aligned = align_ids(imported.clone(), &design);
        assert_eq!(aligned, imported);

        let partial = ArchSpec::new("deployed")
            .with_component(comp("ec2", "ec2"))
            .with_component(comp("web", "ec2"));
        let aligned = align_ids(partial, &design);
        let ids: Vec<_> = aligned.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["worker", "web"]);
    }

    #[test]
    fn test_spec_files_are_not_realigned() {
        let design = ArchSpec::new("design")
            .with_component(comp("web", "ec2"))
            .with_component(comp("worker", "ec2"));
        let fs = MockFs::with_files([(
            Path::new("/deployed.yaml"),
            "name: Deployed\ncomponents:\n  - {id: api, service: ec2, provider: aws, label: Api}\n",
        )]);
        let deployed =
            import_for_design(&fs, Path::new("/deployed.yaml"), InfraFormat::Auto, &design).unwrap();
        assert_eq!(deployed.components[0].id, "api");
    }

    #[test]
    fn test_auto_detection() {
        let fs = MockFs::with_files([(
            Path::new("/deployed.yaml"),
            "name: Deployed\ncomponents:\n  - id: web\n    service: ec2\n    provider: aws\n    label: Web\n",
        )]);
        let spec = import_spec(&fs, Path::new("/deployed.yaml"), InfraFormat::Auto).unwrap();
        assert_eq!(spec.name, "Deployed");

        let err = import_spec(&fs, Path::new("/infra.hcl"), InfraFormat::Auto).unwrap_err();
        assert!(matches!(err, ImportError::Undetectable(_)));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("terraform".parse::<InfraFormat>().unwrap(), InfraFormat::Terraform);
        assert_eq!("cfn".parse::<InfraFormat>().unwrap(), InfraFormat::CloudFormation);
        assert!(matches!(
            "pulumi".parse::<InfraFormat>(),
            Err(ImportError::UnknownFormat(_))
        ));
    }
}
