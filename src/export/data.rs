use super::{ExportError, Renderer};
use crate::model::ArchSpec;

/// The spec itself as pretty JSON.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, spec: &ArchSpec) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(spec)?)
    }
}

/// The spec itself as YAML.
pub struct YamlRenderer;

impl Renderer for YamlRenderer {
    fn render(&self, spec: &ArchSpec) -> Result<String, ExportError> {
        Ok(serde_yaml::to_string(spec)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Connection, Provider};

    #[test]
    fn test_data_exports_reload() {
        let spec = ArchSpec::new("Data")
            .with_component(Component::new("a", "ec2", Provider::Aws, "A").unwrap())
            .with_component(Component::new("b", "rds", Provider::Aws, "B").unwrap())
            .with_connection(Connection::new("a", "b"));

        let json = JsonRenderer.render(&spec).unwrap();
        assert_eq!(ArchSpec::from_json(&json).unwrap(), spec);

        let yaml = YamlRenderer.render(&spec).unwrap();
        assert_eq!(ArchSpec::from_yaml(&yaml).unwrap(), spec);
    }
}
