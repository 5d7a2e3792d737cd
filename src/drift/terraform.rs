//! Terraform state (`.tfstate`, versions 3 and 4) importer.

use super::import::{ImportError, Importer};
use crate::fs::FileSystem;
use crate::model::{
    ArchSpec, Component, ConfigMap, Connection, DEFAULT_TIER, Provider, is_truthy, sanitize_id,
    suffixed_id,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Resource type to service key.
const RESOURCE_TYPES: &[(&str, &str)] = &[
    ("aws_instance", "ec2"),
    ("aws_db_instance", "rds"),
    ("aws_rds_cluster", "aurora"),
    ("aws_s3_bucket", "s3"),
    ("aws_lb", "alb"),
    ("aws_alb", "alb"),
    ("aws_cloudfront_distribution", "cloudfront"),
    ("aws_lambda_function", "lambda"),
    ("aws_elasticache_cluster", "elasticache"),
    ("aws_elasticache_replication_group", "elasticache"),
    ("aws_dynamodb_table", "dynamodb"),
    ("aws_sqs_queue", "sqs"),
    ("aws_sns_topic", "sns"),
    ("aws_wafv2_web_acl", "waf"),
    ("aws_route53_zone", "route53"),
    ("aws_api_gateway_rest_api", "api_gateway"),
    ("aws_apigatewayv2_api", "api_gateway"),
    ("aws_ecs_cluster", "ecs"),
    ("aws_eks_cluster", "eks"),
    ("aws_cognito_user_pool", "cognito"),
    ("aws_kinesis_stream", "kinesis"),
    ("aws_cloudtrail", "cloudtrail"),
    ("aws_cloudwatch_log_group", "cloudwatch"),
    ("aws_ebs_volume", "ebs"),
    ("google_compute_instance", "compute_engine"),
    ("google_sql_database_instance", "cloud_sql"),
    ("google_storage_bucket", "cloud_storage"),
    ("google_container_cluster", "gke"),
    ("google_cloudfunctions_function", "cloud_functions"),
    ("google_cloudfunctions2_function", "cloud_functions"),
    ("google_cloud_run_service", "cloud_run"),
    ("google_cloud_run_v2_service", "cloud_run"),
    ("google_pubsub_topic", "pub_sub"),
    ("google_redis_instance", "memorystore"),
    ("google_compute_backend_service", "cloud_load_balancing"),
    ("google_firestore_database", "firestore"),
    ("azurerm_linux_virtual_machine", "virtual_machines"),
    ("azurerm_windows_virtual_machine", "virtual_machines"),
    ("azurerm_mssql_server", "azure_sql"),
    ("azurerm_storage_account", "blob_storage"),
    ("azurerm_kubernetes_cluster", "aks"),
    ("azurerm_linux_function_app", "azure_functions"),
    ("azurerm_cosmosdb_account", "cosmos_db"),
    ("azurerm_redis_cache", "azure_cache"),
    ("azurerm_application_gateway", "app_gateway"),
    ("azurerm_lb", "azure_lb"),
    ("azurerm_servicebus_namespace", "service_bus"),
];

const PROVIDER_PREFIXES: &[(&str, Provider)] = &[
    ("aws_", Provider::Aws),
    ("google_", Provider::Gcp),
    ("azurerm_", Provider::Azure),
    ("azuread_", Provider::Azure),
];

/// Canonical tier per service: 0 edge, 1 gateway, 2 compute, 3 data, 4 storage.
pub(super) fn canonical_tier(service: &str) -> i32 {
    match service {
        "cloudfront" | "cloud_cdn" | "azure_cdn" => 0,
        "alb" | "nlb" | "cloud_load_balancing" | "app_gateway" | "azure_lb" | "waf"
        | "cloud_armor" | "azure_waf" | "api_gateway" | "cloud_api_gateway"
        | "api_management" | "route53" | "cloud_dns" | "azure_dns" | "cognito"
        | "firebase_auth" | "azure_ad" => 1,
        "rds" | "aurora" | "cloud_sql" | "azure_sql" | "dynamodb" | "firestore" | "cosmos_db"
        | "elasticache" | "memorystore" | "azure_cache" | "sqs" | "sns" | "pub_sub"
        | "service_bus" | "kinesis" | "dataflow" | "event_hubs" | "eventbridge" | "redshift" => 3,
        "s3" | "cloud_storage" | "blob_storage" | "ebs" | "persistent_disk" | "managed_disks" => 4,
        _ => DEFAULT_TIER,
    }
}

/// Config key and the state attributes it is read from; first match wins.
const CONFIG_EXTRACTORS: &[(&str, &[&str])] = &[
    (
        "instance_type",
        &["instance_type", "machine_type", "size", "vm_size", "node_type"],
    ),
    ("engine", &["engine", "database_version"]),
    (
        "storage_gb",
        &["allocated_storage", "disk_size_gb", "size_gb", "storage_size"],
    ),
    ("memory_mb", &["memory_size"]),
    (
        "count",
        &["desired_count", "node_count", "min_size", "num_nodes"],
    ),
    ("instance_class", &["instance_class"]),
];

const BOOL_ATTRS: &[(&str, &str)] = &[
    ("multi_az", "multi_az"),
    ("storage_encrypted", "encryption"),
    ("encryption_enabled", "encryption"),
];

#[derive(Debug, Deserialize)]
struct StateV4 {
    #[serde(default)]
    resources: Vec<ResourceV4>,
}

#[derive(Debug, Deserialize)]
struct ResourceV4 {
    #[serde(default)]
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    instances: Vec<InstanceV4>,
}

#[derive(Debug, Deserialize)]
struct InstanceV4 {
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct StateV3 {
    #[serde(default)]
    modules: Vec<ModuleV3>,
}

#[derive(Debug, Deserialize)]
struct ModuleV3 {
    #[serde(default)]
    resources: BTreeMap<String, ResourceV3>,
}

#[derive(Debug, Deserialize)]
struct ResourceV3 {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    mode: String,
    name: Option<String>,
    #[serde(default)]
    primary: PrimaryV3,
}

#[derive(Debug, Default, Deserialize)]
struct PrimaryV3 {
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// One managed resource instance, flattened across state versions.
#[derive(Debug)]
struct StateResource {
    resource_type: String,
    name: String,
    attributes: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct TerraformStateImporter {
    service_map: HashMap<&'static str, &'static str>,
}

impl TerraformStateImporter {
    pub fn new() -> Self {
        Self {
            service_map: RESOURCE_TYPES.iter().copied().collect(),
        }
    }

    /// Build a spec from state JSON. `name` becomes the spec name.
    pub fn import_str(&self, text: &str, name: &str) -> Result<ArchSpec, ImportError> {
        let data: Value = serde_json::from_str(text)?;
        if !data.is_object() {
            return Err(ImportError::Malformed(
                "state file is not a JSON object".to_string(),
            ));
        }
        let version = data.get("version").and_then(Value::as_u64).unwrap_or(4);
        let resources = if version <= 3 {
            parse_v3(data)?
        } else {
            parse_v4(data)?
        };
        Ok(self.build_spec(&resources, name))
    }

    fn build_spec(&self, resources: &[StateResource], name: &str) -> ArchSpec {
        let provider = detect_provider(resources);
        let mut spec = ArchSpec::new(name).with_provider(provider, default_region(provider));

        // First component per service, used to wire connections
        let mut first_by_service: HashMap<&str, String> = HashMap::new();
        let mut used_ids: HashSet<String> = HashSet::new();

        for res in resources {
            let Some(&service) = self.service_map.get(res.resource_type.as_str()) else {
                continue;
            };

            let id = make_id(service, &res.name, &first_by_service, &used_ids);
            used_ids.insert(id.clone());
            first_by_service.entry(service).or_insert_with(|| id.clone());

            spec.components.push(Component {
                id,
                service: service.to_string(),
                provider,
                label: title_case(&service.replace('_', " ")),
                description: String::new(),
                tier: canonical_tier(service),
                config: extract_config(&res.attributes),
            });
        }

        spec.connections = infer_connections(&first_by_service);
        spec
    }
}

impl Importer for TerraformStateImporter {
    fn format_name(&self) -> &'static str {
        "terraform"
    }

    fn can_import(&self, path: &Path, _fs: &dyn FileSystem) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        match path.extension().and_then(|e| e.to_str()) {
            Some("tfstate") => true,
            Some("json") => name.contains("tfstate"),
            _ => false,
        }
    }

    fn import(&self, path: &Path, fs: &dyn FileSystem) -> Result<ArchSpec, ImportError> {
        let text = fs.read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_str(&text, &derive_name(path))
    }
}

fn parse_v4(data: Value) -> Result<Vec<StateResource>, ImportError> {
    let state: StateV4 = serde_json::from_value(data)?;
    let mut resources = Vec::new();
    for res in state.resources {
        if res.mode == "data" {
            continue;
        }
        for instance in res.instances {
            resources.push(StateResource {
                resource_type: res.resource_type.clone(),
                name: res.name.clone(),
                attributes: instance.attributes,
            });
        }
    }
    Ok(resources)
}

fn parse_v3(data: Value) -> Result<Vec<StateResource>, ImportError> {
    let state: StateV3 = serde_json::from_value(data)?;
    let mut resources = Vec::new();
    for module in state.modules {
        for (address, res) in module.resources {
            if res.mode == "data" {
                continue;
            }
            let name = res.name.unwrap_or_else(|| {
                address.rsplit('.').next().unwrap_or(&address).to_string()
            });
            resources.push(StateResource {
                resource_type: res.resource_type,
                name,
                attributes: res.primary.attributes,
            });
        }
    }
    Ok(resources)
}

/// Most frequent provider prefix; ties go to the earlier provider, none to AWS.
fn detect_provider(resources: &[StateResource]) -> Provider {
    let mut counts = [(Provider::Aws, 0usize), (Provider::Gcp, 0), (Provider::Azure, 0)];
    for res in resources {
        if let Some((_, provider)) = PROVIDER_PREFIXES
            .iter()
            .find(|(prefix, _)| res.resource_type.starts_with(prefix))
            && let Some(entry) = counts.iter_mut().find(|(p, _)| p == provider)
        {
            entry.1 += 1;
        }
    }

    let mut best = counts[0];
    for entry in &counts[1..] {
        if entry.1 > best.1 {
            best = *entry;
        }
    }
    best.0
}

fn default_region(provider: Provider) -> &'static str {
    match provider {
        Provider::Aws => "us-east-1",
        Provider::Gcp => "us-central1",
        Provider::Azure => "eastus",
    }
}

fn extract_config(attrs: &Map<String, Value>) -> ConfigMap {
    let mut config = ConfigMap::new();

    for (key, candidates) in CONFIG_EXTRACTORS {
        let found = candidates
            .iter()
            .filter_map(|attr| attrs.get(*attr))
            .find(|value| is_present(value));
        let Some(value) = found else {
            continue;
        };

        let value = match *key {
            "storage_gb" | "count" => as_integer(value).map(Value::from).unwrap_or_else(|| value.clone()),
            // GCP reports machine types as zones/ZONE/machineTypes/TYPE
            "instance_type" => match value.as_str() {
                Some(s) if s.contains('/') => {
                    Value::from(s.rsplit('/').next().unwrap_or(s))
                }
                _ => value.clone(),
            },
            _ => value.clone(),
        };
        config.insert(key.to_string(), value);
    }

    for (attr, key) in BOOL_ATTRS {
        if attrs.get(*attr).is_some_and(is_truthy) {
            config.insert(key.to_string(), Value::Bool(true));
        }
    }

    config
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Service key for the first resource of a service, `service_name` after
/// that, with a numeric suffix if that is taken too.
fn make_id(
    service: &str,
    resource_name: &str,
    first_by_service: &HashMap<&str, String>,
    used: &HashSet<String>,
) -> String {
    let base = sanitize_id(service);
    if !first_by_service.contains_key(service) && !used.contains(&base) {
        return base;
    }

    let candidate = sanitize_id(&format!("{}_{}", service, resource_name));
    if !used.contains(&candidate) {
        return candidate;
    }

    let mut n = 2;
    loop {
        let id = suffixed_id(&candidate, n);
        if !used.contains(&id) {
            return id;
        }
        n += 1;
    }
}

pub(super) fn derive_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("imported");
    title_case(&stem.replace(['_', '-'], " "))
}

pub(super) fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wire recognised service pairs (CDN -> LB -> compute -> data).
pub(super) fn infer_connections(first_by_service: &HashMap<&str, String>) -> Vec<Connection> {
    let pick = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|k| first_by_service.get(k).cloned())
    };

    let lb = pick(&["alb", "nlb", "cloud_load_balancing", "app_gateway", "azure_lb"]);
    let cdn = pick(&["cloudfront", "cloud_cdn", "azure_cdn"]);
    let compute = pick(&[
        "ec2",
        "ecs",
        "eks",
        "fargate",
        "compute_engine",
        "virtual_machines",
        "cloud_run",
        "gke",
        "aks",
    ]);
    let function = pick(&["lambda", "cloud_functions", "azure_functions"]);
    let api = pick(&["api_gateway", "cloud_api_gateway", "api_management"]);
    let db = pick(&[
        "rds",
        "aurora",
        "cloud_sql",
        "azure_sql",
        "dynamodb",
        "firestore",
        "cosmos_db",
    ]);
    let cache = pick(&["elasticache", "memorystore", "azure_cache"]);
    let storage = pick(&["s3", "cloud_storage", "blob_storage"]);
    let queue = pick(&["sqs", "pub_sub", "service_bus"]);
    let app = compute.clone().or_else(|| function.clone());

    let mut conns = Vec::new();

    match (&cdn, &lb, &compute) {
        (Some(cdn), Some(lb), _) => conns.push(
            Connection::new(cdn, lb)
                .with_label("HTTPS")
                .with_protocol("HTTPS", Some(443)),
        ),
        (Some(cdn), None, Some(compute)) => conns.push(
            Connection::new(cdn, compute)
                .with_label("HTTPS")
                .with_protocol("HTTPS", Some(443)),
        ),
        _ => {}
    }

    if let (Some(lb), Some(compute)) = (&lb, &compute) {
        conns.push(
            Connection::new(lb, compute)
                .with_label("HTTP")
                .with_protocol("HTTP", Some(80)),
        );
    }

    match (&api, &function, &compute) {
        (Some(api), Some(function), _) => {
            conns.push(Connection::new(api, function).with_label("invoke"))
        }
        (Some(api), None, Some(compute)) => conns.push(
            Connection::new(api, compute)
                .with_label("HTTP")
                .with_protocol("HTTP", Some(80)),
        ),
        _ => {}
    }

    if let Some(app) = &app {
        if let Some(db) = &db {
            conns.push(
                Connection::new(app, db)
                    .with_label("SQL")
                    .with_protocol("TCP", None),
            );
        }
        if let Some(cache) = &cache {
            conns.push(
                Connection::new(app, cache)
                    .with_label("cache")
                    .with_protocol("TCP", None),
            );
        }
        if let Some(storage) = &storage {
            conns.push(Connection::new(app, storage).with_label("read/write"));
        }
        if let Some(queue) = &queue {
            conns.push(Connection::new(app, queue).with_label("enqueue"));
        }
    }

    conns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFs;

    const STATE_V4: &str = r#"{
  "version": 4,
  "terraform_version": "1.6.0",
  "resources": [
    {
      "mode": "managed",
      "type": "aws_lb",
      "name": "front",
      "instances": [{"attributes": {"id": "lb-1", "name": "front"}}]
    },
    {
      "mode": "managed",
      "type": "aws_instance",
      "name": "web",
      "instances": [
        {"attributes": {"id": "i-1", "instance_type": "t3.medium"}},
        {"attributes": {"id": "i-2", "instance_type": "t3.large"}}
      ]
    },
    {
      "mode": "managed",
      "type": "aws_db_instance",
      "name": "main",
      "instances": [{"attributes": {
        "id": "db-1",
        "engine": "postgres",
        "allocated_storage": 100,
        "instance_class": "db.r5.large",
        "multi_az": true,
        "storage_encrypted": true
      }}]
    },
    {
      "mode": "data",
      "type": "aws_ami",
      "name": "ubuntu",
      "instances": [{"attributes": {"id": "ami-1"}}]
    },
    {
      "mode": "managed",
      "type": "aws_iam_role",
      "name": "ignored",
      "instances": [{"attributes": {"id": "role"}}]
    }
  ]
}"#;

    #[test]
    fn test_import_v4_components() {
        let spec = TerraformStateImporter::new()
            .import_str(STATE_V4, "Prod")
            .unwrap();
        let ids: Vec<_> = spec.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["alb", "ec2", "ec2_web", "rds"]);
        assert_eq!(spec.provider, Provider::Aws);

        let db = spec.component("rds").unwrap();
        assert_eq!(db.tier, 3);
        assert_eq!(db.label, "Rds");
        assert_eq!(db.config["engine"], "postgres");
        assert_eq!(db.config["storage_gb"], 100);
        assert_eq!(db.config["multi_az"], true);
        assert_eq!(db.config["encryption"], true);

        assert_eq!(spec.component("ec2").unwrap().config["instance_type"], "t3.medium");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_import_v4_infers_connections() {
        let spec = TerraformStateImporter::new()
            .import_str(STATE_V4, "Prod")
            .unwrap();
        let edges: Vec<_> = spec
            .connections
            .iter()
            .map(|c| (c.source.as_str(), c.target.as_str(), c.label.as_str()))
            .collect();
        assert_eq!(edges, vec![("alb", "ec2", "HTTP"), ("ec2", "rds", "SQL")]);
        assert_eq!(spec.connections[0].port, Some(80));
    }

    #[test]
    fn test_import_v3_string_attributes() {
        let state = r#"{
  "version": 3,
  "modules": [{
    "path": ["root"],
    "resources": {
      "google_compute_instance.app": {
        "type": "google_compute_instance",
        "primary": {"id": "app", "attributes": {
          "machine_type": "zones/us-central1-a/machineTypes/e2-medium"
        }}
      },
      "google_sql_database_instance.db": {
        "type": "google_sql_database_instance",
        "primary": {"id": "db", "attributes": {"database_version": "POSTGRES_15", "disk_size_gb": "50"}}
      }
    }
  }]
}"#;
        let spec = TerraformStateImporter::new().import_str(state, "Legacy").unwrap();
        assert_eq!(spec.provider, Provider::Gcp);
        assert_eq!(spec.region, "us-central1");

        let vm = spec.component("compute_engine").unwrap();
        assert_eq!(vm.config["instance_type"], "e2-medium");
        let db = spec.component("cloud_sql").unwrap();
        assert_eq!(db.config["storage_gb"], 50);
        assert_eq!(spec.connections.len(), 1);
    }

    #[test]
    fn test_zero_and_empty_attributes_skipped() {
        let attrs: Map<String, Value> = serde_json::from_str(
            r#"{"instance_type": "", "machine_type": "n1", "desired_count": 0, "node_count": 3}"#,
        )
        .unwrap();
        let config = extract_config(&attrs);
        assert_eq!(config["instance_type"], "n1");
        assert_eq!(config["count"], 3);
    }

    #[test]
    fn test_can_import_and_name() {
        let importer = TerraformStateImporter::new();
        let fs = MockFs::with_files([(Path::new("/state/prod-us_east.tfstate"), STATE_V4)]);
        assert!(importer.can_import(Path::new("prod.tfstate"), &fs));
        assert!(importer.can_import(Path::new("prod.tfstate.json"), &fs));
        assert!(!importer.can_import(Path::new("design.json"), &fs));

        let spec = importer
            .import(Path::new("/state/prod-us_east.tfstate"), &fs)
            .unwrap();
        assert_eq!(spec.name, "Prod Us East");
    }

    #[test]
    fn test_long_resource_name_ids_stay_unique() {
        let name = "a".repeat(70);
        let state = format!(
            r#"{{"version": 4, "resources": [{{"mode": "managed", "type": "aws_instance",
                "name": "{}", "instances": [{{"attributes": {{}}}}, {{"attributes": {{}}}},
                {{"attributes": {{}}}}, {{"attributes": {{}}}}]}}]}}"#,
            name
        );
        let spec = TerraformStateImporter::new().import_str(&state, "Fleet").unwrap();
        let ids: Vec<_> = spec.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], "ec2");
        assert_eq!(ids[1].len(), 64);
        assert!(ids[2].ends_with("_2") && ids[2].len() == 64);
        assert!(ids[3].ends_with("_3"));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_malformed_state() {
        let importer = TerraformStateImporter::new();
        assert!(matches!(
            importer.import_str("[1, 2]", "x"),
            Err(ImportError::Malformed(_))
        ));
        assert!(matches!(
            importer.import_str("not json", "x"),
            Err(ImportError::Json(_))
        ));
    }
}
