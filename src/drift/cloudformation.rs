//! CloudFormation template importer (JSON or YAML, short-form tags included).

use super::import::{ImportError, Importer};
use super::terraform::{canonical_tier, derive_name, infer_connections};
use crate::fs::FileSystem;
use crate::model::{ArchSpec, Component, ConfigMap, Connection, Provider, sanitize_id, suffixed_id};
use serde_json::Value as JsonValue;
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Resource type to service key.
const RESOURCE_TYPES: &[(&str, &str)] = &[
    ("AWS::EC2::Instance", "ec2"),
    ("AWS::EC2::LaunchTemplate", "ec2"),
    ("AWS::AutoScaling::AutoScalingGroup", "ec2"),
    ("AWS::ECS::Cluster", "ecs"),
    ("AWS::ECS::Service", "ecs"),
    ("AWS::ECS::TaskDefinition", "ecs"),
    ("AWS::EKS::Cluster", "eks"),
    ("AWS::EKS::Nodegroup", "eks"),
    ("AWS::Lambda::Function", "lambda"),
    ("AWS::RDS::DBInstance", "rds"),
    ("AWS::RDS::DBCluster", "aurora"),
    ("AWS::DynamoDB::Table", "dynamodb"),
    ("AWS::S3::Bucket", "s3"),
    ("AWS::EBS::Volume", "ebs"),
    ("AWS::ElasticLoadBalancingV2::LoadBalancer", "alb"),
    ("AWS::ElasticLoadBalancing::LoadBalancer", "alb"),
    ("AWS::CloudFront::Distribution", "cloudfront"),
    ("AWS::CloudFront::CloudFrontOriginAccessIdentity", "cloudfront"),
    ("AWS::Route53::HostedZone", "route53"),
    ("AWS::Route53::RecordSet", "route53"),
    ("AWS::ApiGatewayV2::Api", "api_gateway"),
    ("AWS::ApiGateway::RestApi", "api_gateway"),
    ("AWS::WAFv2::WebACL", "waf"),
    ("AWS::WAF::WebACL", "waf"),
    ("AWS::Cognito::UserPool", "cognito"),
    ("AWS::Cognito::IdentityPool", "cognito"),
    ("AWS::ElastiCache::CacheCluster", "elasticache"),
    ("AWS::ElastiCache::ReplicationGroup", "elasticache"),
    ("AWS::SQS::Queue", "sqs"),
    ("AWS::SNS::Topic", "sns"),
    ("AWS::Events::EventBus", "eventbridge"),
    ("AWS::Events::Rule", "eventbridge"),
    ("AWS::Redshift::Cluster", "redshift"),
    ("AWS::SageMaker::Endpoint", "sagemaker"),
    ("AWS::SageMaker::Model", "sagemaker"),
];

/// Longest template `Description` used as the spec name.
const MAX_NAME_LEN: usize = 60;

#[derive(Debug, Default)]
pub struct CloudFormationImporter {
    service_map: HashMap<&'static str, &'static str>,
}

impl CloudFormationImporter {
    pub fn new() -> Self {
        Self {
            service_map: RESOURCE_TYPES.iter().copied().collect(),
        }
    }

    /// Build a spec from template text. `fallback_name` is used when the
    /// template has no short `Description`.
    pub fn import_str(&self, text: &str, fallback_name: &str) -> Result<ArchSpec, ImportError> {
        let template: Value = serde_yaml::from_str(text)?;
        let Some(resources) = template.get("Resources").and_then(Value::as_mapping) else {
            return Err(ImportError::Malformed(
                "template has no Resources section".to_string(),
            ));
        };

        let name = match template.get("Description").and_then(Value::as_str) {
            Some(desc) if !desc.is_empty() && desc.chars().count() <= MAX_NAME_LEN => desc,
            _ => fallback_name,
        };

        let mut spec = ArchSpec::new(name).with_provider(Provider::Aws, "us-east-1");
        let mut first_by_service: HashMap<&str, String> = HashMap::new();
        let mut used_ids: HashSet<String> = HashSet::new();
        // Logical id to (component id, service), for reference wiring
        let mut by_logical: HashMap<&str, (String, &str)> = HashMap::new();

        for (key, resource) in resources {
            let Some(logical_id) = key.as_str() else {
                continue;
            };
            let Some(&service) = resource
                .get("Type")
                .and_then(Value::as_str)
                .and_then(|t| self.service_map.get(t))
            else {
                continue;
            };

            let id = make_id(service, logical_id, &first_by_service, &used_ids);
            used_ids.insert(id.clone());
            first_by_service.entry(service).or_insert_with(|| id.clone());
            by_logical.insert(logical_id, (id.clone(), service));

            spec.components.push(Component {
                id,
                service: service.to_string(),
                provider: Provider::Aws,
                label: logical_id.replace(['_', '-'], " "),
                description: String::new(),
                tier: canonical_tier(service),
                config: extract_config(resource.get("Properties")),
            });
        }

        let mut connections = reference_connections(resources, &by_logical);
        let mut seen: HashSet<(String, String)> = connections
            .iter()
            .map(|c| (c.source.clone(), c.target.clone()))
            .collect();
        for conn in infer_connections(&first_by_service) {
            if seen.insert((conn.source.clone(), conn.target.clone())) {
                connections.push(conn);
            }
        }
        spec.connections = connections;

        Ok(spec)
    }
}

impl Importer for CloudFormationImporter {
    fn format_name(&self) -> &'static str {
        "cloudformation"
    }

    /// Sniffs the contents: a template has both `Resources` and
    /// `AWSTemplateFormatVersion` at the top level.
    fn can_import(&self, path: &Path, fs: &dyn FileSystem) -> bool {
        if !matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json" | "yaml" | "yml" | "template")
        ) {
            return false;
        }
        let Ok(text) = fs.read_to_string(path) else {
            return false;
        };
        serde_yaml::from_str::<Value>(&text).is_ok_and(|template| {
            template.get("Resources").is_some()
                && template.get("AWSTemplateFormatVersion").is_some()
        })
    }

    fn import(&self, path: &Path, fs: &dyn FileSystem) -> Result<ArchSpec, ImportError> {
        let text = fs.read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_str(&text, &derive_name(path))
    }
}

/// Service key for the first resource of a service, then the logical id,
/// then `service_logical`, then numbered.
fn make_id(
    service: &str,
    logical_id: &str,
    first_by_service: &HashMap<&str, String>,
    used: &HashSet<String>,
) -> String {
    let base = sanitize_id(service);
    if !first_by_service.contains_key(service) && !used.contains(&base) {
        return base;
    }

    let candidates = [
        sanitize_id(logical_id),
        sanitize_id(&format!("{}_{}", service, logical_id)),
    ];
    if let Some(id) = candidates.iter().find(|id| !used.contains(*id)) {
        return id.clone();
    }

    let mut n = 2;
    loop {
        let id = suffixed_id(&candidates[1], n);
        if !used.contains(&id) {
            return id;
        }
        n += 1;
    }
}

fn extract_config(props: Option<&Value>) -> ConfigMap {
    let mut config = ConfigMap::new();
    let Some(props) = props.filter(|p| p.is_mapping()) else {
        return config;
    };

    if let Some(value) = ["InstanceType", "MachineType"]
        .iter()
        .find_map(|key| props.get(*key))
    {
        config.insert("instance_type".to_string(), resolve(value));
    }
    for (prop, key) in [("DBInstanceClass", "instance_class"), ("Engine", "engine")] {
        if let Some(value) = props.get(prop) {
            config.insert(key.to_string(), resolve(value));
        }
    }
    for (prop, key) in [
        ("AllocatedStorage", "storage_gb"),
        ("MemorySize", "memory_mb"),
        ("DesiredCount", "count"),
    ] {
        if let Some(n) = props.get(prop).and_then(|v| as_integer(&resolve(v))) {
            config.insert(key.to_string(), JsonValue::from(n));
        }
    }

    if props.get("MultiAZ").is_some_and(is_true) {
        config.insert("multi_az".to_string(), JsonValue::Bool(true));
    }
    let bucket_encrypted = props.get("BucketEncryption").is_some_and(|v| match v {
        Value::Null => false,
        Value::Mapping(m) => !m.is_empty(),
        _ => true,
    });
    if props.get("StorageEncrypted").is_some_and(is_true) || bucket_encrypted {
        config.insert("encryption".to_string(), JsonValue::Bool(true));
    }

    config
}

fn is_true(value: &Value) -> bool {
    match resolve(value) {
        JsonValue::Bool(b) => b,
        JsonValue::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn as_integer(value: &JsonValue) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Plain value for a property. Intrinsic functions (`{Ref: X}`, `!Ref X`)
/// collapse to their argument.
fn resolve(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => JsonValue::from(i),
            None => n.as_f64().map(JsonValue::from).unwrap_or(JsonValue::Null),
        },
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Sequence(items) => JsonValue::Array(items.iter().map(resolve).collect()),
        Value::Mapping(m) => m
            .values()
            .next()
            .map(resolve)
            .unwrap_or_else(|| JsonValue::String(String::new())),
        Value::Tagged(tagged) => resolve(&tagged.value),
    }
}

/// Connections from `Ref`, `Fn::GetAtt`, `Fn::Sub` and `DependsOn`, in
/// template order, labelled by the target's service.
fn reference_connections(
    resources: &serde_yaml::Mapping,
    by_logical: &HashMap<&str, (String, &str)>,
) -> Vec<Connection> {
    let mut connections = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for (key, resource) in resources {
        let Some(logical_id) = key.as_str() else {
            continue;
        };
        let Some((source, _)) = by_logical.get(logical_id) else {
            continue;
        };

        let mut targets = Vec::new();
        if let Some(props) = resource.get("Properties") {
            collect_refs(props, &mut targets);
        }
        match resource.get("DependsOn") {
            Some(Value::String(dep)) => targets.push(dep.clone()),
            Some(Value::Sequence(deps)) => {
                targets.extend(deps.iter().filter_map(Value::as_str).map(str::to_string))
            }
            _ => {}
        }

        for target in &targets {
            if target == logical_id {
                continue;
            }
            let Some((target_id, target_service)) = by_logical.get(target.as_str()) else {
                continue;
            };
            if target_id == source || !seen.insert((source.as_str(), target_id.as_str())) {
                continue;
            }
            connections
                .push(Connection::new(source, target_id).with_label(reference_label(target_service)));
        }
    }

    connections
}

fn reference_label(target_service: &str) -> &'static str {
    match target_service {
        "rds" | "aurora" => "SQL",
        "dynamodb" | "s3" => "read/write",
        "lambda" => "invoke",
        "sqs" | "sns" => "enqueue",
        "elasticache" => "cache",
        "alb" => "HTTPS",
        _ => "depends",
    }
}

/// Logical ids referenced anywhere under `value`, first-seen order.
fn collect_refs(value: &Value, found: &mut Vec<String>) {
    let mut push = |name: &str| {
        if !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
    };

    match value {
        Value::Mapping(map) => {
            for (key, arg) in map {
                match key.as_str() {
                    Some("Ref") => arg.as_str().into_iter().for_each(&mut push),
                    Some("Fn::GetAtt") => getatt_target(arg).into_iter().for_each(&mut push),
                    Some("Fn::Sub") => sub_refs(arg).into_iter().for_each(&mut push),
                    _ => {}
                }
            }
            for arg in map.values() {
                collect_refs(arg, found);
            }
        }
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            match tag.trim_start_matches('!') {
                "Ref" => tagged.value.as_str().into_iter().for_each(&mut push),
                "GetAtt" => getatt_target(&tagged.value).into_iter().for_each(&mut push),
                "Sub" => sub_refs(&tagged.value).into_iter().for_each(&mut push),
                _ => {}
            }
            collect_refs(&tagged.value, found);
        }
        Value::Sequence(items) => {
            for item in items {
                collect_refs(item, found);
            }
        }
        _ => {}
    }
}

/// `[Resource, Attr]` or `Resource.Attr`.
fn getatt_target(arg: &Value) -> Option<&str> {
    match arg {
        Value::Sequence(items) => items.first().and_then(Value::as_str),
        Value::String(s) => s.split('.').next(),
        _ => None,
    }
}

/// `${Name}` and `${Name.Attr}` placeholders in a `Fn::Sub` template.
/// `${!Literal}` escapes are skipped.
fn sub_refs(arg: &Value) -> Vec<&str> {
    let template = match arg {
        Value::String(s) => s.as_str(),
        Value::Sequence(items) => items.first().and_then(Value::as_str).unwrap_or(""),
        _ => "",
    };

    let mut refs = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        rest = &rest[start + 2..];
        let Some(end) = rest.find('}') else {
            break;
        };
        let name = rest[..end].split('.').next().unwrap_or("");
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            refs.push(name);
        }
        rest = &rest[end + 1..];
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFs;

    const TEMPLATE_YAML: &str = r#"AWSTemplateFormatVersion: "2010-09-09"
Description: Orders service
Resources:
  OrdersApi:
    Type: AWS::ApiGateway::RestApi
    Properties:
      Name: orders
  OrdersFunction:
    Type: AWS::Lambda::Function
    Properties:
      MemorySize: "512"
      Environment:
        Variables:
          TABLE: !Ref OrdersTable
          QUEUE_URL: !Sub "https://sqs/${OrdersQueue.QueueName}"
  OrdersTable:
    Type: AWS::DynamoDB::Table
    Properties:
      TableName: orders
  OrdersQueue:
    Type: AWS::SQS::Queue
  OrdersDb:
    Type: AWS::RDS::DBInstance
    DependsOn: OrdersQueue
    Properties:
      DBInstanceClass: db.t3.medium
      Engine: postgres
      AllocatedStorage: 100
      MultiAZ: "true"
      StorageEncrypted: true
  ExecRole:
    Type: AWS::IAM::Role
"#;

    const TEMPLATE_JSON: &str = r#"{
  "AWSTemplateFormatVersion": "2010-09-09",
  "Resources": {
    "Web": {"Type": "AWS::EC2::Instance", "Properties": {"InstanceType": {"Ref": "InstanceTypeParam"}}},
    "Assets": {
      "Type": "AWS::S3::Bucket",
      "Properties": {"BucketEncryption": {"ServerSideEncryptionConfiguration": []}}
    },
    "Worker": {
      "Type": "AWS::EC2::Instance",
      "Properties": {"InstanceType": "c5.large", "UserData": {"Fn::GetAtt": ["Assets", "Arn"]}}
    }
  }
}"#;

    #[test]
    fn test_import_yaml_template() {
        let spec = CloudFormationImporter::new()
            .import_str(TEMPLATE_YAML, "Fallback")
            .unwrap();
        assert_eq!(spec.name, "Orders service");
        assert_eq!(spec.provider, Provider::Aws);

        let ids: Vec<_> = spec.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["api_gateway", "lambda", "dynamodb", "sqs", "rds"]);

        let db = spec.component("rds").unwrap();
        assert_eq!(db.tier, 3);
        assert_eq!(db.label, "OrdersDb");
        assert_eq!(db.config["instance_class"], "db.t3.medium");
        assert_eq!(db.config["engine"], "postgres");
        assert_eq!(db.config["storage_gb"], 100);
        assert_eq!(db.config["multi_az"], true);
        assert_eq!(db.config["encryption"], true);
        assert_eq!(spec.component("lambda").unwrap().config["memory_mb"], 512);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_reference_and_inferred_connections() {
        let spec = CloudFormationImporter::new()
            .import_str(TEMPLATE_YAML, "Fallback")
            .unwrap();
        let edges: Vec<_> = spec
            .connections
            .iter()
            .map(|c| (c.source.as_str(), c.target.as_str(), c.label.as_str()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("lambda", "dynamodb", "read/write"),
                ("lambda", "sqs", "enqueue"),
                ("rds", "sqs", "enqueue"),
                ("api_gateway", "lambda", "invoke"),
                ("lambda", "rds", "SQL"),
            ]
        );
    }

    #[test]
    fn test_import_json_template() {
        let spec = CloudFormationImporter::new()
            .import_str(TEMPLATE_JSON, "Web Stack")
            .unwrap();
        assert_eq!(spec.name, "Web Stack");

        let ids: Vec<_> = spec.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"ec2") && ids.contains(&"s3"));
        let web = spec.components.iter().find(|c| c.label == "Web").unwrap();
        assert_eq!(web.config["instance_type"], "InstanceTypeParam");
        assert_eq!(spec.component("s3").unwrap().config["encryption"], true);

        let worker = spec.components.iter().find(|c| c.label == "Worker").unwrap();
        assert!(
            spec.connections
                .iter()
                .any(|c| c.source == worker.id && c.target == "s3" && c.label == "read/write")
        );
    }

    #[test]
    fn test_sub_refs() {
        let arg = Value::String("arn:${AWS::Region}:${Bucket}/${Fn.Arn}/${!Literal}".to_string());
        assert_eq!(sub_refs(&arg), vec!["Bucket", "Fn"]);
    }

    #[test]
    fn test_can_import_sniffs_contents() {
        let fs = MockFs::with_files([
            ("/infra/stack.yaml", TEMPLATE_YAML),
            ("/infra/design.yaml", "name: Design\n"),
            ("/infra/stack.template", TEMPLATE_JSON),
        ]);
        let importer = CloudFormationImporter::new();
        assert!(importer.can_import(Path::new("/infra/stack.yaml"), &fs));
        assert!(importer.can_import(Path::new("/infra/stack.template"), &fs));
        assert!(!importer.can_import(Path::new("/infra/design.yaml"), &fs));
        assert!(!importer.can_import(Path::new("/infra/missing.yaml"), &fs));

        let spec = importer.import(Path::new("/infra/stack.template"), &fs).unwrap();
        assert_eq!(spec.name, "Stack");
    }

    #[test]
    fn test_missing_resources() {
        assert!(matches!(
            CloudFormationImporter::new().import_str("Description: empty\n", "x"),
            Err(ImportError::Malformed(_))
        ));
    }
}
