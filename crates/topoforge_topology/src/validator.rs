//! Topology validation: schema shape plus IP/CIDR consistency.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::debug;

use crate::cidr::Ipv4Cidr;
use crate::error::{TopologyError, TopologyResult};
use crate::models::Topology;

const TOPOLOGY_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "properties": {
    "networks": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["name"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "cidr": { "type": "string" }
        }
      }
    },
    "routers": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["name"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "networks": {
            "type": "array",
            "items": {
              "type": "object",
              "required": ["name"],
              "properties": {
                "name": { "type": "string", "minLength": 1 },
                "ip": { "type": "string" }
              }
            }
          }
        }
      }
    },
    "instances": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["name"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "image": { "type": "string" },
          "cpu": { "type": "integer", "minimum": 1, "maximum": 4096 },
          "ram": { "type": "integer", "minimum": 1, "maximum": 65536 },
          "key_name": { "type": "string" },
          "security_group": { "type": "string" },
          "vpc_security_group_ids": {
            "oneOf": [
              { "type": "string" },
              { "type": "array", "items": { "type": "string" } }
            ]
          },
          "subnet_id": { "type": "string" },
          "subnet": { "type": "string" },
          "associate_public_ip_address": { "type": "boolean" },
          "networks": {
            "type": "array",
            "items": {
              "type": "object",
              "required": ["name", "ip"],
              "properties": {
                "name": { "type": "string", "minLength": 1 },
                "ip": { "type": "string" }
              }
            }
          }
        }
      }
    }
  }
}"#;

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Convert into an error carrying every violation, if any were found.
    pub fn into_result(self) -> TopologyResult<Vec<String>> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(TopologyError::Invalid(self.errors))
        }
    }
}

/// Validator for topology documents.
pub struct TopologyValidator;

impl TopologyValidator {
    /// Validate a topology file for the given provider.
    pub fn validate_file(path: impl AsRef<Path>, provider: &str) -> TopologyResult<ValidationResult> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TopologyError::NotFound(path.to_path_buf()));
        }

        debug!("Validating topology {:?} for {}", path, provider);
        let content = fs::read_to_string(path)?;
        Ok(Self::validate_str(&content, provider))
    }

    /// Validate raw topology text.
    pub fn validate_str(content: &str, provider: &str) -> ValidationResult {
        match serde_json::from_str::<Value>(content) {
            Ok(value) => Self::validate_value(&value, provider),
            Err(e) => {
                let mut result = ValidationResult::new();
                result.add_error(format!("Topology is not valid JSON: {}", e));
                result
            }
        }
    }

    /// Validate an already-parsed document.
    ///
    /// Semantic checks only run once the schema check passes, since they
    /// need the typed model.
    pub fn validate_value(value: &Value, provider: &str) -> ValidationResult {
        let mut result = Self::validate_schema(value);
        if !result.valid {
            return result;
        }

        match serde_json::from_value::<Topology>(value.clone()) {
            Ok(topology) => result.merge(Self::validate_topology(&topology, provider)),
            Err(e) => result.add_error(format!("Topology does not match the model: {}", e)),
        }
        result
    }

    /// Check the document shape against the embedded JSON schema.
    pub fn validate_schema(value: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let schema: Value = match serde_json::from_str(TOPOLOGY_SCHEMA) {
            Ok(schema) => schema,
            Err(e) => {
                result.add_error(format!("Embedded schema is invalid: {}", e));
                return result;
            }
        };
        let compiled = match JSONSchema::options().with_draft(Draft::Draft7).compile(&schema) {
            Ok(compiled) => compiled,
            Err(e) => {
                result.add_error(format!("Embedded schema failed to compile: {}", e));
                return result;
            }
        };

        if let Err(errors) = compiled.validate(value) {
            for error in errors {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    result.add_error(error.to_string());
                } else {
                    result.add_error(format!("{}: {}", path, error));
                }
            }
        }

        result
    }

    /// Cross-reference names and addresses in a typed topology.
    pub fn validate_topology(topology: &Topology, provider: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::check_unique(
            "instance",
            topology.instances.iter().map(|i| i.name.as_str()),
            &mut result,
        );
        Self::check_unique(
            "network",
            topology.networks.iter().map(|n| n.name.as_str()),
            &mut result,
        );
        Self::check_unique(
            "router",
            topology.routers.iter().map(|r| r.name.as_str()),
            &mut result,
        );

        let mut blocks: HashMap<&str, Option<Ipv4Cidr>> = HashMap::new();
        for network in &topology.networks {
            let block = match &network.cidr {
                Some(cidr) => match cidr.parse::<Ipv4Cidr>() {
                    Ok(block) => Some(block),
                    Err(e) => {
                        result.add_error(format!("Network '{}': {}", network.name, e));
                        None
                    }
                },
                None => {
                    if provider.eq_ignore_ascii_case("openstack") {
                        result.add_error(format!(
                            "Network '{}' must declare a cidr for openstack",
                            network.name
                        ));
                    }
                    None
                }
            };
            blocks.insert(network.name.as_str(), block);
        }

        let mut assigned: HashSet<(&str, Ipv4Addr)> = HashSet::new();

        for instance in &topology.instances {
            if instance.networks.is_empty() && provider.eq_ignore_ascii_case("aws") {
                result.add_warning(format!(
                    "Instance '{}' has no network attachment; default private IP will be used",
                    instance.name
                ));
            }
            for attachment in &instance.networks {
                let owner = format!("Instance '{}'", instance.name);
                Self::check_attachment(
                    &owner,
                    &attachment.name,
                    attachment.ip.as_deref(),
                    &blocks,
                    &mut assigned,
                    &mut result,
                );
            }
        }

        for router in &topology.routers {
            for attachment in &router.networks {
                let owner = format!("Router '{}'", router.name);
                Self::check_attachment(
                    &owner,
                    &attachment.name,
                    attachment.ip.as_deref(),
                    &blocks,
                    &mut assigned,
                    &mut result,
                );
            }
        }

        result
    }

    fn check_unique<'a>(
        kind: &str,
        names: impl Iterator<Item = &'a str>,
        result: &mut ValidationResult,
    ) {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                result.add_error(format!("Duplicate {} name: {}", kind, name));
            }
        }
    }

    fn check_attachment<'a>(
        owner: &str,
        network: &'a str,
        ip: Option<&str>,
        blocks: &HashMap<&str, Option<Ipv4Cidr>>,
        assigned: &mut HashSet<(&'a str, Ipv4Addr)>,
        result: &mut ValidationResult,
    ) {
        let Some(block) = blocks.get(network) else {
            result.add_error(format!("{} references unknown network: {}", owner, network));
            return;
        };

        let Some(ip) = ip else {
            return;
        };

        let addr: Ipv4Addr = match ip.parse() {
            Ok(addr) => addr,
            Err(_) => {
                result.add_error(format!("{} has invalid IP address: {}", owner, ip));
                return;
            }
        };

        if let Some(block) = block {
            if !block.contains(addr) {
                result.add_error(format!(
                    "{} IP {} is outside network '{}' ({})",
                    owner, addr, network, block
                ));
                return;
            }
            if !block.is_host_address(addr) {
                result.add_error(format!(
                    "{} IP {} is a reserved address of network '{}' ({})",
                    owner, addr, network, block
                ));
                return;
            }
        }

        if !assigned.insert((network, addr)) {
            result.add_error(format!(
                "{} IP {} is already assigned on network '{}'",
                owner, addr, network
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_document() -> Value {
        json!({
            "networks": [{ "name": "net1", "cidr": "10.0.0.0/24" }],
            "routers": [{ "name": "r1", "networks": [{ "name": "net1", "ip": "10.0.0.1" }] }],
            "instances": [{
                "name": "web1",
                "image": "ubuntu-server",
                "cpu": 2,
                "ram": 2,
                "networks": [{ "name": "net1", "ip": "10.0.0.10" }]
            }]
        })
    }

    #[test]
    fn test_valid_topology() {
        let result = TopologyValidator::validate_value(&valid_document(), "openstack");
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_schema_violations_are_all_reported() {
        let doc = json!({
            "instances": [
                { "image": "ubuntu-server" },
                { "name": "db", "cpu": 0, "networks": [{ "name": "net1" }] }
            ]
        });
        let result = TopologyValidator::validate_value(&doc, "aws");
        assert!(!result.valid);
        assert!(result.errors.len() >= 3, "got {:?}", result.errors);
    }

    #[test]
    fn test_unknown_network_reference() {
        let mut doc = valid_document();
        doc["instances"][0]["networks"][0]["name"] = json!("missing");
        let result = TopologyValidator::validate_value(&doc, "aws");
        assert!(!result.valid);
        assert!(result.errors[0].contains("unknown network: missing"));
    }

    #[test]
    fn test_ip_outside_cidr() {
        let mut doc = valid_document();
        doc["instances"][0]["networks"][0]["ip"] = json!("10.0.1.10");
        let result = TopologyValidator::validate_value(&doc, "aws");
        assert!(!result.valid);
        assert!(result.errors[0].contains("outside network"));
    }

    #[test]
    fn test_duplicate_ip_and_names() {
        let mut doc = valid_document();
        doc["instances"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "name": "web1", "networks": [{ "name": "net1", "ip": "10.0.0.10" }] }));
        let result = TopologyValidator::validate_value(&doc, "aws");
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("Duplicate instance name: web1")));
        assert!(result.errors.iter().any(|e| e.contains("already assigned")));
    }

    #[test]
    fn test_openstack_requires_cidr() {
        let doc = json!({ "networks": [{ "name": "net1" }] });
        assert!(TopologyValidator::validate_value(&doc, "aws").valid);
        assert!(!TopologyValidator::validate_value(&doc, "openstack").valid);
    }

    #[test]
    fn test_security_group_ids_shape() {
        let mut doc = valid_document();
        doc["instances"][0]["vpc_security_group_ids"] = json!("sg-0abc123");
        assert!(TopologyValidator::validate_value(&doc, "aws").valid);

        doc["instances"][0]["vpc_security_group_ids"] = json!(["sg-1", "sg-2"]);
        assert!(TopologyValidator::validate_value(&doc, "aws").valid);

        doc["instances"][0]["vpc_security_group_ids"] = json!([42]);
        assert!(!TopologyValidator::validate_value(&doc, "aws").valid);
    }

    #[test]
    fn test_invalid_json() {
        let result = TopologyValidator::validate_str("{ not json", "aws");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }
}
