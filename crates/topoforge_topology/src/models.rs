//! Data models for topologies.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A declarative description of networks, routers and instances.
///
/// `Clone` is a full structural deep copy: every nested sequence and every
/// preserved attribute map is owned by the clone, so renaming one copy can
/// never be observed through another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<Network>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routers: Vec<Router>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<Instance>,
    /// Top-level keys the generator does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.networks.push(network);
        self
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.routers.push(router);
        self
    }

    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instances.push(instance);
        self
    }

    /// Find a top-level network by name.
    pub fn network(&self, name: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Find an instance by name.
    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Every entity name in the topology, including attachment references.
    pub fn all_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for instance in &self.instances {
            names.push(instance.name.as_str());
            names.extend(instance.networks.iter().map(|n| n.name.as_str()));
        }
        names.extend(self.networks.iter().map(|n| n.name.as_str()));
        for router in &self.routers {
            names.push(router.name.as_str());
            names.extend(router.networks.iter().map(|n| n.name.as_str()));
        }
        names
    }
}

/// A top-level network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    /// Provider-specific attributes (gateway, dns, pool ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cidr: None,
            extra: Map::new(),
        }
    }

    pub fn with_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.cidr = Some(cidr.into());
        self
    }
}

/// A router joining a set of networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Router {
    pub name: String,
    #[serde(default)]
    pub networks: Vec<NetworkAttachment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Router {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            networks: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn attach(mut self, attachment: NetworkAttachment) -> Self {
        self.networks.push(attachment);
        self
    }
}

/// A reference from an instance or router to a top-level network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkAttachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: None,
            extra: Map::new(),
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }
}

/// A compute instance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Memory in GB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group: Option<String>,
    /// Security group IDs; a single string is accepted as a one-element list.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub vpc_security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "subnet")]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub networks: Vec<NetworkAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associate_public_ip_address: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Instance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            cpu: None,
            ram: None,
            key_name: None,
            security_group: None,
            vpc_security_group_ids: Vec::new(),
            subnet_id: None,
            networks: Vec::new(),
            associate_public_ip_address: None,
            extra: Map::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_size(mut self, cpu: u32, ram: u32) -> Self {
        self.cpu = Some(cpu);
        self.ram = Some(ram);
        self
    }

    pub fn attach(mut self, attachment: NetworkAttachment) -> Self {
        self.networks.push(attachment);
        self
    }

    pub fn with_security_group_id(mut self, id: impl Into<String>) -> Self {
        self.vpc_security_group_ids.push(id.into());
        self
    }

    /// Address of the first attachment, if any.
    pub fn primary_ip(&self) -> Option<&str> {
        self.networks.first().and_then(|n| n.ip.as_deref())
    }

    /// `vpc_security_group_ids` followed by `security_group`, without repeats.
    pub fn security_group_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self
            .vpc_security_group_ids
            .iter()
            .chain(self.security_group.iter())
        {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_attributes_survive_round_trip() {
        let json = r##"{
            "networks": [{"name": "net1", "cidr": "10.0.0.0/24", "gateway_ip": "10.0.0.1"}],
            "instances": [{
                "name": "web1",
                "image": "ubuntu-server",
                "cpu": 2,
                "ram": 2,
                "subnet": "subnet-abc",
                "networks": [{"name": "net1", "ip": "10.0.0.10"}],
                "user_data": "#!/bin/sh"
            }],
            "project": "demo"
        }"##;

        let topology: Topology = serde_json::from_str(json).unwrap();
        assert_eq!(topology.networks[0].extra["gateway_ip"], "10.0.0.1");
        assert_eq!(topology.instances[0].subnet_id.as_deref(), Some("subnet-abc"));
        assert_eq!(topology.instances[0].extra["user_data"], "#!/bin/sh");
        assert_eq!(topology.extra["project"], "demo");

        let written = serde_json::to_value(&topology).unwrap();
        assert_eq!(written["instances"][0]["user_data"], "#!/bin/sh");
        assert_eq!(written["networks"][0]["gateway_ip"], "10.0.0.1");
    }

    #[test]
    fn test_all_names_includes_references() {
        let topology = Topology::new()
            .with_network(Network::new("net1"))
            .with_router(Router::new("r1").attach(NetworkAttachment::new("net1")))
            .with_instance(Instance::new("web1").attach(NetworkAttachment::new("net1")));

        let names = topology.all_names();
        assert_eq!(names, vec!["web1", "net1", "net1", "r1", "net1"]);
    }

    #[test]
    fn test_security_group_ids_accept_string_or_list() {
        let single: Instance =
            serde_json::from_str(r#"{"name": "a", "vpc_security_group_ids": "sg-0abc123"}"#).unwrap();
        assert_eq!(single.vpc_security_group_ids, vec!["sg-0abc123"]);
        assert!(single.extra.is_empty());

        let many: Instance = serde_json::from_str(
            r#"{"name": "b", "vpc_security_group_ids": ["sg-1", "sg-2"], "security_group": "sg-1"}"#,
        )
        .unwrap();
        assert_eq!(many.security_group_ids(), vec!["sg-1", "sg-2"]);

        let written = serde_json::to_value(&many).unwrap();
        assert_eq!(written["vpc_security_group_ids"][1], "sg-2");
        assert!(serde_json::to_value(Instance::new("c"))
            .unwrap()
            .get("vpc_security_group_ids")
            .is_none());
    }

    #[test]
    fn test_primary_ip() {
        let instance = Instance::new("db").attach(NetworkAttachment::new("net1").with_ip("10.0.0.5"));
        assert_eq!(instance.primary_ip(), Some("10.0.0.5"));
        assert_eq!(Instance::new("bare").primary_ip(), None);
    }
}
