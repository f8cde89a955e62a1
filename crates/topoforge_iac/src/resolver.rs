//! Resource resolution: abstract requests to concrete provider identifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use topoforge_topology::{Instance, Suffix, Topology};

use crate::catalog::ResourceCatalog;
use crate::error::{IacError, IacResult};
use crate::provider::Provider;

/// Concrete identifiers chosen for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInstance {
    /// AMI (AWS) or image name (OpenStack)
    pub image: String,
    /// Instance type (AWS) or flavor (OpenStack)
    pub size: String,
    /// Security groups the instance asked for; empty means the provider default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
}

impl ResolvedInstance {
    pub fn new(image: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            size: size.into(),
            security_groups: Vec::new(),
        }
    }

    pub fn with_security_groups(mut self, groups: Vec<String>) -> Self {
        self.security_groups = groups;
        self
    }
}

/// One resolved instance keyed by its name in the loaded topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    pub original_name: String,
    #[serde(flatten)]
    pub resolved: ResolvedInstance,
}

/// Outcome of running a resolver over a whole topology.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub valid: bool,
    pub instances: Vec<ResolvedEntry>,
    pub messages: Vec<String>,
}

impl Resolution {
    pub fn new() -> Self {
        Self {
            valid: true,
            instances: Vec::new(),
            messages: Vec::new(),
        }
    }

    fn fail(&mut self, message: String) {
        self.valid = false;
        self.messages.push(message);
    }

    /// Index the resolved entries by instance name, or fail with every message.
    pub fn into_map(self) -> IacResult<ResolvedMap> {
        if !self.valid {
            return Err(IacError::ResolutionFailed(self.messages));
        }
        Ok(self
            .instances
            .into_iter()
            .map(|entry| (entry.original_name, entry.resolved))
            .collect())
    }
}

/// Instance name -> resolved identifiers, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMap(BTreeMap<String, ResolvedInstance>);

impl ResolvedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, resolved: ResolvedInstance) {
        self.0.insert(name.into(), resolved);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedInstance> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedInstance)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-key the map with the names the instances carry inside one copy.
    pub fn for_suffix(&self, suffix: &Suffix) -> ResolvedMap {
        self.0
            .iter()
            .map(|(name, resolved)| (suffix.apply(name), resolved.clone()))
            .collect()
    }
}

impl FromIterator<(String, ResolvedInstance)> for ResolvedMap {
    fn from_iter<T: IntoIterator<Item = (String, ResolvedInstance)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What happens when the catalog has no match for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Substitute provider defaults and keep going; the substitution is reported.
    Soft {
        fallback_image: String,
        fallback_size: String,
    },
    /// Any unmatched request invalidates the resolution.
    Hard,
}

/// Values assumed when an instance omits a request attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDefaults {
    pub image: Option<String>,
    pub cpu: Option<u32>,
    pub ram: Option<u32>,
}

/// Maps a topology's abstract resource requests onto a provider.
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, topology: &Topology) -> Resolution;
}

/// Catalog-backed resolver parameterized by provider policy.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    provider: Provider,
    catalog: ResourceCatalog,
    policy: ResolutionPolicy,
    defaults: RequestDefaults,
}

impl CatalogResolver {
    pub fn new(
        provider: Provider,
        catalog: ResourceCatalog,
        policy: ResolutionPolicy,
        defaults: RequestDefaults,
    ) -> Self {
        Self {
            provider,
            catalog,
            policy,
            defaults,
        }
    }

    /// AWS: missing attributes default to `ubuntu-server` on 1 vCPU / 1 GB,
    /// and unmatched requests fall back to `ami-default` / `t2.micro`.
    pub fn aws() -> Self {
        Self::new(
            Provider::Aws,
            ResourceCatalog::aws(),
            ResolutionPolicy::Soft {
                fallback_image: "ami-default".to_string(),
                fallback_size: "t2.micro".to_string(),
            },
            RequestDefaults {
                image: Some("ubuntu-server".to_string()),
                cpu: Some(1),
                ram: Some(1),
            },
        )
    }

    /// OpenStack: every instance must name a known image and a cpu/ram pair
    /// that matches a flavor.
    pub fn openstack() -> Self {
        Self::new(
            Provider::OpenStack,
            ResourceCatalog::openstack(),
            ResolutionPolicy::Hard,
            RequestDefaults::default(),
        )
    }

    /// Extend the built-in catalog with overrides, if any.
    pub fn extend_catalog(mut self, overrides: Option<ResourceCatalog>) -> Self {
        if let Some(overrides) = overrides {
            self.catalog.extend(overrides);
        }
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    fn resolve_image(&self, instance: &Instance, messages: &mut Vec<String>) -> Option<String> {
        let requested = instance.image.as_deref().or(self.defaults.image.as_deref());
        let found = requested.and_then(|name| self.catalog.image(name));

        match (found, &self.policy) {
            (Some(id), _) => Some(id.to_string()),
            (None, ResolutionPolicy::Soft { fallback_image, .. }) => {
                messages.push(format!(
                    "Instance '{}': image '{}' not in the {} catalog, using {}",
                    instance.name,
                    requested.unwrap_or("<none>"),
                    self.provider,
                    fallback_image
                ));
                Some(fallback_image.clone())
            }
            (None, ResolutionPolicy::Hard) => {
                match requested {
                    Some(name) => messages.push(format!(
                        "Instance '{}': image '{}' is not available on {}",
                        instance.name, name, self.provider
                    )),
                    None => messages.push(format!(
                        "Instance '{}': no image specified",
                        instance.name
                    )),
                }
                None
            }
        }
    }

    fn resolve_size(&self, instance: &Instance, messages: &mut Vec<String>) -> Option<String> {
        let cpu = instance.cpu.or(self.defaults.cpu);
        let ram = instance.ram.or(self.defaults.ram);
        let found = match (cpu, ram) {
            (Some(cpu), Some(ram)) => self.catalog.size(cpu, ram),
            _ => None,
        };

        match (found, &self.policy) {
            (Some(size), _) => Some(size.to_string()),
            (None, ResolutionPolicy::Soft { fallback_size, .. }) => {
                messages.push(format!(
                    "Instance '{}': no size for {} CPU / {} GB RAM, using {}",
                    instance.name,
                    describe(cpu),
                    describe(ram),
                    fallback_size
                ));
                Some(fallback_size.clone())
            }
            (None, ResolutionPolicy::Hard) => {
                match (cpu, ram) {
                    (Some(cpu), Some(ram)) => messages.push(format!(
                        "Instance '{}': no flavor matches {} CPU / {} GB RAM",
                        instance.name, cpu, ram
                    )),
                    _ => messages.push(format!(
                        "Instance '{}': cpu and ram must both be specified",
                        instance.name
                    )),
                }
                None
            }
        }
    }
}

fn describe(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

impl ResourceResolver for CatalogResolver {
    fn resolve(&self, topology: &Topology) -> Resolution {
        let mut resolution = Resolution::new();

        for instance in &topology.instances {
            let mut messages = Vec::new();
            let image = self.resolve_image(instance, &mut messages);
            let size = self.resolve_size(instance, &mut messages);

            match (image, size) {
                (Some(image), Some(size)) => {
                    debug!(
                        "Resolved {} on {}: image={} size={}",
                        instance.name, self.provider, image, size
                    );
                    for message in messages {
                        warn!("{}", message);
                        resolution.messages.push(message);
                    }
                    resolution.instances.push(ResolvedEntry {
                        original_name: instance.name.clone(),
                        resolved: ResolvedInstance::new(image, size)
                            .with_security_groups(instance.security_group_ids()),
                    });
                }
                _ => {
                    for message in messages {
                        resolution.fail(message);
                    }
                }
            }
        }

        resolution
    }
}
