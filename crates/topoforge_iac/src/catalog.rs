//! Provider resource catalogs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IacError, IacResult};

/// One machine size keyed by requested vCPU count and RAM (GB).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub cpu: u32,
    pub ram: u32,
    pub name: String,
}

impl SizeEntry {
    pub fn new(cpu: u32, ram: u32, name: impl Into<String>) -> Self {
        Self {
            cpu,
            ram,
            name: name.into(),
        }
    }
}

/// Image names and machine sizes a provider knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    /// Abstract image name -> concrete image identifier
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    /// (cpu, ram) -> concrete size identifier
    #[serde(default)]
    pub sizes: Vec<SizeEntry>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.images.insert(name.into(), id.into());
        self
    }

    pub fn with_size(mut self, cpu: u32, ram: u32, name: impl Into<String>) -> Self {
        self.sizes.retain(|s| !(s.cpu == cpu && s.ram == ram));
        self.sizes.push(SizeEntry::new(cpu, ram, name));
        self
    }

    /// Built-in AWS catalog (us-east-1 AMIs).
    pub fn aws() -> Self {
        Self::new()
            .with_image("ubuntu-server", "ami-0c55b159cbfafe1f0")
            .with_image("ubuntu-server-focal", "ami-042e828730a8e686c")
            .with_size(1, 1, "t2.micro")
            .with_size(2, 2, "t2.small")
            .with_size(2, 4, "t2.medium")
            .with_size(2, 8, "t2.large")
            .with_size(4, 16, "t2.xlarge")
    }

    /// Built-in OpenStack catalog (stock Glance images, default Nova flavors).
    pub fn openstack() -> Self {
        Self::new()
            .with_image("ubuntu-server", "ubuntu-22.04")
            .with_image("ubuntu-server-focal", "ubuntu-20.04")
            .with_image("cirros", "cirros-0.6.2-x86_64-disk")
            .with_size(1, 1, "m1.tiny")
            .with_size(1, 2, "m1.small")
            .with_size(2, 4, "m1.medium")
            .with_size(4, 8, "m1.large")
            .with_size(8, 16, "m1.xlarge")
    }

    pub fn image(&self, name: &str) -> Option<&str> {
        self.images.get(name).map(String::as_str)
    }

    pub fn size(&self, cpu: u32, ram: u32) -> Option<&str> {
        self.sizes
            .iter()
            .find(|s| s.cpu == cpu && s.ram == ram)
            .map(|s| s.name.as_str())
    }

    /// Add entries from `other`, overriding existing keys.
    pub fn extend(&mut self, other: ResourceCatalog) {
        self.images.extend(other.images);
        for entry in other.sizes {
            self.sizes.retain(|s| !(s.cpu == entry.cpu && s.ram == entry.ram));
            self.sizes.push(entry);
        }
    }
}

/// Catalog overrides read from a YAML file.
///
/// ```yaml
/// aws:
///   images:
///     debian-12: ami-0123456789abcdef0
/// openstack:
///   sizes:
///     - { cpu: 2, ram: 2, name: m1.small-2c }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub aws: Option<ResourceCatalog>,
    #[serde(default)]
    pub openstack: Option<ResourceCatalog>,
}

impl CatalogFile {
    pub fn load(path: &Path) -> IacResult<Self> {
        if !path.exists() {
            return Err(IacError::Config(format!(
                "catalog file not found: {}",
                path.display()
            )));
        }
        debug!("Loading catalog overrides from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> IacResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_catalog_lookups() {
        let catalog = ResourceCatalog::aws();
        assert_eq!(catalog.image("ubuntu-server"), Some("ami-0c55b159cbfafe1f0"));
        assert_eq!(catalog.size(2, 2), Some("t2.small"));
        assert_eq!(catalog.size(2, 4), Some("t2.medium"));
        assert_eq!(catalog.size(3, 3), None);
    }

    #[test]
    fn test_extend_overrides_entries() {
        let mut catalog = ResourceCatalog::openstack();
        let file = CatalogFile::parse(
            r#"
openstack:
  images:
    ubuntu-server: ubuntu-24.04
  sizes:
    - { cpu: 2, ram: 4, name: custom.medium }
    - { cpu: 16, ram: 64, name: m1.huge }
"#,
        )
        .unwrap();
        assert!(file.aws.is_none());

        catalog.extend(file.openstack.unwrap());
        assert_eq!(catalog.image("ubuntu-server"), Some("ubuntu-24.04"));
        assert_eq!(catalog.image("cirros"), Some("cirros-0.6.2-x86_64-disk"));
        assert_eq!(catalog.size(2, 4), Some("custom.medium"));
        assert_eq!(catalog.size(16, 64), Some("m1.huge"));
        assert_eq!(catalog.sizes.iter().filter(|s| s.cpu == 2 && s.ram == 4).count(), 1);
    }

    #[test]
    fn test_missing_catalog_file() {
        let err = CatalogFile::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, IacError::Config(_)));
    }
}
