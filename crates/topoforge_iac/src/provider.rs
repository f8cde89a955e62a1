//! Provider definitions and the backend registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CatalogFile;
use crate::error::{IacError, IacResult};
use crate::render::Section;
use crate::resolver::{CatalogResolver, ResolvedMap, ResourceResolver};
use crate::templates;

/// Supported infrastructure providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    OpenStack,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::OpenStack => "openstack",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Provider::Aws, Provider::OpenStack]
    }

    /// Terraform provider source address.
    pub fn terraform_source(&self) -> &'static str {
        match self {
            Provider::Aws => "hashicorp/aws",
            Provider::OpenStack => "terraform-provider-openstack/openstack",
        }
    }
}

impl FromStr for Provider {
    type Err = IacError;

    /// Case-insensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "openstack" => Ok(Provider::OpenStack),
            _ => Err(IacError::InvalidProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The capability set every provider implements.
pub trait ProviderBackend: Send + Sync {
    fn provider(&self) -> Provider;

    /// Resolver mapping abstract requests onto this provider's catalog.
    fn resolver(&self) -> &dyn ResourceResolver;

    /// Sections of the generated configuration, in emission order.
    fn sections(&self) -> &'static [Section];

    /// Render one section for the given resolved instances.
    fn render_section(&self, section: Section, resolved: &ResolvedMap) -> String;

    /// Directory holding this provider's project template.
    fn template_dir(&self, templates_root: &Path) -> PathBuf {
        templates_root.join(self.provider().as_str())
    }
}

const AWS_SECTIONS: &[Section] = &[
    Section::Terraform,
    Section::Provider,
    Section::Locals,
    Section::Network,
    Section::Router,
    Section::Security,
    Section::Instances,
    Section::Access,
];

const OPENSTACK_SECTIONS: &[Section] = &[
    Section::Terraform,
    Section::Provider,
    Section::Locals,
    Section::Network,
    Section::Router,
    Section::Instances,
];

/// AWS backend: AMIs and instance types.
pub struct AwsBackend {
    resolver: CatalogResolver,
}

impl AwsBackend {
    pub fn new(resolver: CatalogResolver) -> Self {
        Self { resolver }
    }
}

impl Default for AwsBackend {
    fn default() -> Self {
        Self::new(CatalogResolver::aws())
    }
}

impl ProviderBackend for AwsBackend {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn resolver(&self) -> &dyn ResourceResolver {
        &self.resolver
    }

    fn sections(&self) -> &'static [Section] {
        AWS_SECTIONS
    }

    fn render_section(&self, section: Section, resolved: &ResolvedMap) -> String {
        templates::aws::render(section, resolved)
    }
}

/// OpenStack backend: Glance images and Nova flavors.
pub struct OpenStackBackend {
    resolver: CatalogResolver,
}

impl OpenStackBackend {
    pub fn new(resolver: CatalogResolver) -> Self {
        Self { resolver }
    }
}

impl Default for OpenStackBackend {
    fn default() -> Self {
        Self::new(CatalogResolver::openstack())
    }
}

impl ProviderBackend for OpenStackBackend {
    fn provider(&self) -> Provider {
        Provider::OpenStack
    }

    fn resolver(&self) -> &dyn ResourceResolver {
        &self.resolver
    }

    fn sections(&self) -> &'static [Section] {
        OPENSTACK_SECTIONS
    }

    fn render_section(&self, section: Section, resolved: &ResolvedMap) -> String {
        templates::openstack::render(section, resolved)
    }
}

/// Maps providers to their backends.
#[derive(Default)]
pub struct ProviderRegistry {
    backends: HashMap<Provider, Arc<dyn ProviderBackend>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Registry with the built-in AWS and OpenStack backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AwsBackend::default()));
        registry.register(Arc::new(OpenStackBackend::default()));
        registry
    }

    /// Built-in backends whose catalogs are extended by a catalog file.
    pub fn with_catalog_file(path: &Path) -> IacResult<Self> {
        let file = CatalogFile::load(path)?;
        let mut registry = Self::new();
        registry.register(Arc::new(AwsBackend::new(
            CatalogResolver::aws().extend_catalog(file.aws),
        )));
        registry.register(Arc::new(OpenStackBackend::new(
            CatalogResolver::openstack().extend_catalog(file.openstack),
        )));
        Ok(registry)
    }

    /// Register a backend, replacing any previous one for the same provider.
    pub fn register(&mut self, backend: Arc<dyn ProviderBackend>) {
        debug!("Registering provider backend: {}", backend.provider());
        self.backends.insert(backend.provider(), backend);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderBackend>> {
        self.backends.get(&provider).cloned()
    }

    /// Get a backend, returning an error if none is registered.
    pub fn get_required(&self, provider: Provider) -> IacResult<Arc<dyn ProviderBackend>> {
        self.get(provider)
            .ok_or_else(|| IacError::InvalidProvider(provider.to_string()))
    }

    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<_> = self.backends.keys().copied().collect();
        providers.sort();
        providers
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_is_case_insensitive() {
        assert_eq!("AWS".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!("OpenStack".parse::<Provider>().unwrap(), Provider::OpenStack);
        assert!(matches!(
            "gcp".parse::<Provider>(),
            Err(IacError::InvalidProvider(p)) if p == "gcp"
        ));
    }

    #[test]
    fn test_provider_serde_names() {
        assert_eq!(serde_json::to_string(&Provider::OpenStack).unwrap(), "\"openstack\"");
        assert_eq!(serde_json::from_str::<Provider>("\"aws\"").unwrap(), Provider::Aws);
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.providers(), vec![Provider::Aws, Provider::OpenStack]);
        let backend = registry.get_required(Provider::OpenStack).unwrap();
        assert_eq!(backend.provider(), Provider::OpenStack);
        assert_eq!(
            backend.template_dir(Path::new("/srv/templates")),
            PathBuf::from("/srv/templates/openstack")
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.get_required(Provider::Aws).is_err());
    }

    #[test]
    fn test_network_sections_precede_instances() {
        for sections in [AWS_SECTIONS, OPENSTACK_SECTIONS] {
            let network = sections.iter().position(|s| *s == Section::Network).unwrap();
            let router = sections.iter().position(|s| *s == Section::Router).unwrap();
            let instances = sections.iter().position(|s| *s == Section::Instances).unwrap();
            assert!(network < router && router < instances);
        }
    }
}
