//! Configuration rendering.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderBackend;
use crate::resolver::ResolvedMap;

/// A block of the generated `main.tf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// `terraform { required_providers ... }`
    Terraform,
    /// Provider configuration and its variables
    Provider,
    /// Locals decoding the sibling topology file
    Locals,
    Network,
    Router,
    /// Shared security rules
    Security,
    /// One module block per resolved instance
    Instances,
    /// Bastion / access host
    Access,
}

impl Section {
    /// Creation-order rank. Networking always ranks below compute.
    pub fn rank(&self) -> u8 {
        match self {
            Section::Terraform => 0,
            Section::Provider => 1,
            Section::Locals => 2,
            Section::Network => 3,
            Section::Router => 4,
            Section::Security => 5,
            Section::Instances => 6,
            Section::Access => 7,
        }
    }
}

/// Composes provider sections into one configuration text.
pub struct ConfigRenderer;

impl ConfigRenderer {
    /// Render the configuration for `resolved` on `backend`.
    ///
    /// Pure: the same inputs always produce byte-identical output. Sections
    /// are emitted in rank order even if a backend lists them out of order.
    pub fn render(backend: &dyn ProviderBackend, resolved: &ResolvedMap) -> String {
        let mut sections = backend.sections().to_vec();
        sections.sort_by_key(Section::rank);

        let rendered: Vec<String> = sections
            .into_iter()
            .map(|section| backend.render_section(section, resolved))
            .filter(|block| !block.is_empty())
            .collect();

        let mut out = rendered.join("\n");
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}
