//! Provider-specific configuration sections.

use std::collections::HashSet;

use crate::hcl;
use crate::resolver::{ResolvedInstance, ResolvedMap};

pub mod aws;
pub mod openstack;

/// Block label for each resolved instance, in name order.
///
/// Names that sanitize to the same identifier get a numeric suffix so every
/// module label stays unique.
pub(crate) fn instance_labels(resolved: &ResolvedMap) -> Vec<(String, &str, &ResolvedInstance)> {
    let mut used = HashSet::new();
    let mut labels = Vec::with_capacity(resolved.len());

    for (name, instance) in resolved.iter() {
        let base = format!("instance_{}", hcl::identifier(name));
        let mut label = base.clone();
        let mut n = 2;
        while !used.insert(label.clone()) {
            label = format!("{}_{}", base, n);
            n += 1;
        }
        labels.push((label, name.as_str(), instance));
    }

    labels
}

/// Locals shared by every provider: the per-copy topology, indexed by name.
pub(crate) fn locals_block() -> String {
    r#"locals {
  topology  = jsondecode(file("${path.module}/topology.json"))
  networks  = { for n in try(local.topology.networks, []) : n.name => n }
  routers   = { for r in try(local.topology.routers, []) : r.name => r }
  instances = { for i in try(local.topology.instances, []) : i.name => i }
}
"#
    .to_string()
}
