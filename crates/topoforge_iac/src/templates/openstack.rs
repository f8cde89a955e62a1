//! OpenStack sections.

use crate::hcl;
use crate::render::Section;
use crate::resolver::ResolvedMap;

use super::{instance_labels, locals_block};

pub fn render(section: Section, resolved: &ResolvedMap) -> String {
    match section {
        Section::Terraform => terraform_block(),
        Section::Provider => provider_block(),
        Section::Locals => locals_block(),
        Section::Network => network_module_block(),
        Section::Router => router_module_block(),
        Section::Instances => instance_module_blocks(resolved),
        // Security groups live inside the instance module; no bastion on OpenStack.
        Section::Security | Section::Access => String::new(),
    }
}

fn terraform_block() -> String {
    r#"terraform {
  required_version = ">= 1.6.0"

  required_providers {
    openstack = {
      source  = "terraform-provider-openstack/openstack"
      version = "~> 1.53"
    }
  }
}
"#
    .to_string()
}

fn provider_block() -> String {
    r#"variable "cloud" {
  description = "Entry in clouds.yaml to authenticate with"
  type        = string
  default     = "openstack"
}

variable "external_network" {
  description = "Name of the external (floating IP) network"
  type        = string
  default     = "public"
}

provider "openstack" {
  cloud = var.cloud
}
"#
    .to_string()
}

fn network_module_block() -> String {
    r#"module "network" {
  source = "./modules/network"

  networks = local.networks
}
"#
    .to_string()
}

fn router_module_block() -> String {
    r#"module "router" {
  source = "./modules/router"

  routers          = local.routers
  subnet_ids       = module.network.subnet_ids
  external_network = var.external_network

  depends_on = [module.network]
}
"#
    .to_string()
}

fn instance_module_blocks(resolved: &ResolvedMap) -> String {
    let mut blocks = Vec::new();

    for (label, name, instance) in instance_labels(resolved) {
        blocks.push(format!(
            r#"module "{label}" {{
  source = "./modules/instance"

  name        = {name}
  image_name  = {image}
  flavor_name = {flavor}

  key_pair         = try(local.instances[{key}].key_name, null)
  security_group   = try(local.instances[{key}].security_group, "default")
  ports            = [for n in local.instances[{key}].networks : {{ network_id = module.network.network_ids[n.name], subnet_id = module.network.subnet_ids[n.name], ip = n.ip }}]
  assign_floating  = try(local.instances[{key}].associate_public_ip_address, false)
  external_network = var.external_network

  depends_on = [module.network, module.router]
}}
"#,
            label = label,
            name = hcl::string(name),
            image = hcl::string(&instance.image),
            flavor = hcl::string(&instance.size),
            key = hcl::string(name),
        ));
    }

    blocks.join("\n")
}
