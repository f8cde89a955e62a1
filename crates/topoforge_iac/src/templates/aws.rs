//! AWS sections.

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
        Section::Security => security_group_block(),
        Section::Instances => instance_module_blocks(resolved),
        Section::Access => bastion_block(resolved),
    }
}

fn terraform_block() -> String {
    r#"terraform {
  required_version = ">= 1.6.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
  }
}
"#
    .to_string()
}

fn provider_block() -> String {
    r#"variable "region" {
  description = "AWS region"
  type        = string
  default     = "us-east-1"
}

provider "aws" {
  region = var.region

  default_tags {
    tags = {
      ManagedBy = "terraform"
      CreatedBy = "topoforge"
    }
  }
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

  routers    = local.routers
  vpc_id     = module.network.vpc_id
  subnet_ids = module.network.subnet_ids

  depends_on = [module.network]
}
"#
    .to_string()
}

fn security_group_block() -> String {
    r#"resource "aws_security_group" "default" {
  name_prefix = "topoforge-"
  vpc_id      = module.network.vpc_id

  ingress {
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  ingress {
    from_port = 0
    to_port   = 0
    protocol  = "-1"
    self      = true
  }

  egress {
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }
}
"#
    .to_string()
}

fn instance_module_blocks(resolved: &ResolvedMap) -> String {
    let mut blocks = Vec::new();

    for (label, name, instance) in instance_labels(resolved) {
        let key = hcl::string(name);
        blocks.push(format!(
            r#"module "{label}" {{
  source = "./modules/instance"

  name          = {name}
  ami           = {ami}
  instance_type = {instance_type}

  key_name                    = try(local.instances[{key}].key_name, "my-key")
  subnet_id                   = try(local.instances[{key}].subnet_id, module.network.subnet_ids[local.instances[{key}].networks[0].name])
  private_ip                  = try(local.instances[{key}].networks[0].ip, "10.0.0.10")
  associate_public_ip_address = try(local.instances[{key}].associate_public_ip_address, true)
  vpc_security_group_ids      = {security_groups}

  tags = {{
    Name = {name}
  }}

  depends_on = [module.network, module.router]
}}
"#,
            label = label,
            name = hcl::string(name),
            ami = hcl::string(&instance.image),
            instance_type = hcl::string(&instance.size),
            key = key,
            security_groups = security_groups(&instance.security_groups),
        ));
    }

    blocks.join("\n")
}

/// The instance's own groups, or the shared default group when it names none.
fn security_groups(groups: &[String]) -> String {
    if groups.is_empty() {
        "[aws_security_group.default.id]".to_string()
    } else {
        hcl::list(groups)
    }
}

fn bastion_block(resolved: &ResolvedMap) -> String {
    format!(
        r#"module "bastion" {{
  source = "./modules/bastion"

  vpc_id            = module.network.vpc_id
  public_subnet_id  = module.network.public_subnet_id
  security_group_id = aws_security_group.default.id
  target_instances  = {targets}
}}
"#,
        targets = hcl::list(resolved.names()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedInstance;

    #[test]
    fn test_instance_block_contents() {
        let mut map = ResolvedMap::new();
        map.insert("web1_ab12cd", ResolvedInstance::new("ami-0c55b159cbfafe1f0", "t2.small"));

        let block = render(Section::Instances, &map);
        assert!(block.contains("module \"instance_web1_ab12cd\" {"));
        assert!(block.contains("ami           = \"ami-0c55b159cbfafe1f0\""));
        assert!(block.contains("instance_type = \"t2.small\""));
        assert!(block.contains("local.instances[\"web1_ab12cd\"]"));
        assert!(block.contains("vpc_security_group_ids      = [aws_security_group.default.id]"));
    }

    #[test]
    fn test_instance_security_groups_are_rendered() {
        let mut map = ResolvedMap::new();
        map.insert(
            "web1_ab12cd",
            ResolvedInstance::new("ami-0c55b159cbfafe1f0", "t2.small")
                .with_security_groups(vec!["sg-0abc123".into(), "sg-0def456".into()]),
        );

        let block = render(Section::Instances, &map);
        assert!(block.contains("vpc_security_group_ids      = [\"sg-0abc123\", \"sg-0def456\"]"));
        assert!(!block.contains("aws_security_group.default.id"));
    }

    #[test]
    fn test_identifiers_are_escaped() {
        let mut map = ResolvedMap::new();
        map.insert("we\"ird", ResolvedInstance::new("ami-${x}", "t2.micro"));

        let block = render(Section::Instances, &map);
        assert!(block.contains("name          = \"we\\\"ird\""));
        assert!(block.contains("ami           = \"ami-$${x}\""));
        assert!(block.contains("module \"instance_we_ird\""));
    }

    #[test]
    fn test_bastion_lists_targets() {
        let mut map = ResolvedMap::new();
        map.insert("a_x", ResolvedInstance::new("ami", "t2.micro"));
        map.insert("b_x", ResolvedInstance::new("ami", "t2.micro"));

        let block = render(Section::Access, &map);
        assert!(block.contains("target_instances  = [\"a_x\", \"b_x\"]"));

        let empty = render(Section::Access, &ResolvedMap::new());
        assert!(empty.contains("target_instances  = []"));
    }

    #[test]
    fn test_no_instances_renders_nothing() {
        assert!(render(Section::Instances, &ResolvedMap::new()).is_empty());
    }
}
