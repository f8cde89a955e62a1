//! Validate command - Check a topology and show resolved resources.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::info;

use topoforge_iac::{Generator, Provider};
use topoforge_topology::TopologyValidator;

use super::{load_settings, parse_provider};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Target provider: aws or openstack (case-insensitive)
    #[arg(value_parser = parse_provider)]
    pub provider: Provider,

    /// Topology file
    #[arg(long, env = "TOPOFORGE_TOPOLOGY", value_name = "PATH")]
    pub topology: Option<PathBuf>,

    /// YAML file extending the built-in image and size catalogs
    #[arg(long, env = "TOPOFORGE_CATALOG", value_name = "FILE")]
    pub catalog: Option<PathBuf>,
}

pub async fn execute(args: ValidateArgs, config: Option<&Path>) -> Result<()> {
    let mut settings = load_settings(config)?;
    if let Some(path) = args.topology {
        settings.topology_path = path;
    }
    if let Some(catalog) = args.catalog {
        settings.catalog_path = Some(catalog);
    }

    info!("Validating {:?} for {}", settings.topology_path, args.provider);
    println!("📋 Validating {}...", settings.topology_path.display());

    let result = TopologyValidator::validate_file(&settings.topology_path, args.provider.as_str())?;
    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }
    if !result.valid {
        println!("   ❌ Topology validation failed:");
        for error in &result.errors {
            println!("      - {}", error);
        }
    }
    result.into_result()?;
    println!("   ✅ Topology is valid");

    println!("🔎 Resolving resources for {}...", args.provider);
    let generator = Generator::without_runner(settings)?;
    let resolved = generator.resolve(args.provider)?;

    for message in &resolved.messages {
        println!("   ⚠️  {}", message);
    }
    for (name, instance) in resolved.resolved.iter() {
        println!("   {:<24} image={:<28} size={}", name, instance.image, instance.size);
    }
    println!("   ✅ {} instance(s) resolved", resolved.resolved.len());

    Ok(())
}
