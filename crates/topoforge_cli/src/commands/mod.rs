//! CLI command definitions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use topoforge_iac::{GeneratorSettings, IacError, Provider, DEFAULT_SETTINGS_FILE};

pub mod generate;
pub mod validate;

/// topoforge - multi-copy Terraform project generator
#[derive(Parser, Debug)]
#[command(name = "topoforge")]
#[command(version, about = "Generate N independent Terraform projects from one topology")]
#[command(long_about = r#"
topoforge validates a topology description, resolves its CPU/RAM and image
requests to provider resources, writes N independently named Terraform
projects under one timestamped batch directory, then applies the batch once.

COMMANDS:
  generate  → Scaffold <num_copies> projects for a provider and apply them
  validate  → Check the topology and show the resolved resources

EXIT CODES:
  0   - Success
  1   - General error
  2   - Invalid arguments
  3   - Topology validation failure
  4   - Resource resolution failure
  5   - No project copy could be scaffolded
  6   - Apply failed without an exit code (otherwise the tool's own code)
  130 - Interrupted
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (defaults to ./topoforge.toml when present)
    #[arg(long, global = true, env = "TOPOFORGE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate project copies and apply them
    Generate(generate::GenerateArgs),

    /// Validate a topology and resolve its resources without writing anything
    Validate(validate::ValidateArgs),
}

/// Case-insensitive provider parser for clap.
pub fn parse_provider(value: &str) -> Result<Provider, String> {
    value.parse::<Provider>().map_err(|e: IacError| {
        let supported: Vec<_> = Provider::all().iter().map(|p| p.as_str()).collect();
        format!("{} (supported: {})", e, supported.join(", "))
    })
}

/// Settings from the explicit `--config` file, else `./topoforge.toml` if
/// present, else defaults.
pub fn load_settings(config: Option<&Path>) -> Result<GeneratorSettings> {
    match config {
        Some(path) => GeneratorSettings::from_toml_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.is_file() {
                debug!("Using settings file {}", DEFAULT_SETTINGS_FILE);
                GeneratorSettings::from_toml_file(default_path)
                    .with_context(|| format!("Failed to load settings from {}", DEFAULT_SETTINGS_FILE))
            } else {
                Ok(GeneratorSettings::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults_to_one_copy() {
        let cli = Cli::try_parse_from(["topoforge", "generate", "AWS"]).unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.provider, Provider::Aws);
                assert_eq!(args.num_copies, 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_provider_is_usage_error() {
        let err = Cli::try_parse_from(["topoforge", "generate", "gcp"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_copy_count_must_be_positive() {
        for bad in ["0", "-1", "two", "1.5"] {
            let result = Cli::try_parse_from(["topoforge", "generate", "openstack", bad]);
            assert!(result.is_err(), "{} should be rejected", bad);
        }
        let cli = Cli::try_parse_from(["topoforge", "generate", "openstack", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Generate(ref a) if a.num_copies == 3));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["topoforge", "-v", "-q", "validate", "aws"]).is_err());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_settings(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "parallelism = 9\n").unwrap();
        assert_eq!(load_settings(Some(&path)).unwrap().parallelism, 9);
    }
}
