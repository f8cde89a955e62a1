//! Generate command - Scaffold project copies and apply the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use topoforge_iac::{
    ApplyOutcome, CopyStatus, GenerationReport, Generator, GeneratorSettings, Provider, MAX_COPIES,
};
use topoforge_runner::{ProcessRunner, RunnerOptions};

use super::{load_settings, parse_provider};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Target provider: aws or openstack (case-insensitive)
    #[arg(value_parser = parse_provider)]
    pub provider: Provider,

    /// Number of independent copies to generate
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=MAX_COPIES as u64))]
    pub num_copies: u64,

    /// Topology file
    #[arg(long, env = "TOPOFORGE_TOPOLOGY", value_name = "PATH")]
    pub topology: Option<PathBuf>,

    /// Directory holding one template directory per provider
    #[arg(long, env = "TOPOFORGE_TEMPLATES", value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Parent directory for batch roots
    #[arg(long, env = "TOPOFORGE_OUTPUT", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Maximum number of copies scaffolded concurrently
    #[arg(long, env = "TOPOFORGE_PARALLELISM", value_parser = clap::value_parser!(u64).range(1..))]
    pub parallelism: Option<u64>,

    /// Generate the batch but do not run the apply step
    #[arg(long, env = "TOPOFORGE_NO_APPLY")]
    pub no_apply: bool,

    /// Print the apply command instead of running it
    #[arg(long, env = "TOPOFORGE_DRY_RUN")]
    pub dry_run: bool,

    /// YAML file extending the built-in image and size catalogs
    #[arg(long, env = "TOPOFORGE_CATALOG", value_name = "FILE")]
    pub catalog: Option<PathBuf>,
}

impl GenerateArgs {
    /// Layer command-line values over file settings.
    pub fn apply_to(&self, mut settings: GeneratorSettings) -> GeneratorSettings {
        if let Some(path) = &self.topology {
            settings.topology_path = path.clone();
        }
        if let Some(dir) = &self.templates {
            settings.templates_root = dir.clone();
        }
        if let Some(dir) = &self.output {
            settings.output_root = dir.clone();
        }
        if let Some(parallelism) = self.parallelism {
            settings.parallelism = parallelism as usize;
        }
        if let Some(catalog) = &self.catalog {
            settings.catalog_path = Some(catalog.clone());
        }
        settings.skip_apply |= self.no_apply;
        settings.dry_run |= self.dry_run;
        settings
    }
}

pub async fn execute(args: GenerateArgs, config: Option<&Path>) -> Result<()> {
    let settings = args.apply_to(load_settings(config)?);
    let copies = args.num_copies as usize;

    info!("Generating {} copies for {}", copies, args.provider);
    println!(
        "🚀 Generating {} project cop{} for {}",
        copies,
        if copies == 1 { "y" } else { "ies" },
        args.provider
    );

    let runner = Arc::new(ProcessRunner::new(RunnerOptions::default()));
    let generator = Generator::new(settings, runner)?;

    let mut report = generator.generate(args.provider, copies).await?;
    print_report(&report);

    if generator.settings().skip_apply {
        println!("⏭️  Apply skipped; batch left at {}", report.batch_root().display());
        return Ok(());
    }

    println!("🔧 Applying batch {}", report.batch_root().display());
    generator.apply(&mut report).await?;

    match &report.apply {
        Some(ApplyOutcome::Planned(command)) => {
            println!("📝 [DRY RUN] Would run in {}: {}", report.batch_root().display(), command)
        }
        Some(ApplyOutcome::Applied { .. }) | None => println!("✅ Apply completed"),
    }
    Ok(())
}

fn print_report(report: &GenerationReport) {
    for message in &report.resolution_messages {
        println!("   ⚠️  {}", message);
    }
    for outcome in &report.batch.outcomes {
        match &outcome.status {
            CopyStatus::Created => println!("   ✅ Successfully created: {}", outcome.path.display()),
            CopyStatus::Failed(reason) => eprintln!(
                "   ❌ Error creating copy {} ({}): {}",
                outcome.index + 1,
                outcome.suffix,
                reason
            ),
        }
    }
    println!(
        "📦 {} of {} copies written to {}",
        report.batch.success_count(),
        report.batch.requested,
        report.batch_root().display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> GenerateArgs {
        let mut argv = vec!["topoforge", "generate"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Generate(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_settings() {
        let args = parse(&[
            "aws",
            "2",
            "--topology",
            "t.json",
            "--output",
            "/srv/out",
            "--parallelism",
            "8",
            "--no-apply",
            "--catalog",
            "catalog.yaml",
        ]);
        let base = GeneratorSettings::default().with_templates_root("/srv/templates");
        let settings = args.apply_to(base);

        assert_eq!(settings.topology_path, PathBuf::from("t.json"));
        assert_eq!(settings.templates_root, PathBuf::from("/srv/templates"));
        assert_eq!(settings.output_root, PathBuf::from("/srv/out"));
        assert_eq!(settings.parallelism, 8);
        assert!(settings.skip_apply);
        assert!(!settings.dry_run);
        assert_eq!(settings.catalog_path, Some(PathBuf::from("catalog.yaml")));
    }

    #[test]
    fn test_copy_count_is_capped() {
        assert_eq!(parse(&["aws", "10000"]).num_copies, MAX_COPIES as u64);
        let too_many = (MAX_COPIES + 1).to_string();
        assert!(Cli::try_parse_from(["topoforge", "generate", "aws", too_many.as_str()]).is_err());
    }

    #[test]
    fn test_file_settings_survive_absent_flags() {
        let args = parse(&["openstack"]);
        let base = GeneratorSettings::default().with_dry_run(true).with_parallelism(2);
        let settings = args.apply_to(base);
        assert!(settings.dry_run);
        assert_eq!(settings.parallelism, 2);
    }
}
