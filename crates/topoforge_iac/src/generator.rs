//! The generation pipeline.
//!
//! Load and validate the topology, resolve resource requests, scaffold the
//! copies of one batch, then apply the batch once.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use topoforge_runner::CommandRunner;
use topoforge_topology::{Suffix, Topology, TopologyLoader};

use crate::apply::{ApplyCoordinator, ApplyOutcome};
use crate::batch::{create_batch_root, BatchGenerator, BatchReport, MAX_COPIES};
use crate::error::{IacError, IacResult};
use crate::provider::{Provider, ProviderBackend, ProviderRegistry};
use crate::resolver::ResolvedMap;
use crate::scaffold::ProjectScaffolder;
use crate::settings::GeneratorSettings;

/// A validated topology with its resource requests resolved.
#[derive(Debug, Clone)]
pub struct ResolvedTopology {
    pub provider: Provider,
    pub topology: Topology,
    pub resolved: ResolvedMap,
    /// Fallbacks and other notes from the resolver
    pub messages: Vec<String>,
}

/// Summary of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub batch: BatchReport,
    pub resolution_messages: Vec<String>,
    #[serde(skip)]
    pub apply: Option<ApplyOutcome>,
}

impl GenerationReport {
    pub fn batch_root(&self) -> &Path {
        &self.batch.root
    }
}

/// Drives a full generation run for one provider.
pub struct Generator {
    settings: GeneratorSettings,
    registry: ProviderRegistry,
    runner: Option<Arc<dyn CommandRunner>>,
    suffixes: Option<Vec<Suffix>>,
}

impl Generator {
    /// Build a generator; the catalog file from `settings`, if any, extends
    /// the built-in catalogs.
    pub fn new(settings: GeneratorSettings, runner: Arc<dyn CommandRunner>) -> IacResult<Self> {
        let mut generator = Self::without_runner(settings)?;
        generator.runner = Some(runner);
        Ok(generator)
    }

    /// Build a generator that can resolve and scaffold but not apply.
    pub fn without_runner(settings: GeneratorSettings) -> IacResult<Self> {
        settings.validate()?;
        let registry = match &settings.catalog_path {
            Some(path) => ProviderRegistry::with_catalog_file(path)?,
            None => ProviderRegistry::with_defaults(),
        };
        Ok(Self {
            settings,
            registry,
            runner: None,
            suffixes: None,
        })
    }

    /// Use these suffixes, one per copy, instead of drawing random ones.
    pub fn with_suffixes(mut self, suffixes: Vec<Suffix>) -> Self {
        self.suffixes = Some(suffixes);
        self
    }

    /// Replace the provider registry.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    fn backend(&self, provider: Provider) -> IacResult<Arc<dyn ProviderBackend>> {
        self.registry.get_required(provider)
    }

    /// Validate, load and resolve the configured topology.
    ///
    /// Nothing is written. Validation and resolution failures report every
    /// problem found.
    pub fn resolve(&self, provider: Provider) -> IacResult<ResolvedTopology> {
        let backend = self.backend(provider)?;

        info!("Loading topology from {:?}", self.settings.topology_path);
        let topology = TopologyLoader::load(&self.settings.topology_path, provider.as_str())?;

        let resolution = backend.resolver().resolve(&topology);
        let messages = resolution.messages.clone();
        let resolved = resolution.into_map()?;
        info!("Resolved {} instance(s) for {}", resolved.len(), provider);

        Ok(ResolvedTopology {
            provider,
            topology,
            resolved,
            messages,
        })
    }

    /// Resolve and scaffold `copies` copies without applying.
    ///
    /// Fails with [`IacError::NoCopiesScaffolded`] when every copy failed.
    pub async fn generate(&self, provider: Provider, copies: usize) -> IacResult<GenerationReport> {
        if copies == 0 {
            return Err(IacError::Config("number of copies must be positive".to_string()));
        }
        if copies > MAX_COPIES {
            return Err(IacError::Config(format!(
                "at most {} copies per batch, {} requested",
                MAX_COPIES, copies
            )));
        }
        if let Some(suffixes) = &self.suffixes {
            if suffixes.len() != copies {
                return Err(IacError::Config(format!(
                    "{} suffixes given for {} copies",
                    suffixes.len(),
                    copies
                )));
            }
        }

        let backend = self.backend(provider)?;
        let template_dir = backend.template_dir(&self.settings.templates_root);
        if !template_dir.is_dir() {
            return Err(IacError::TemplateNotFound(template_dir));
        }

        let ResolvedTopology {
            topology,
            resolved,
            messages,
            ..
        } = self.resolve(provider)?;

        let batch_root = create_batch_root(
            &self.settings.output_root,
            provider,
            Some(self.settings.apply_script.as_path()),
        )?;

        let generator = BatchGenerator::new(backend, ProjectScaffolder::new(template_dir))
            .with_parallelism(self.settings.effective_parallelism());
        let plan = match &self.suffixes {
            Some(suffixes) => generator.plan_with_suffixes(&batch_root, suffixes.clone()),
            None => generator.plan(&batch_root, copies)?,
        };
        let batch = generator
            .generate(Arc::new(topology), Arc::new(resolved), &batch_root, plan)
            .await?
            .require_survivors()?;

        info!(
            "Scaffolded {} of {} copies under {:?}",
            batch.success_count(),
            copies,
            batch.root
        );

        Ok(GenerationReport {
            batch,
            resolution_messages: messages,
            apply: None,
        })
    }

    /// Apply a generated batch, unless applying is switched off.
    pub async fn apply(&self, report: &mut GenerationReport) -> IacResult<()> {
        if self.settings.skip_apply {
            warn!("Skipping apply; batch left at {:?}", report.batch.root);
            return Ok(());
        }
        let runner = self
            .runner
            .clone()
            .ok_or_else(|| IacError::Config("no command runner to apply with".to_string()))?;
        let coordinator = ApplyCoordinator::new(runner, &self.settings);
        report.apply = Some(coordinator.apply(&report.batch.root).await?);
        Ok(())
    }

    /// Generate and apply in one go.
    pub async fn run(&self, provider: Provider, copies: usize) -> IacResult<GenerationReport> {
        let mut report = self.generate(provider, copies).await?;
        self.apply(&mut report).await?;
        Ok(report)
    }
}
