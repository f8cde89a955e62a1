//! # topoforge_iac
//!
//! Terraform project generation and apply orchestration for topoforge.
//!
//! This crate turns a validated topology into N independently named Terraform
//! projects for one provider, then drives the external apply step once over
//! the whole batch.
//!
//! ## Features
//!
//! - Provider backends for AWS and OpenStack behind one capability trait
//! - Catalog-backed resource resolution (soft fallback on AWS, strict on OpenStack)
//! - Deterministic `main.tf` rendering with networking ahead of compute
//! - Bounded-parallel scaffolding that removes only the copies it broke
//! - A single apply run whose exit status becomes the run's outcome
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use topoforge_iac::{Generator, GeneratorSettings, Provider};
//! use topoforge_runner::{ProcessRunner, RunnerOptions};
//!
//! # async fn example() -> topoforge_iac::IacResult<()> {
//! let settings = GeneratorSettings::default().with_parallelism(2);
//! let runner = Arc::new(ProcessRunner::new(RunnerOptions::default()));
//! let generator = Generator::new(settings, runner)?;
//!
//! let report = generator.run(Provider::Aws, 3).await?;
//! println!("Batch root: {}", report.batch_root().display());
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod batch;
pub mod catalog;
pub mod error;
pub mod generator;
pub mod hcl;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod scaffold;
pub mod settings;
pub mod templates;

pub use apply::{ApplyCoordinator, ApplyOutcome};
pub use batch::{
    create_batch_root, BatchGenerator, BatchReport, CopyOutcome, CopyStatus, ProjectCopy, MAX_COPIES,
};
pub use catalog::{CatalogFile, ResourceCatalog, SizeEntry};
pub use error::{IacError, IacResult};
pub use generator::{GenerationReport, Generator, ResolvedTopology};
pub use provider::{AwsBackend, OpenStackBackend, Provider, ProviderBackend, ProviderRegistry};
pub use render::{ConfigRenderer, Section};
pub use resolver::{
    CatalogResolver, RequestDefaults, Resolution, ResolutionPolicy, ResolvedEntry, ResolvedInstance,
    ResolvedMap, ResourceResolver,
};
pub use scaffold::{ProjectScaffolder, CONFIG_FILE, TOPOLOGY_FILE};
pub use settings::{GeneratorSettings, DEFAULT_SETTINGS_FILE};
