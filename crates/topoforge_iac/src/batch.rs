//! Batch generation: N renamed copies of one topology under a timestamped root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use topoforge_topology::{rename, Suffix, SuffixGenerator, Topology};

use crate::error::{IacError, IacResult};
use crate::provider::{Provider, ProviderBackend};
use crate::render::ConfigRenderer;
use crate::resolver::ResolvedMap;
use crate::scaffold::ProjectScaffolder;

/// Timestamp format used in batch root names.
pub const BATCH_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Upper bound on copies in one batch, far below the suffix space.
pub const MAX_COPIES: usize = 10_000;

/// Create a fresh batch root `<output_root>/<provider>_<timestamp>`.
///
/// A run started within the same second gets `_2`, `_3`, ... appended so an
/// existing batch is never reused. When `apply_script` exists it is copied in.
pub fn create_batch_root(
    output_root: &Path,
    provider: Provider,
    apply_script: Option<&Path>,
) -> IacResult<PathBuf> {
    fs::create_dir_all(output_root)?;

    let base = format!("{}_{}", provider, Local::now().format(BATCH_TIMESTAMP_FORMAT));
    let mut attempt = 1;
    let root = loop {
        let name = if attempt == 1 {
            base.clone()
        } else {
            format!("{}_{}", base, attempt)
        };
        let candidate = output_root.join(name);
        match fs::create_dir(&candidate) {
            Ok(()) => break candidate,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    };
    info!("Batch root: {:?}", root);

    if let Some(script) = apply_script {
        if script.is_file() {
            let file_name = script
                .file_name()
                .ok_or_else(|| IacError::Config(format!("invalid apply script: {:?}", script)))?;
            fs::copy(script, root.join(file_name))?;
            debug!("Copied apply script {:?}", script);
        } else {
            debug!("Apply script {:?} not present, skipping", script);
        }
    }

    Ok(root)
}

/// One planned copy of the topology.
#[derive(Debug, Clone)]
pub struct ProjectCopy {
    /// Zero-based position in the batch
    pub index: usize,
    pub suffix: Suffix,
    /// `<batch_root>/<provider>_<suffix>`
    pub path: PathBuf,
}

impl ProjectCopy {
    pub fn new(index: usize, suffix: Suffix, batch_root: &Path, provider: Provider) -> Self {
        let path = batch_root.join(format!("{}_{}", provider, suffix));
        Self {
            index,
            suffix,
            path,
        }
    }
}

/// Result of one copy's scaffolding attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CopyStatus {
    Created,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyOutcome {
    pub index: usize,
    pub suffix: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: CopyStatus,
}

impl CopyOutcome {
    pub fn is_created(&self) -> bool {
        self.status == CopyStatus::Created
    }
}

/// Outcomes of a whole batch, ordered by copy index.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub provider: Provider,
    pub root: PathBuf,
    pub requested: usize,
    pub outcomes: Vec<CopyOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes.iter().filter(|o| o.is_created())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes.iter().filter(|o| !o.is_created())
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Directories of the copies that were written.
    pub fn surviving_paths(&self) -> Vec<PathBuf> {
        self.succeeded().map(|o| o.path.clone()).collect()
    }

    pub fn all_failed(&self) -> bool {
        self.success_count() == 0
    }

    /// Fail when no copy survived, otherwise hand the report back.
    pub fn require_survivors(self) -> IacResult<Self> {
        if self.all_failed() {
            return Err(IacError::NoCopiesScaffolded(self.requested));
        }
        Ok(self)
    }
}

/// Renames, renders and scaffolds the copies of one batch.
pub struct BatchGenerator {
    backend: Arc<dyn ProviderBackend>,
    scaffolder: ProjectScaffolder,
    parallelism: usize,
}

impl BatchGenerator {
    pub fn new(backend: Arc<dyn ProviderBackend>, scaffolder: ProjectScaffolder) -> Self {
        Self {
            backend,
            scaffolder,
            parallelism: 1,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Plan `copies` copies with batch-unique suffixes.
    pub fn plan(&self, batch_root: &Path, copies: usize) -> IacResult<Vec<ProjectCopy>> {
        if copies > MAX_COPIES {
            return Err(IacError::Config(format!(
                "at most {} copies per batch, {} requested",
                MAX_COPIES, copies
            )));
        }
        let mut generator = SuffixGenerator::new();
        let mut suffixes = Vec::with_capacity(copies);
        for _ in 0..copies {
            let suffix = generator.next_suffix().ok_or_else(|| {
                IacError::Config("no unused name suffix left for this batch".to_string())
            })?;
            suffixes.push(suffix);
        }
        Ok(self.plan_with_suffixes(batch_root, suffixes))
    }

    /// Plan one copy per given suffix, in order.
    ///
    /// Suffixes are taken as is. A repeated suffix maps to a destination that
    /// already exists, so that copy fails and the earlier one is kept.
    pub fn plan_with_suffixes(&self, batch_root: &Path, suffixes: Vec<Suffix>) -> Vec<ProjectCopy> {
        suffixes
            .into_iter()
            .enumerate()
            .map(|(index, suffix)| ProjectCopy::new(index, suffix, batch_root, self.backend.provider()))
            .collect()
    }

    /// Scaffold every planned copy.
    ///
    /// A failed copy never aborts the others. The call returns only after
    /// every attempt has finished.
    pub async fn generate(
        &self,
        topology: Arc<Topology>,
        resolved: Arc<ResolvedMap>,
        batch_root: &Path,
        plan: Vec<ProjectCopy>,
    ) -> IacResult<BatchReport> {
        let requested = plan.len();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut handles = Vec::with_capacity(requested);

        for copy in plan {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| IacError::ScaffoldFailed(format!("Semaphore error: {}", e)))?;

            let backend = self.backend.clone();
            let scaffolder = self.scaffolder.clone();
            let topology = topology.clone();
            let resolved = resolved.clone();
            let planned = copy.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let result = scaffold_copy(backend.as_ref(), &scaffolder, &topology, &resolved, &copy);
                drop(permit);
                result
            });
            handles.push((planned, handle));
        }

        let mut outcomes = Vec::with_capacity(requested);
        for (copy, handle) in handles {
            let status = match handle.await {
                Ok(Ok(())) => CopyStatus::Created,
                Ok(Err(e)) => {
                    error!("Error creating copy {}: {}", copy.index + 1, e);
                    CopyStatus::Failed(e.to_string())
                }
                Err(e) => {
                    error!("Copy {} task failed: {}", copy.index + 1, e);
                    CopyStatus::Failed(format!("task failed: {}", e))
                }
            };
            outcomes.push(CopyOutcome {
                index: copy.index,
                suffix: copy.suffix.to_string(),
                path: copy.path,
                status,
            });
        }

        let report = BatchReport {
            provider: self.backend.provider(),
            root: batch_root.to_path_buf(),
            requested,
            outcomes,
        };
        if report.failure_count() > 0 {
            warn!(
                "{} of {} copies failed to scaffold",
                report.failure_count(),
                requested
            );
        }
        Ok(report)
    }
}

/// Rename, render and write a single copy.
fn scaffold_copy(
    backend: &dyn ProviderBackend,
    scaffolder: &ProjectScaffolder,
    topology: &Topology,
    resolved: &ResolvedMap,
    copy: &ProjectCopy,
) -> IacResult<()> {
    let renamed = rename(topology, &copy.suffix);
    let config = ConfigRenderer::render(backend, &resolved.for_suffix(&copy.suffix));
    scaffolder.scaffold(&renamed, &config, &copy.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::AwsBackend;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn generator(template: &Path) -> BatchGenerator {
        BatchGenerator::new(
            Arc::new(AwsBackend::default()),
            ProjectScaffolder::new(template),
        )
        .with_parallelism(2)
    }

    #[test]
    fn test_batch_root_name_and_script() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("run_terraform.py");
        fs::write(&script, "print('apply')\n").unwrap();

        let root = create_batch_root(&dir.path().join("out"), Provider::Aws, Some(&script)).unwrap();
        let name = root.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("aws_"));
        assert_eq!(name.len(), "aws_".len() + "20240101_120000".len());
        assert!(root.join("run_terraform.py").exists());
    }

    #[test]
    fn test_batch_roots_never_collide() {
        let dir = tempdir().unwrap();
        let first = create_batch_root(dir.path(), Provider::OpenStack, None).unwrap();
        let second = create_batch_root(dir.path(), Provider::OpenStack, None).unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }

    #[test]
    fn test_missing_script_is_skipped() {
        let dir = tempdir().unwrap();
        let root = create_batch_root(dir.path(), Provider::Aws, Some(&dir.path().join("nope.py")))
            .unwrap();
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_plan_has_unique_suffixes() {
        let dir = tempdir().unwrap();
        let plan = generator(dir.path()).plan(dir.path(), 20).unwrap();
        let suffixes: HashSet<_> = plan.iter().map(|c| c.suffix.to_string()).collect();
        assert_eq!(suffixes.len(), 20);
        assert!(plan[0]
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("aws_"));
    }

    #[test]
    fn test_plan_rejects_oversized_batch() {
        let dir = tempdir().unwrap();
        let generator = generator(dir.path());
        assert_eq!(generator.plan(dir.path(), MAX_COPIES).unwrap().len(), MAX_COPIES);
        assert!(matches!(
            generator.plan(dir.path(), MAX_COPIES + 1),
            Err(IacError::Config(_))
        ));
    }

    #[test]
    fn test_plan_with_suffixes_keeps_order() {
        let dir = tempdir().unwrap();
        let plan = generator(dir.path())
            .plan_with_suffixes(dir.path(), vec![Suffix::new("ab12cd"), Suffix::new("ef34gh")]);
        assert_eq!(plan[1].index, 1);
        assert_eq!(plan[1].path, dir.path().join("aws_ef34gh"));
    }

    #[tokio::test]
    async fn test_generate_reports_in_index_order() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("aws");
        fs::create_dir_all(&template).unwrap();
        let root = dir.path().join("batch");
        fs::create_dir_all(&root).unwrap();

        let generator = generator(&template);
        let plan = generator.plan(&root, 5).unwrap();
        let report = generator
            .generate(
                Arc::new(Topology::new()),
                Arc::new(ResolvedMap::new()),
                &root,
                plan,
            )
            .await
            .unwrap();

        let indices: Vec<_> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(report.success_count(), 5);
        assert!(report.require_survivors().is_ok());
    }

    #[tokio::test]
    async fn test_all_failed() {
        let dir = tempdir().unwrap();
        let generator = generator(&dir.path().join("missing-template"));
        let plan = generator.plan(dir.path(), 3).unwrap();
        let report = generator
            .generate(
                Arc::new(Topology::new()),
                Arc::new(ResolvedMap::new()),
                dir.path(),
                plan,
            )
            .await
            .unwrap();

        assert!(report.all_failed());
        assert!(matches!(
            report.require_survivors(),
            Err(IacError::NoCopiesScaffolded(3))
        ));
    }
}
