//! Apply coordination: one external provisioning run per batch.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use topoforge_runner::{CommandRunner, ExecutionResult, RunConfig};

use crate::error::{IacError, IacResult};
use crate::settings::GeneratorSettings;

/// What the apply step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { duration_ms: u64 },
    /// Dry run: the command was logged, not executed.
    Planned(String),
}

/// Runs the provisioning tool against a batch root.
pub struct ApplyCoordinator {
    runner: Arc<dyn CommandRunner>,
    settings: GeneratorSettings,
}

impl ApplyCoordinator {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: &GeneratorSettings) -> Self {
        Self {
            runner,
            settings: settings.clone(),
        }
    }

    /// Apply the whole batch once.
    ///
    /// Output streams as it arrives and no timeout is imposed. A non-zero
    /// exit is returned as [`IacError::ApplyFailed`]; nothing is retried and
    /// nothing already provisioned is rolled back.
    pub async fn apply(&self, batch_root: &Path) -> IacResult<ApplyOutcome> {
        let spec = self.settings.apply_spec(batch_root)?;

        if self.settings.dry_run {
            info!("[DRY RUN] Would execute in {:?}: {}", batch_root, spec);
            return Ok(ApplyOutcome::Planned(spec.to_string()));
        }

        info!("Running apply in {:?}: {}", batch_root, spec);
        let result = self.runner.run(&spec, &RunConfig::default().stream()).await?;
        Self::check(result)
    }

    fn check(result: ExecutionResult) -> IacResult<ApplyOutcome> {
        if result.success() {
            info!("Apply finished in {} ms", result.duration_ms);
            return Ok(ApplyOutcome::Applied {
                duration_ms: result.duration_ms,
            });
        }
        error!("Apply failed with exit code {:?}", result.exit_code);
        Err(IacError::ApplyFailed {
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use topoforge_runner::{MockResponse, MockRunner};

    #[tokio::test]
    async fn test_apply_runs_once_in_batch_root() {
        let runner = Arc::new(MockRunner::new().add_response(MockResponse::success("Apply complete!")));
        let coordinator = ApplyCoordinator::new(runner.clone(), &GeneratorSettings::default());

        let outcome = coordinator.apply(Path::new("/tmp/aws_20240101_120000")).await.unwrap();
        assert!(matches!(outcome, ApplyOutcome::Applied { .. }));

        let calls = runner.get_method_calls("run");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "python3");
        assert_eq!(calls[0].args, vec!["run_terraform.py", "apply"]);
        assert_eq!(calls[0].workdir, Some(PathBuf::from("/tmp/aws_20240101_120000")));
    }

    #[tokio::test]
    async fn test_apply_failure_carries_exit_code() {
        let runner = Arc::new(MockRunner::new().add_response(MockResponse::failure(3, "Error: quota")));
        let coordinator = ApplyCoordinator::new(runner, &GeneratorSettings::default());

        match coordinator.apply(Path::new("/tmp/batch")).await {
            Err(IacError::ApplyFailed { exit_code, output }) => {
                assert_eq!(exit_code, Some(3));
                assert!(output.contains("quota"));
            }
            other => panic!("expected apply failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_killed_apply_has_no_exit_code() {
        let runner = Arc::new(MockRunner::new().add_response(MockResponse::killed()));
        let coordinator = ApplyCoordinator::new(runner, &GeneratorSettings::default());

        let err = coordinator.apply(Path::new("/tmp/batch")).await.unwrap_err();
        assert!(matches!(err, IacError::ApplyFailed { exit_code: None, .. }));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let runner = Arc::new(MockRunner::new());
        let settings = GeneratorSettings::default().with_dry_run(true);
        let coordinator = ApplyCoordinator::new(runner.clone(), &settings);

        let outcome = coordinator.apply(Path::new("/tmp/batch")).await.unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Planned("python3 run_terraform.py apply".to_string())
        );
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_runner_error() {
        let runner = Arc::new(MockRunner::new().simulate_failure("python3 missing"));
        let coordinator = ApplyCoordinator::new(runner, &GeneratorSettings::default());

        let err = coordinator.apply(Path::new("/tmp/batch")).await.unwrap_err();
        assert!(matches!(err, IacError::Runner(_)));
    }
}
