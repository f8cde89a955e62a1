//! Mock command runner for testing.
//!
//! Provides a configurable implementation of the CommandRunner trait so the
//! apply step can be exercised without a provisioning tool installed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined mock response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }

    /// A process killed by a signal (no exit code).
    pub fn killed() -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

/// Mock command runner for testing.
///
/// Captures all calls and returns predefined responses in order, wrapping
/// around when the list is exhausted.
#[derive(Clone)]
pub struct MockRunner {
    responses: Arc<RwLock<Vec<MockResponse>>>,
    response_index: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a mock response for the next run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every run call fail to spawn.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn record_call(&self, method: &str, spec: &CommandSpec) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            program: spec.program.clone(),
            args: spec.args.clone(),
            workdir: spec.workdir.clone(),
            env: spec.env.clone(),
        });
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec, _run_config: &RunConfig) -> RunnerResult<ExecutionResult> {
        self.record_call("run", spec);

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(RunnerError::SpawnFailed {
                program: spec.program.clone(),
                message,
            });
        }

        let response = self.next_response();
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_basic() {
        let runner = MockRunner::new().add_response(MockResponse::success("Apply complete!"));
        let spec = CommandSpec::new("python3").args(["run_terraform.py", "apply"]);

        let result = runner.run(&spec, &RunConfig::default()).await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "Apply complete!");
    }

    #[tokio::test]
    async fn test_mock_runner_captures_calls() {
        let runner = MockRunner::new();
        let spec = CommandSpec::new("terraform")
            .arg("apply")
            .workdir("/tmp/batch")
            .env("TF_INPUT", "0");

        let _ = runner.run(&spec, &RunConfig::default()).await;

        let calls = runner.get_method_calls("run");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "terraform");
        assert_eq!(calls[0].args, vec!["apply".to_string()]);
        assert_eq!(calls[0].workdir, Some(PathBuf::from("/tmp/batch")));
        assert_eq!(calls[0].env.get("TF_INPUT"), Some(&"0".to_string()));
    }

    #[tokio::test]
    async fn test_mock_runner_multiple_responses() {
        let runner = MockRunner::new().with_responses(vec![
            MockResponse::success("first"),
            MockResponse::failure(2, "second failed"),
            MockResponse::killed(),
        ]);
        let spec = CommandSpec::new("terraform");

        let r1 = runner.run(&spec, &RunConfig::default()).await.unwrap();
        assert_eq!(r1.stdout, "first");

        let r2 = runner.run(&spec, &RunConfig::default()).await.unwrap();
        assert_eq!(r2.exit_code, Some(2));
        assert_eq!(r2.stderr, "second failed");

        let r3 = runner.run(&spec, &RunConfig::default()).await.unwrap();
        assert_eq!(r3.exit_code, None);
        assert_eq!(runner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_runner_failure_simulation() {
        let runner = MockRunner::new().simulate_failure("no such file");
        let result = runner.run(&CommandSpec::new("terraform"), &RunConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::SpawnFailed { .. })));
    }
}
