//! Subprocess-backed command runner.
//!
//! Output is read on two threads so a chatty provisioning tool can never
//! dead-lock on a full pipe, and each line can be echoed as it arrives.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Process runner options.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
    /// CI mode (timestamped, stream-tagged output lines)
    pub ci_mode: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl RunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn ci_mode(mut self) -> Self {
        self.ci_mode = true;
        self
    }
}

/// Runs commands as child processes of the generator.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    options: RunnerOptions,
}

impl ProcessRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn build_command(spec: &CommandSpec) -> RunnerResult<Command> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.workdir {
            if !dir.is_dir() {
                return Err(RunnerError::InvalidWorkdir(dir.display().to_string()));
            }
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        Ok(cmd)
    }

    fn spawn_reader<R: Read + Send + 'static>(
        source: R,
        stream: LogStream,
        stream_logs: bool,
        ci_mode: bool,
    ) -> JoinHandle<String> {
        std::thread::spawn(move || {
            let reader = BufReader::new(source);
            let mut output = String::new();
            for line in reader.lines().map_while(Result::ok) {
                output.push_str(&line);
                output.push('\n');
                if !stream_logs {
                    continue;
                }
                if ci_mode {
                    println!(
                        "[{}] [{}] {}",
                        Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                        stream,
                        line
                    );
                } else {
                    match stream {
                        LogStream::Stdout => println!("{}", line),
                        LogStream::Stderr => eprintln!("{}", line),
                    }
                }
            }
            output
        })
    }

    /// Spawn, stream and wait for exit. Blocking; callers run it off the async runtime.
    fn execute(
        spec: &CommandSpec,
        run_config: &RunConfig,
        ci_mode: bool,
    ) -> RunnerResult<(Option<i32>, String, String)> {
        let mut child = Self::build_command(spec)?.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunnerError::ProgramNotFound(spec.program.clone())
            } else {
                RunnerError::SpawnFailed {
                    program: spec.program.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

        let stdout_handle = Self::spawn_reader(
            stdout,
            LogStream::Stdout,
            run_config.stream_logs,
            ci_mode,
        );
        let stderr_handle = Self::spawn_reader(
            stderr,
            LogStream::Stderr,
            run_config.stream_logs,
            ci_mode,
        );

        let status = child.wait().map_err(|e| {
            RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e))
        })?;

        let stdout_output = stdout_handle.join().unwrap_or_default();
        let stderr_output = stderr_handle.join().unwrap_or_default();

        Ok((status.code(), stdout_output, stderr_output))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, run_config: &RunConfig) -> RunnerResult<ExecutionResult> {
        info!("Running: {}", spec);
        debug!("Working directory: {:?}", spec.workdir);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", spec);
            let now = Utc::now();
            return Ok(ExecutionResult {
                exit_code: Some(0),
                stdout: format!("[DRY-RUN] Command: {}", spec),
                stderr: String::new(),
                started_at: now,
                finished_at: now,
                duration_ms: 0,
            });
        }

        let started_at = Utc::now();
        let owned_spec = spec.clone();
        let owned_config = run_config.clone();
        let ci_mode = self.options.ci_mode;
        let (exit_code, stdout, stderr) = tokio::task::spawn_blocking(move || {
            Self::execute(&owned_spec, &owned_config, ci_mode)
        })
        .await
        .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))??;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        match exit_code {
            Some(0) => info!("{} completed successfully in {}ms", spec.program, duration_ms),
            Some(code) => error!(
                "{} failed with exit code {} after {}ms",
                spec.program, code, duration_ms
            ),
            None => error!("{} was terminated by a signal after {}ms", spec.program, duration_ms),
        }

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        })
    }
}
