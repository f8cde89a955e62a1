//! # topoforge_runner
//!
//! External process execution for topoforge.
//!
//! The provisioning tool is never linked in; it is driven as a child process
//! whose exit status is the only thing the generator interprets.
//!
//! # Features
//!
//! - **Process Runner**: spawns the command, streams its output line by line
//! - **Dry-Run Mode**: log the command without executing it
//! - **CI Integration**: timestamped log lines when `CI` is set
//! - **Mock Runner**: scripted responses and captured calls for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use topoforge_runner::{CommandRunner, CommandSpec, ProcessRunner, RunConfig, RunnerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new(RunnerOptions::default());
//!     let spec = CommandSpec::new("python3")
//!         .args(["run_terraform.py", "apply"])
//!         .workdir("../terraform-projects/aws_20240101_120000");
//!
//!     let result = runner.run(&spec, &RunConfig::default().stream()).await?;
//!     println!("Exit code: {:?}", result.exit_code);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{CommandSpec, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::{LogStream, ProcessRunner, RunnerOptions};
pub use runner::{CommandRunner, ExecutionResult};
