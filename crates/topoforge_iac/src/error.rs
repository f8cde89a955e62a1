//! Error types for IaC generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while generating or applying projects.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Topology error: {0}")]
    Topology(#[from] topoforge_topology::TopologyError),

    #[error("Resource resolution failed with {} message(s)", .0.len())]
    ResolutionFailed(Vec<String>),

    #[error("Template directory not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Scaffold generation failed: {0}")]
    ScaffoldFailed(String),

    #[error("No project copy could be scaffolded ({0} attempted)")]
    NoCopiesScaffolded(usize),

    #[error("Terraform apply failed{}", exit_code_suffix(.exit_code))]
    ApplyFailed {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Runner error: {0}")]
    Runner(#[from] topoforge_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn exit_code_suffix(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}
