//! Error types for the topology module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while loading or validating a topology.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Topology file not found: {0}")]
    NotFound(PathBuf),

    #[error("Topology validation failed with {} violation(s)", .0.len())]
    Invalid(Vec<String>),

    #[error("Invalid CIDR block '{value}': {message}")]
    InvalidCidr { value: String, message: String },

    #[error("Schema compilation failed: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TopologyError {
    /// Violations carried by a validation failure, empty for other errors.
    pub fn violations(&self) -> &[String] {
        match self {
            TopologyError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}
