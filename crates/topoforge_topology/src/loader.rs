//! Topology loading.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{TopologyError, TopologyResult};
use crate::models::Topology;
use crate::validator::TopologyValidator;

/// Loads a topology after validating it.
pub struct TopologyLoader;

impl TopologyLoader {
    /// Validate and parse the topology file at `path` for `provider`.
    ///
    /// The file is read exactly once; the returned value is the only copy the
    /// rest of the run works from.
    pub fn load(path: impl AsRef<Path>, provider: &str) -> TopologyResult<Topology> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TopologyError::NotFound(path.to_path_buf()));
        }

        info!("Checking topology {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_str(&content, provider)
    }

    /// Validate and parse topology text.
    pub fn from_str(content: &str, provider: &str) -> TopologyResult<Topology> {
        let value: serde_json::Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                return Err(TopologyError::Invalid(vec![format!(
                    "Topology is not valid JSON: {}",
                    e
                )]))
            }
        };

        let warnings = TopologyValidator::validate_value(&value, provider).into_result()?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        let topology: Topology = serde_json::from_value(value)?;
        debug!(
            "Loaded topology: {} network(s), {} router(s), {} instance(s)",
            topology.networks.len(),
            topology.routers.len(),
            topology.instances.len()
        );
        Ok(topology)
    }
}
