//! Project scaffolding for one copy.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use topoforge_topology::Topology;

use crate::error::{IacError, IacResult};

/// File name of the per-copy topology artifact.
pub const TOPOLOGY_FILE: &str = "topology.json";

/// File name of the per-copy configuration artifact.
pub const CONFIG_FILE: &str = "main.tf";

/// Writes one project copy from a provider template directory.
#[derive(Debug, Clone)]
pub struct ProjectScaffolder {
    template_dir: PathBuf,
}

impl ProjectScaffolder {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Scaffold a copy at `dest`.
    ///
    /// `dest` must not exist. If anything fails after `dest` was created, the
    /// whole directory is removed before the error is returned.
    pub fn scaffold(&self, topology: &Topology, config: &str, dest: &Path) -> IacResult<()> {
        if !self.template_dir.is_dir() {
            return Err(IacError::TemplateNotFound(self.template_dir.clone()));
        }

        match fs::create_dir(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(IacError::DestinationExists(dest.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        match self.populate(topology, config, dest) {
            Ok(()) => {
                info!("Successfully created: {:?}", dest);
                Ok(())
            }
            Err(e) => {
                warn!("Error creating {:?}: {}", dest, e);
                if let Err(cleanup) = fs::remove_dir_all(dest) {
                    warn!("Failed to remove partial copy {:?}: {}", dest, cleanup);
                }
                Err(e)
            }
        }
    }

    fn populate(&self, topology: &Topology, config: &str, dest: &Path) -> IacResult<()> {
        self.copy_template(dest)?;

        let topology_json = serde_json::to_string_pretty(topology)?;
        fs::write(dest.join(TOPOLOGY_FILE), topology_json)?;
        fs::write(dest.join(CONFIG_FILE), config)?;
        Ok(())
    }

    /// Copy the template tree into the already-created `dest`.
    fn copy_template(&self, dest: &Path) -> IacResult<()> {
        for entry in WalkDir::new(&self.template_dir).min_depth(1) {
            let entry = entry.map_err(|e| IacError::ScaffoldFailed(e.to_string()))?;
            let source = entry.path();
            let relative = source
                .strip_prefix(&self.template_dir)
                .map_err(|e| IacError::ScaffoldFailed(e.to_string()))?;
            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(source, &target)?;
                debug!("Copied: {:?}", relative);
            }
        }
        Ok(())
    }
}
