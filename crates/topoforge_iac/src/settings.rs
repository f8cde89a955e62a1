//! Generator settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! whatever the caller overrides field by field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use topoforge_runner::CommandSpec;

use crate::error::{IacError, IacResult};

/// Settings file picked up from the working directory when present.
pub const DEFAULT_SETTINGS_FILE: &str = "topoforge.toml";

/// Everything a generation run needs besides the provider and copy count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Topology description to read
    pub topology_path: PathBuf,
    /// Directory holding one template directory per provider
    pub templates_root: PathBuf,
    /// Parent directory of every batch root
    pub output_root: PathBuf,
    /// Apply driver copied into the batch root when it exists
    pub apply_script: PathBuf,
    /// Program and arguments run once against the batch root
    pub apply_command: Vec<String>,
    /// Maximum number of copies scaffolded at the same time
    pub parallelism: usize,
    /// Generate only; leave the batch on disk without applying
    pub skip_apply: bool,
    /// Log the apply command instead of running it
    pub dry_run: bool,
    /// YAML file extending the built-in resource catalogs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            topology_path: PathBuf::from("topology.json"),
            templates_root: PathBuf::from("."),
            output_root: PathBuf::from("../terraform-projects"),
            apply_script: PathBuf::from("run_terraform.py"),
            apply_command: default_apply_command(),
            parallelism: 4,
            skip_apply: false,
            dry_run: false,
            catalog_path: None,
        }
    }
}

fn default_apply_command() -> Vec<String> {
    ["python3", "run_terraform.py", "apply"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl GeneratorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; absent keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> IacResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IacError::Config(format!(
                "settings file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> IacResult<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_topology_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.topology_path = path.into();
        self
    }

    pub fn with_templates_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.templates_root = path.into();
        self
    }

    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = path.into();
        self
    }

    pub fn with_apply_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.apply_script = path.into();
        self
    }

    pub fn with_apply_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_skip_apply(mut self, skip: bool) -> Self {
        self.skip_apply = skip;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Parallelism clamped to at least one worker.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.max(1)
    }

    pub fn validate(&self) -> IacResult<()> {
        if self.apply_command.is_empty() {
            return Err(IacError::Config("apply_command must not be empty".to_string()));
        }
        Ok(())
    }

    /// The apply command, to be run from `batch_root`.
    pub fn apply_spec(&self, batch_root: &Path) -> IacResult<CommandSpec> {
        let (program, args) = self
            .apply_command
            .split_first()
            .ok_or_else(|| IacError::Config("apply_command must not be empty".to_string()))?;
        Ok(CommandSpec::new(program.as_str())
            .args(args.iter().cloned())
            .workdir(batch_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = GeneratorSettings::default();
        assert_eq!(settings.topology_path, PathBuf::from("topology.json"));
        assert_eq!(settings.output_root, PathBuf::from("../terraform-projects"));
        assert_eq!(settings.apply_command, vec!["python3", "run_terraform.py", "apply"]);
        assert_eq!(settings.parallelism, 4);
        assert!(!settings.skip_apply);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = GeneratorSettings::from_toml_str(
            r#"
output_root = "/srv/projects"
parallelism = 8
"#,
        )
        .unwrap();
        assert_eq!(settings.output_root, PathBuf::from("/srv/projects"));
        assert_eq!(settings.parallelism, 8);
        assert_eq!(settings.topology_path, PathBuf::from("topology.json"));
    }

    #[test]
    fn test_empty_apply_command_rejected() {
        let err = GeneratorSettings::from_toml_str("apply_command = []").unwrap_err();
        assert!(matches!(err, IacError::Config(_)));
    }

    #[test]
    fn test_unknown_type_is_toml_error() {
        let err = GeneratorSettings::from_toml_str("parallelism = \"many\"").unwrap_err();
        assert!(matches!(err, IacError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        std::fs::write(&path, "dry_run = true\ncatalog_path = \"catalog.yaml\"\n").unwrap();

        let settings = GeneratorSettings::from_toml_file(&path).unwrap();
        assert!(settings.dry_run);
        assert_eq!(settings.catalog_path, Some(PathBuf::from("catalog.yaml")));

        assert!(GeneratorSettings::from_toml_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_apply_spec() {
        let spec = GeneratorSettings::default()
            .apply_spec(Path::new("/tmp/aws_20240101_120000"))
            .unwrap();
        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args, vec!["run_terraform.py", "apply"]);
        assert_eq!(spec.workdir, Some(PathBuf::from("/tmp/aws_20240101_120000")));
    }

    #[test]
    fn test_parallelism_floor() {
        assert_eq!(GeneratorSettings::new().with_parallelism(0).effective_parallelism(), 1);
    }
}
