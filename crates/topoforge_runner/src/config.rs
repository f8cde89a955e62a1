//! Command configuration types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An external command to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program to run (looked up on `PATH` unless absolute)
    pub program: String,
    /// Arguments passed verbatim
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the child process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    /// Shell-like rendering for logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('=') {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Run configuration.
///
/// Commands always run to completion; there is no timeout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Whether to echo output while the command runs
    pub stream_logs: bool,
}

impl RunConfig {
    pub fn stream(mut self) -> Self {
        self.stream_logs = true;
        self
    }

    /// Enable or disable log streaming.
    pub fn stream_logs(mut self, enabled: bool) -> Self {
        self.stream_logs = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder() {
        let spec = CommandSpec::new("python3")
            .args(["run_terraform.py", "apply"])
            .workdir("/tmp/batch")
            .env("TF_IN_AUTOMATION", "1");

        assert_eq!(spec.args, vec!["run_terraform.py", "apply"]);
        assert_eq!(spec.workdir, Some(PathBuf::from("/tmp/batch")));
        assert_eq!(spec.env.get("TF_IN_AUTOMATION"), Some(&"1".to_string()));
        assert_eq!(spec.to_string(), "python3 run_terraform.py apply");
    }

    #[test]
    fn test_display_quotes_arguments() {
        let spec = CommandSpec::new("terraform").arg("-var=region=us-east-1").arg("my dir");
        assert_eq!(spec.to_string(), "terraform '-var=region=us-east-1' 'my dir'");
    }

    #[test]
    fn test_run_config_streaming() {
        assert!(!RunConfig::default().stream_logs);
        assert!(RunConfig::default().stream().stream_logs);
        assert!(!RunConfig::default().stream().stream_logs(false).stream_logs);
    }
}
