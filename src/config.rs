//! Configuration, loadable from TOML. Every table and field is optional.
//!
//! ```toml
//! [sandbox]
//! timeout_ms = 5000
//! outer_timeout_ms = 6000
//!
//! [sandbox.safety]
//! allow_unbounded_loops = false
//!
//! [sandbox.worker]
//! isolation = "process"
//! program = "/usr/local/bin/xlesson"
//! args = ["worker"]
//!
//! [validator]
//! entry_function = "main"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use xlesson_sandbox_js::runtime::default_allowed_globals;
use xlesson_sandbox_js::{is_identifier, BoaRuntimeConfig};

use crate::error::ConfigError;
use crate::sandbox::SafetyPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XlessonConfig {
    pub sandbox: SandboxConfig,
    pub validator: ValidatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Budget for the worker itself
    pub timeout_ms: u64,
    /// Budget for the whole call, setup and teardown included
    pub outer_timeout_ms: u64,
    /// Longest accepted source, in bytes
    pub max_code_length: usize,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub prune_globals: bool,
    pub freeze_globals: bool,
    pub allowed_globals: Vec<String>,
    pub safety: SafetyPolicy,
    pub worker: WorkerConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            outer_timeout_ms: 6_000,
            max_code_length: 100_000,
            loop_iteration_limit: 10_000_000,
            recursion_limit: 400,
            prune_globals: true,
            freeze_globals: false,
            allowed_globals: default_allowed_globals(),
            safety: SafetyPolicy::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl SandboxConfig {
    pub fn inner_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn outer_timeout(&self) -> Duration {
        Duration::from_millis(self.outer_timeout_ms)
    }

    pub fn runtime_config(&self) -> BoaRuntimeConfig {
        BoaRuntimeConfig {
            loop_iteration_limit: self.loop_iteration_limit,
            recursion_limit: self.recursion_limit,
            prune_globals: self.prune_globals,
            freeze_globals: self.freeze_globals,
            allowed_globals: self.allowed_globals.clone(),
        }
    }
}

/// Where jobs run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerIsolation {
    /// A child process per job, killed when its budget runs out
    #[default]
    Process,
    /// A blocking thread in this process; a timeout can only be observed, not enforced
    InProcess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub isolation: WorkerIsolation,
    /// Worker executable. Unset means `$XLESSON_WORKER`, then an `xlesson` binary next
    /// to the current executable.
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            isolation: WorkerIsolation::Process,
            program: None,
            args: vec!["worker".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Global function each test case calls
    pub entry_function: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            entry_function: "main".to_string(),
        }
    }
}

impl XlessonConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: XlessonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sandbox = &self.sandbox;
        if sandbox.timeout_ms == 0 {
            return Err(ConfigError::Invalid("sandbox.timeout_ms must be > 0".into()));
        }
        if sandbox.outer_timeout_ms < sandbox.timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "sandbox.outer_timeout_ms ({}) must not be below sandbox.timeout_ms ({})",
                sandbox.outer_timeout_ms, sandbox.timeout_ms
            )));
        }
        if sandbox.max_code_length == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.max_code_length must be > 0".into(),
            ));
        }
        if !is_identifier(&self.validator.entry_function) {
            return Err(ConfigError::Invalid(format!(
                "validator.entry_function `{}` is not a JavaScript identifier",
                self.validator.entry_function
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = XlessonConfig::default();
        assert_eq!(config.sandbox.timeout_ms, 5_000);
        assert_eq!(config.sandbox.outer_timeout_ms, 6_000);
        assert!(config.sandbox.outer_timeout() > config.sandbox.inner_timeout());
        assert!(!config.sandbox.safety.allow_unbounded_loops);
        assert_eq!(config.validator.entry_function, "main");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = XlessonConfig::from_toml_str(
            "[sandbox]\ntimeout_ms = 1000\nouter_timeout_ms = 1500\n[sandbox.safety]\nallow_unbounded_loops = true\n",
        )
        .unwrap();
        assert_eq!(config.sandbox.timeout_ms, 1_000);
        assert_eq!(config.sandbox.max_code_length, 100_000);
        assert!(config.sandbox.safety.allow_unbounded_loops);
        assert_eq!(config.validator, ValidatorConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(XlessonConfig::from_toml_str("").unwrap(), XlessonConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let err = XlessonConfig::from_toml_str("[sandbox]\ntimeout_ms = 7000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = XlessonConfig::from_toml_str("[validator]\nentry_function = \"run me\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = XlessonConfig::from_toml_str("[sandbox\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_worker_table() {
        assert_eq!(SandboxConfig::default().worker.isolation, WorkerIsolation::Process);
        assert_eq!(SandboxConfig::default().worker.args, vec!["worker".to_string()]);

        let config = XlessonConfig::from_toml_str(
            "[sandbox.worker]\nisolation = \"in_process\"\n",
        )
        .unwrap();
        assert_eq!(config.sandbox.worker.isolation, WorkerIsolation::InProcess);
        assert!(config.sandbox.worker.program.is_none());

        let config = XlessonConfig::from_toml_str(
            "[sandbox.worker]\nprogram = \"/opt/xlesson\"\nargs = [\"worker\", \"--quiet\"]\n",
        )
        .unwrap();
        assert_eq!(config.sandbox.worker.program, Some(PathBuf::from("/opt/xlesson")));
        assert_eq!(config.sandbox.worker.args.len(), 2);

        let err = XlessonConfig::from_toml_str("[sandbox.worker]\nisolation = \"thread\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_runtime_config_mirrors_sandbox() {
        let sandbox = SandboxConfig {
            recursion_limit: 50,
            freeze_globals: true,
            ..SandboxConfig::default()
        };
        let runtime = sandbox.runtime_config();
        assert_eq!(runtime.recursion_limit, 50);
        assert!(runtime.freeze_globals);
        assert_eq!(runtime.allowed_globals, sandbox.allowed_globals);
    }
}
