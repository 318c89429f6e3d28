//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via FSMKIT_CONFIG or --config)
//! 3. Environment variables

use fsmkit_core::{GraphDefinition, HookFailurePolicy, LockPolicy, MachineOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options applied to every machine.
    pub engine: MachineOptions,
    /// Extra machine definitions loaded next to the built-in workflows.
    pub definitions: DefinitionsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from `path` (or FSMKIT_CONFIG), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("FSMKIT_CONFIG") {
                Ok(path) => Self::from_file(path)?,
                Err(_) => Self::default(),
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup; the environment in production.
    /// Unknown policy values are rejected.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(policy) = lookup("FSMKIT_LOCK_POLICY") {
            self.engine.lock_policy = LockPolicy::parse(&policy).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "FSMKIT_LOCK_POLICY must be 'machine' or 'per_entity', got '{}'",
                    policy
                ))
            })?;
        }

        if let Some(policy) = lookup("FSMKIT_HOOK_FAILURE_POLICY") {
            self.engine.hook_failure_policy =
                HookFailurePolicy::parse(&policy).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "FSMKIT_HOOK_FAILURE_POLICY must be 'ignore' or 'fail', got '{}'",
                        policy
                    ))
                })?;
        }

        if let Some(paths) = lookup("FSMKIT_DEFINITIONS") {
            self.definitions.paths.extend(
                paths
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
            );
        }

        if let Some(filter) = lookup("FSMKIT_LOG") {
            if !filter.is_empty() {
                self.logging.filter = filter;
            }
        }

        Ok(())
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in &self.definitions.paths {
            if !path.exists() {
                return Err(ConfigError::Validation(format!(
                    "definition file '{}' does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Definition files configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// JSON or YAML files, each holding one graph definition.
    pub paths: Vec<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when RUST_LOG is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

/// Loads a graph definition, choosing the parser by file extension.
pub fn load_definition(path: &Path) -> Result<GraphDefinition, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse '{}': {1}", .0.display())]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
