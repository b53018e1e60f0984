// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::consts::{
    DEFAULT_IDLE_STRIKE_THRESHOLD, DEFAULT_MAX_ACTIVE_LEASES_PER_OBJECT, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_WAIT_MS,
};
use crate::errors::ConfigError;
use crate::resolution::ConflictPolicy;

/// Runtime configuration of a kryon executor.
///
/// Every section is optional; missing values fall back to the constants in
/// [`crate::config::consts`].
///
/// # Example
/// ```yaml
/// executor:
///   conflict_policy: last_declared_wins
/// lease_pool:
///   max_active_leases_per_object: 4
///   idle_strike_threshold: 100
/// modulation:
///   max_batch_size: 16
///   max_wait_ms: 10
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorOptions,
    #[serde(default)]
    pub lease_pool: LeasePoolConfig,
    #[serde(default)]
    pub modulation: ModulationConfig,
}

/// Options of the executor itself.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ExecutorOptions {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

/// Sizing of the multi-lease pool that backs batch buffers.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct LeasePoolConfig {
    pub max_active_leases_per_object: Option<usize>,
    pub idle_strike_threshold: Option<usize>,
}

impl LeasePoolConfig {
    pub fn max_active_leases_per_object(&self) -> usize {
        self.max_active_leases_per_object
            .unwrap_or(DEFAULT_MAX_ACTIVE_LEASES_PER_OBJECT)
    }

    pub fn idle_strike_threshold(&self) -> usize {
        self.idle_strike_threshold
            .unwrap_or(DEFAULT_IDLE_STRIKE_THRESHOLD)
    }
}

/// Flush policy of input modulation.
///
/// `max_wait_ms: 0` disables the timer; batches then flush on size or on an
/// explicit executor flush.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ModulationConfig {
    pub max_batch_size: Option<usize>,
    pub max_wait_ms: Option<u64>,
}

impl ModulationConfig {
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        match self.max_wait_ms.unwrap_or(DEFAULT_MAX_WAIT_MS) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Load a config from a YAML or TOML file, chosen by extension
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let content = fs::read_to_string(path)?;
    let cfg: Config = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };
    Ok(cfg)
}

/// Load and validate a config
///
/// Rejects capacities and batch sizes the runtime cannot use.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
executor:
  conflict_policy: reject
lease_pool:
  max_active_leases_per_object: 2
modulation:
  max_wait_ms: 0
"#;

        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.executor.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(cfg.lease_pool.max_active_leases_per_object(), 2);
        assert_eq!(
            cfg.lease_pool.idle_strike_threshold(),
            DEFAULT_IDLE_STRIKE_THRESHOLD
        );
        assert_eq!(cfg.modulation.max_batch_size(), DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(cfg.modulation.max_wait(), None);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.executor.conflict_policy, ConflictPolicy::LastDeclaredWins);
        assert_eq!(
            cfg.modulation.max_wait(),
            Some(Duration::from_millis(DEFAULT_MAX_WAIT_MS))
        );
    }

    #[test]
    fn test_load_toml_config() {
        let toml = r#"
[executor]
conflict_policy = "reject"

[modulation]
max_batch_size = 8
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kryonflow.toml");
        std::fs::write(&path, toml).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.executor.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(cfg.modulation.max_batch_size(), 8);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kryonflow.json");
        std::fs::write(&path, "{}").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "json"));
    }

    #[test]
    fn test_load_and_validate_rejects_zero_capacity() {
        let yaml = r#"
lease_pool:
  max_active_leases_per_object: 0
modulation:
  max_batch_size: 0
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.yaml");
        std::fs::write(&path, yaml).unwrap();

        let error = load_and_validate_config(&path).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("lease_pool.max_active_leases_per_object"));
        assert!(message.contains("modulation.max_batch_size"));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = load_config("does/not/exist.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
