// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::io::Write;
use std::time::Duration;

use crate::config::{load_and_validate_config, load_config};
use crate::errors::{ConfigError, ValidationError};
use crate::resolution::ConflictPolicy;

/// The shipped YAML demo config loads and validates.
#[test]
fn test_demo_yaml_loading() {
    let config = load_and_validate_config("configs/demo.yaml").unwrap();

    assert_eq!(config.executor.conflict_policy, ConflictPolicy::LastDeclaredWins);
    assert_eq!(config.lease_pool.max_active_leases_per_object(), 4);
    assert_eq!(config.lease_pool.idle_strike_threshold(), 100);
    assert_eq!(config.modulation.max_batch_size(), 8);
    assert_eq!(config.modulation.max_wait(), Some(Duration::from_millis(5)));
}

/// The TOML rendition is parsed by the same structs.
#[test]
fn test_demo_toml_loading() {
    let config = load_and_validate_config("configs/demo.toml").unwrap();

    assert_eq!(config.executor.conflict_policy, ConflictPolicy::Reject);
    assert_eq!(config.lease_pool.max_active_leases_per_object(), 2);
    assert_eq!(config.modulation.max_batch_size(), 4);
    assert_eq!(config.modulation.max_wait(), None);
}

#[test]
fn test_invalid_capacity_reports_every_violation() {
    let error = load_and_validate_config("configs/invalid-capacity.yaml").unwrap_err();

    match error {
        ConfigError::Invalid(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.contains(&ValidationError::BelowMinimum {
                option: "lease_pool.max_active_leases_per_object".to_string(),
                minimum: 1,
                value: 0,
            }));
        }
        other => panic!("Expected validation failure, got {:?}", other),
    }

    // loading alone does not validate
    assert!(load_config("configs/invalid-capacity.yaml").is_ok());
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    writeln!(file, "{{}}").unwrap();

    let error = load_config(file.path()).unwrap_err();
    assert!(matches!(error, ConfigError::UnsupportedFormat(ext) if ext == "json"));
}

#[test]
fn test_malformed_yaml_is_a_yaml_error() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "executor:\n  conflict_policy: sometimes").unwrap();

    let error = load_config(file.path()).unwrap_err();
    assert!(matches!(error, ConfigError::Yaml(_)));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let error = load_config("configs/does-not-exist.yaml").unwrap_err();
    assert!(matches!(error, ConfigError::Io(_)));
}
