// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every rule runs and all violations are reported together, so a single
//! pass over a config file surfaces every problem in it.

use crate::config::consts::MIN_CAPACITY;
use crate::config::Config;
use crate::errors::ValidationError;
use crate::observability::messages::validation::{ValidationCompleted, ValidationFailed};
use crate::observability::messages::StructuredLog;

/// Validates the runtime options of `config`.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let capacities = [
        (
            "lease_pool.max_active_leases_per_object",
            config.lease_pool.max_active_leases_per_object(),
        ),
        ("modulation.max_batch_size", config.modulation.max_batch_size()),
    ];
    for (option, value) in capacities {
        if let Err(error) = validate_minimum(option, value, MIN_CAPACITY) {
            errors.push(error);
        }
    }

    if errors.is_empty() {
        ValidationCompleted { rules_checked: capacities.len() }.log();
        Ok(())
    } else {
        ValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn validate_minimum(option: &str, value: usize, minimum: usize) -> Result<(), ValidationError> {
    if value < minimum {
        return Err(ValidationError::BelowMinimum {
            option: option.to_string(),
            minimum: minimum as u64,
            value: value as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LeasePoolConfig, ModulationConfig};

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_each_zero_capacity_is_reported() {
        let cases = vec![
            (
                Config {
                    lease_pool: LeasePoolConfig {
                        max_active_leases_per_object: Some(0),
                        idle_strike_threshold: None,
                    },
                    ..Config::default()
                },
                vec!["lease_pool.max_active_leases_per_object"],
            ),
            (
                Config {
                    modulation: ModulationConfig {
                        max_batch_size: Some(0),
                        max_wait_ms: Some(0),
                    },
                    ..Config::default()
                },
                vec!["modulation.max_batch_size"],
            ),
        ];

        for (config, expected) in cases {
            let errors = validate_config(&config).unwrap_err();
            let options: Vec<_> = errors
                .iter()
                .map(|error| match error {
                    ValidationError::BelowMinimum { option, .. } => option.as_str(),
                })
                .collect();
            assert_eq!(options, expected);
        }
    }

    #[test]
    fn test_idle_strike_threshold_of_zero_is_allowed() {
        let config = Config {
            lease_pool: LeasePoolConfig {
                max_active_leases_per_object: None,
                idle_strike_threshold: Some(0),
            },
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
