// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

/// Source of session-scoped inputs for the input injection decorator.
///
/// Lookups are by the declared data type of the input, optionally narrowed by
/// a `named` tag on the input definition.
pub trait InjectionProvider: Send + Sync {
    fn get_instance(&self, data_type: &str) -> Option<Value>;

    fn get_named_instance(&self, data_type: &str, name: &str) -> Option<Value>;
}
