// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for kryon definition events.

use crate::errors::DefinitionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A kryon definition was validated and added to the registry.
///
/// # Log Level
/// `debug!` - Setup detail
///
/// # Example
/// ```
/// use kryonflow::observability::messages::registry::KryonDefined;
///
/// let msg = KryonDefined {
///     kryon_id: "sum",
///     input_count: 1,
///     dependency_count: 1,
///     resolver_count: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct KryonDefined<'a> {
    pub kryon_id: &'a str,
    pub input_count: usize,
    pub dependency_count: usize,
    pub resolver_count: usize,
}

impl Display for KryonDefined<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kryon '{}' defined: inputs={}, dependencies={}, resolvers={}",
            self.kryon_id, self.input_count, self.dependency_count, self.resolver_count
        )
    }
}

impl StructuredLog for KryonDefined<'_> {
    fn log(&self) {
        tracing::debug!(
            kryon_id = self.kryon_id,
            input_count = self.input_count,
            dependency_count = self.dependency_count,
            resolver_count = self.resolver_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("definition", span_name = name, kryon_id = self.kryon_id)
    }
}

/// A kryon definition was rejected.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct DefinitionRejected<'a> {
    pub kryon_id: &'a str,
    pub error: &'a DefinitionError,
}

impl Display for DefinitionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Kryon '{}' rejected: {}", self.kryon_id, self.error)
    }
}

impl StructuredLog for DefinitionRejected<'_> {
    fn log(&self) {
        tracing::error!(
            kryon_id = self.kryon_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("definition", span_name = name, kryon_id = self.kryon_id)
    }
}
