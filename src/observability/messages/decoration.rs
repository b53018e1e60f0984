// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for decorator events.
//!
//! This module contains message types for logging events related to:
//! * Decorator registration and instance creation
//! * Batch flushes of the input modulation decorator
//! * Session input injection failures

use crate::decoration::DecoratorScope;
use crate::errors::FacetError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A decorator config was registered on an executor.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DecoratorRegistered<'a> {
    pub decorator_type: &'a str,
    pub scope: &'a DecoratorScope,
}

impl Display for DecoratorRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.scope {
            DecoratorScope::Global => {
                write!(f, "Decorator '{}' registered globally", self.decorator_type)
            }
            DecoratorScope::Kryon(kryon_id) => write!(
                f,
                "Decorator '{}' registered for kryon '{}'",
                self.decorator_type, kryon_id
            ),
        }
    }
}

impl StructuredLog for DecoratorRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            decorator_type = self.decorator_type,
            scope = ?self.scope,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "decorator",
            span_name = name,
            decorator_type = self.decorator_type,
        )
    }
}

/// A new live decorator instance was built for a (kryon, instance id).
///
/// # Log Level
/// `debug!` - Resource lifecycle
pub struct DecoratorInstanceCreated<'a> {
    pub decorator_type: &'a str,
    pub kryon_id: &'a str,
    pub instance_id: &'a str,
}

impl Display for DecoratorInstanceCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Decorator '{}' instance '{}' created for kryon '{}'",
            self.decorator_type, self.instance_id, self.kryon_id
        )
    }
}

impl StructuredLog for DecoratorInstanceCreated<'_> {
    fn log(&self) {
        tracing::debug!(
            decorator_type = self.decorator_type,
            kryon_id = self.kryon_id,
            instance_id = self.instance_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "decorator_instance",
            span_name = name,
            decorator_type = self.decorator_type,
            instance_id = self.instance_id,
        )
    }
}

/// Every live decorator instance was closed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DecoratorsClosed {
    pub instances: usize,
}

impl Display for DecoratorsClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Closed {} decorator instances", self.instances)
    }
}

impl StructuredLog for DecoratorsClosed {
    fn log(&self) {
        tracing::info!(instances = self.instances, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("decorators_closed", span_name = name, instances = self.instances)
    }
}

/// A batch buffer dispatched its pending facet sets.
///
/// # Log Level
/// `debug!` - Per-batch tracing
pub struct BatchFlushed {
    pub batch_size: usize,
    pub logic_groups: usize,
}

impl Display for BatchFlushed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Flushed batch of {} facet sets across {} logic calls",
            self.batch_size, self.logic_groups
        )
    }
}

impl StructuredLog for BatchFlushed {
    fn log(&self) {
        tracing::debug!(
            batch_size = self.batch_size,
            logic_groups = self.logic_groups,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("batch", span_name = name, batch_size = self.batch_size)
    }
}

/// A session input could not be injected.
///
/// # Log Level
/// `warn!` - The kryon runs with an error facet
pub struct InjectionFailed<'a> {
    pub kryon_id: &'a str,
    pub input: &'a str,
    pub error: &'a FacetError,
}

impl Display for InjectionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kryon '{}' input '{}' not injected: {}",
            self.kryon_id, self.input, self.error
        )
    }
}

impl StructuredLog for InjectionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            kryon_id = self.kryon_id,
            input = self.input,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "injection",
            span_name = name,
            kryon_id = self.kryon_id,
            input = self.input,
        )
    }
}
