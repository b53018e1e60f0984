// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for multi-lease pool lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// No pooled object had spare capacity, so a new one was created.
///
/// # Log Level
/// `debug!` - Resource lifecycle
pub struct PooledObjectCreated {
    pub object_id: u64,
    pub pool_size: usize,
}

impl Display for PooledObjectCreated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pooled object {} created, pool size now {}",
            self.object_id, self.pool_size
        )
    }
}

impl StructuredLog for PooledObjectCreated {
    fn log(&self) {
        tracing::debug!(
            object_id = self.object_id,
            pool_size = self.pool_size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("pool", span_name = name, object_id = self.object_id)
    }
}

/// An object struck out while idle and was destroyed.
///
/// # Log Level
/// `debug!` - Resource lifecycle
pub struct PooledObjectDestroyed {
    pub object_id: u64,
    pub idle_strikes: usize,
    pub pool_size: usize,
}

impl Display for PooledObjectDestroyed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pooled object {} destroyed after {} idle strikes, pool size now {}",
            self.object_id, self.idle_strikes, self.pool_size
        )
    }
}

impl StructuredLog for PooledObjectDestroyed {
    fn log(&self) {
        tracing::debug!(
            object_id = self.object_id,
            idle_strikes = self.idle_strikes,
            pool_size = self.pool_size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("pool", span_name = name, object_id = self.object_id)
    }
}

/// The pool closed and destroyed its objects.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PoolClosed {
    pub destroyed: usize,
}

impl Display for PoolClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Multi-lease pool closed, destroyed {} objects", self.destroyed)
    }
}

impl StructuredLog for PoolClosed {
    fn log(&self) {
        tracing::info!(destroyed = self.destroyed, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pool_closed", span_name = name, destroyed = self.destroyed)
    }
}
