// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for kryon executor lifecycle and execution events.
//!
//! This module contains message types for logging events related to:
//! * Executor creation and shutdown
//! * Execution requests and request scope release
//! * Per-invocation state transitions
//! * Skipped dependencies

use crate::engine::KryonState;
use crate::graph::DependantChain;
use crate::observability::messages::StructuredLog;
use crate::resolution::ConflictPolicy;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Executor built from configuration.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutorCreated {
    pub conflict_policy: ConflictPolicy,
    pub max_batch_size: usize,
    pub max_active_leases_per_object: usize,
}

impl Display for ExecutorCreated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kryon executor created: conflict_policy={:?}, max_batch_size={}, max_active_leases_per_object={}",
            self.conflict_policy, self.max_batch_size, self.max_active_leases_per_object
        )
    }
}

impl StructuredLog for ExecutorCreated {
    fn log(&self) {
        tracing::info!(
            conflict_policy = ?self.conflict_policy,
            max_batch_size = self.max_batch_size,
            max_active_leases_per_object = self.max_active_leases_per_object,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "executor",
            span_name = name,
            conflict_policy = ?self.conflict_policy,
        )
    }
}

/// A root kryon execution was requested.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use kryonflow::observability::messages::engine::ExecutionRequested;
///
/// let msg = ExecutionRequested {
///     kryon_id: "report",
///     request_id: "req-1",
///     facet_count: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionRequested<'a> {
    pub kryon_id: &'a str,
    pub request_id: &'a str,
    pub facet_count: usize,
}

impl Display for ExecutionRequested<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Executing kryon '{}' for request '{}' with {} facets",
            self.kryon_id, self.request_id, self.facet_count
        )
    }
}

impl StructuredLog for ExecutionRequested<'_> {
    fn log(&self) {
        tracing::info!(
            kryon_id = self.kryon_id,
            request_id = self.request_id,
            facet_count = self.facet_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            kryon_id = self.kryon_id,
            request_id = self.request_id,
        )
    }
}

/// An invocation moved to a new state.
///
/// # Log Level
/// `debug!` - Per-invocation tracing
pub struct KryonStateChanged<'a> {
    pub kryon_id: &'a str,
    pub dependants: &'a DependantChain,
    pub state: KryonState,
}

impl Display for KryonStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kryon '{}' at {} is {}",
            self.kryon_id, self.dependants, self.state
        )
    }
}

impl StructuredLog for KryonStateChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            kryon_id = self.kryon_id,
            dependants = %self.dependants,
            state = %self.state,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "kryon",
            span_name = name,
            kryon_id = self.kryon_id,
            dependants = %self.dependants,
        )
    }
}

/// Every resolver of a dependency dropped out.
///
/// # Log Level
/// `debug!` - Expected control flow
pub struct DependencySkipped<'a> {
    pub kryon_id: &'a str,
    pub dependency: &'a str,
    pub reasons: &'a [String],
}

impl Display for DependencySkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kryon '{}' skipped dependency '{}': {}",
            self.kryon_id,
            self.dependency,
            self.reasons.join("; ")
        )
    }
}

impl StructuredLog for DependencySkipped<'_> {
    fn log(&self) {
        tracing::debug!(
            kryon_id = self.kryon_id,
            dependency = self.dependency,
            reason_count = self.reasons.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "dependency_skipped",
            span_name = name,
            kryon_id = self.kryon_id,
            dependency = self.dependency,
        )
    }
}

/// The last root response of a request finished and its memo was dropped.
///
/// # Log Level
/// `debug!` - Resource lifecycle
pub struct RequestReleased<'a> {
    pub request_id: &'a str,
    pub memoized: usize,
}

impl Display for RequestReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Request '{}' released with {} memoized invocations",
            self.request_id, self.memoized
        )
    }
}

impl StructuredLog for RequestReleased<'_> {
    fn log(&self) {
        tracing::debug!(
            request_id = self.request_id,
            memoized = self.memoized,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("request", span_name = name, request_id = self.request_id)
    }
}

/// The executor stopped accepting work.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutorClosed {
    pub active_requests: usize,
}

impl Display for ExecutorClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kryon executor closed with {} requests in flight",
            self.active_requests
        )
    }
}

impl StructuredLog for ExecutorClosed {
    fn log(&self) {
        tracing::info!(active_requests = self.active_requests, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "executor_closed",
            span_name = name,
            active_requests = self.active_requests,
        )
    }
}
