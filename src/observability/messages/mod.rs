// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it with structured fields at its own level.
//!
//! # Organization
//!
//! * `engine` - executor lifecycle, requests and kryon state transitions
//! * `registry` - kryon definition events
//! * `decoration` - decorator registration, instances, batching and injection
//! * `pool` - multi-lease pool object lifecycle
//! * `validation` - configuration validation results
//!
//! # Usage Pattern
//!
//! ```rust
//! use kryonflow::observability::messages::engine::ExecutionRequested;
//! use kryonflow::observability::messages::StructuredLog;
//!
//! ExecutionRequested {
//!     kryon_id: "report",
//!     request_id: "req-1",
//!     facet_count: 2,
//! }
//! .log();
//! ```

use std::fmt::Display;
use tracing::Span;

pub mod decoration;
pub mod engine;
pub mod pool;
pub mod registry;
pub mod validation;

/// A log message that knows its level and structured fields.
pub trait StructuredLog: Display {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// A span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
