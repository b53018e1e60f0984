// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and
//! operational logging in kryonflow. Message types follow a struct-based
//! pattern with a `Display` implementation, so log text lives next to the
//! fields it reports instead of being scattered as string literals.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - executor lifecycle, requests and kryon states
//! * `messages::registry` - kryon definitions accepted or rejected
//! * `messages::decoration` - decorators, batch flushes and injection
//! * `messages::pool` - multi-lease pool objects
//! * `messages::validation` - configuration validation results
//!
//! # Usage
//!
//! ```rust
//! use kryonflow::errors::FacetError;
//! use kryonflow::observability::messages::decoration::InjectionFailed;
//!
//! let error = FacetError::failed("provider offline");
//! let msg = InjectionFailed {
//!     kryon_id: "report",
//!     input: "user",
//!     error: &error,
//! };
//!
//! tracing::warn!("{}", msg);
//! ```

pub mod messages;
