// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::DefinitionError;

/// Errors that reject an execution request outright.
///
/// Failures inside the graph never surface here: they travel as
/// [`crate::data::Errable`] values so downstream kryons can decide what to do
/// with them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Kryon executor is closed and accepts no new requests")]
    EngineClosed,

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}
