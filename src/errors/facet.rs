// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use thiserror::Error;

use crate::errors::DefinitionError;

/// A failure carried as data in the error state of an [`crate::data::Errable`].
///
/// Cloneable and comparable so that it can live inside memoized facet sets and
/// shared futures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FacetError {
    /// The producing logic failed.
    #[error("{0}")]
    Failed(String),

    /// Every resolver of a dependency skipped it.
    #[error("Dependency skipped: {}", .reasons.join("; "))]
    Skipped { reasons: Vec<String> },

    /// Two resolvers wrote the same input of one dependency and the conflict
    /// policy rejects overrides.
    #[error("Resolvers of dependency '{dependency}' both write input '{input}'")]
    ResolutionConflict { dependency: String, input: String },

    /// A session input could not be injected.
    #[error("Cannot inject input '{input}': {reason}")]
    Injection { input: String, reason: String },

    /// The batching decorator was closed before the facet set was dispatched.
    #[error("Input modulator is closed")]
    Closed,

    #[error("Dependency cycle detected at {chain}")]
    Cycle { chain: String },

    #[error("Kryon '{0}' is not defined")]
    UnknownKryon(String),

    #[error("Output logic returned no result for the requested facets")]
    MissingOutput,

    #[error("Expected a single dependency result, found {0}")]
    NotSingular(usize),

    #[error("Request scope was released before the kryon completed")]
    RequestReleased,
}

impl FacetError {
    pub fn failed(message: impl Into<String>) -> Self {
        FacetError::Failed(message.into())
    }
}

impl From<DefinitionError> for FacetError {
    fn from(error: DefinitionError) -> Self {
        match error {
            DefinitionError::NotFound(id) => FacetError::UnknownKryon(id.to_string()),
            other => FacetError::Failed(other.to_string()),
        }
    }
}
