// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while building or querying the kryon graph.

use thiserror::Error;

use crate::graph::KryonId;

/// Definition-time failures. These are fatal to the `define`/`get` call that
/// raised them and never leave the registry half-updated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Kryon '{0}' is already defined")]
    DuplicateDefinition(KryonId),

    #[error("Kryon '{kryon_id}' references dependency '{dependency}' which {reason}")]
    UnknownDependency {
        kryon_id: KryonId,
        dependency: String,
        reason: String,
    },

    #[error("Kryon '{kryon_id}' references facet '{facet}' which does not exist on '{owner}'")]
    UnknownFacet {
        kryon_id: KryonId,
        facet: String,
        owner: KryonId,
    },

    #[error("Kryon '{kryon_id}' declares facet '{facet}' more than once")]
    DuplicateFacet { kryon_id: KryonId, facet: String },

    #[error("Cyclic dependency detected in '{kryon_id}': {}", .cycle.join(" -> "))]
    CyclicDependency { kryon_id: KryonId, cycle: Vec<String> },

    #[error("Kryon '{0}' not found")]
    NotFound(KryonId),
}
