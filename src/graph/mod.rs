// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Kryon graph model.
//!
//! * `definition` - kryon definitions, their builder and derived views
//! * `resolver` - per-edge resolver definitions and multi-resolvers
//! * `registry` - the validated set of defined kryons
//! * `dependant_chain` - path identity of a kryon invocation through the graph

pub mod definition;
pub mod dependant_chain;
pub mod registry;
pub mod resolver;

pub use definition::{
    InputDefinition, InputSource, KryonDefinition, KryonDefinitionBuilder, OutputLogicDefinition,
};
pub use dependant_chain::DependantChain;
pub use registry::KryonDefinitionRegistry;
pub use resolver::{
    MultiResolver, ResolverCommand, ResolverDefinition, ResolverLogic, SkipPredicate,
};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of a kryon in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KryonId(String);

impl KryonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KryonId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KryonId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for KryonId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of one execution request; memoization is scoped to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
