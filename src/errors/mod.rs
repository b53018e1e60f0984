// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod definition;
mod execution;
mod facet;
mod pool;

pub use config::{ConfigError, ValidationError};
pub use definition::DefinitionError;
pub use execution::ExecutionError;
pub use facet::FacetError;
pub use pool::PoolError;
