// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output logic decoration scoped by dependant chain.
//!
//! * `config` - decorator configs, scopes and the execution context they see
//! * `registry` - registered configs and live decorator instances
//! * `injection` - session input injection
//! * `modulation` - batching of facet sets through pooled buffers

pub mod config;
pub mod injection;
pub mod modulation;
pub mod registry;

pub use config::{DecoratorConfig, DecoratorContext, DecoratorScope, LogicExecutionContext};
pub use injection::InputInjector;
pub use modulation::{
    BatchBuffer, BatchSizeModulator, InputModulationConfig, InputModulationDecorator,
};
pub use registry::DecoratorRegistry;
