// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Extension seams: output logic, decorators and the strategies the built-in
//! decorators are parameterised with.

pub mod decorator;
pub mod injection;
pub mod modulator;
pub mod output_logic;

pub use decorator::OutputLogicDecorator;
pub use injection::InjectionProvider;
pub use modulator::InputModulator;
pub use output_logic::{
    async_logic, compute_logic, KryonLogic, LogicFuture, LogicResults, OutputLogic,
};
