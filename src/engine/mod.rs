// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod factory;
mod request;

pub use executor::{KryonExecutor, KryonResponse, KryonState};
pub use factory::ExecutorFactory;
