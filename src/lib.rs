// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;       // config files + validation
pub mod data;         // Errable, facets
pub mod decoration;   // chain-scoped decorators: injection, modulation
pub mod engine;       // kryon executor
pub mod errors;       // error handling
pub mod graph;        // definitions, resolvers, dependant chains
pub mod observability;
pub mod pool;         // multi-lease pool
pub mod resolution;   // dependency resolution protocol
pub mod traits;       // output logic and decorator seams
