// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::Config;
use crate::decoration::{DecoratorScope, InputInjector, InputModulationConfig};
use crate::engine::KryonExecutor;
use crate::graph::KryonDefinitionRegistry;
use crate::observability::messages::engine::ExecutorCreated;
use crate::observability::messages::StructuredLog;
use crate::traits::InjectionProvider;

/// Factory for creating kryon executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create an executor with the configured conflict policy and input
    /// modulation for every kryon tagged for it.
    pub fn from_config(cfg: &Config, registry: Arc<KryonDefinitionRegistry>) -> KryonExecutor {
        let executor = KryonExecutor::with_conflict_policy(registry, cfg.executor.conflict_policy);

        let modulation = InputModulationConfig::from_options(&cfg.modulation, &cfg.lease_pool);
        executor.register_decorator(DecoratorScope::Global, modulation.decorator_config());

        ExecutorCreated {
            conflict_policy: cfg.executor.conflict_policy,
            max_batch_size: cfg.modulation.max_batch_size(),
            max_active_leases_per_object: cfg.lease_pool.max_active_leases_per_object(),
        }
        .log();

        executor
    }

    /// Like [`ExecutorFactory::from_config`], and fills session inputs from
    /// `provider`. Injection wraps modulation, so batches see injected values.
    pub fn from_config_with_injection(
        cfg: &Config,
        registry: Arc<KryonDefinitionRegistry>,
        provider: Arc<dyn InjectionProvider>,
    ) -> KryonExecutor {
        let executor = Self::from_config(cfg, registry);
        executor.register_decorator(DecoratorScope::Global, InputInjector::config(Some(provider)));
        executor
    }
}
