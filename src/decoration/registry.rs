// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::future::{self, FutureExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::data::{Errable, Facets};
use crate::decoration::{DecoratorConfig, DecoratorContext, DecoratorScope, LogicExecutionContext};
use crate::errors::FacetError;
use crate::graph::{DependantChain, KryonId};
use crate::observability::messages::decoration::{
    DecoratorInstanceCreated, DecoratorRegistered, DecoratorsClosed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{LogicFuture, LogicResults, OutputLogic, OutputLogicDecorator};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    decorator_type: String,
    kryon_id: KryonId,
    instance_id: String,
}

type Instances = HashMap<InstanceKey, Arc<dyn OutputLogicDecorator>>;

/// Wrapped logic of one (kryon, chain) and the instances wrapping it.
struct Decorated {
    logic: Arc<dyn OutputLogic>,
    decorators: Vec<Arc<dyn OutputLogicDecorator>>,
}

type DecoratedCache = HashMap<(KryonId, DependantChain), Decorated>;

/// Stands in for decorated logic once the registry is closed.
struct ClosedLogic;

impl OutputLogic for ClosedLogic {
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
        inputs
            .into_iter()
            .map(|facets| {
                let output: LogicFuture =
                    future::ready(Errable::with_error(FacetError::Closed)).boxed();
                (facets, output)
            })
            .collect()
    }
}

/// Decorator configs registered on one executor and their live instances.
///
/// Decorated logic is cached per (kryon, chain) so every invocation along a
/// chain goes through the same wrapped logic; registering a config clears
/// the cache. After [`close_all`](Self::close_all) no instance is created
/// again and decorated kryons fail with [`FacetError::Closed`].
#[derive(Default)]
pub struct DecoratorRegistry {
    configs: RwLock<Vec<(DecoratorScope, DecoratorConfig)>>,
    instances: Mutex<Instances>,
    decorated: Mutex<DecoratedCache>,
    closed: AtomicBool,
}

impl DecoratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, scope: DecoratorScope, config: DecoratorConfig) {
        DecoratorRegistered {
            decorator_type: config.decorator_type(),
            scope: &scope,
        }
        .log();
        self.configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((scope, config));
        self.decorated().clear();
    }

    fn decorated(&self) -> MutexGuard<'_, DecoratedCache> {
        self.decorated.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The kryon's output logic wrapped by every applicable decorator, first
    /// registered innermost.
    pub fn decorated_logic(&self, context: &LogicExecutionContext) -> Arc<dyn OutputLogic> {
        let key = (context.kryon_id.clone(), context.dependants.clone());
        if let Some(decorated) = self.decorated().get(&key) {
            return decorated.logic.clone();
        }

        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        let applicable: Vec<&DecoratorConfig> = configs
            .iter()
            .filter(|(scope, config)| {
                scope.applies_to(&context.kryon_id) && config.should_decorate(context)
            })
            .map(|(_, config)| config)
            .collect();
        if applicable.is_empty() {
            return context.definition.logic().clone();
        }
        if self.is_closed() {
            return Arc::new(ClosedLogic);
        }

        let mut logic = context.definition.logic().clone();
        let mut decorators = Vec::with_capacity(applicable.len());
        for config in applicable {
            let decorator = self.instance(config, context);
            logic = decorator.decorate(logic, context);
            decorators.push(decorator);
        }
        drop(configs);

        self.decorated()
            .entry(key)
            .or_insert(Decorated { logic, decorators })
            .logic
            .clone()
    }

    /// Flushes the decorators wrapping `kryon_id` along `chain`; returns how
    /// many facet sets they dispatched.
    pub fn flush_chain(&self, kryon_id: &KryonId, chain: &DependantChain) -> usize {
        let decorators = match self.decorated().get(&(kryon_id.clone(), chain.clone())) {
            Some(decorated) => decorated.decorators.clone(),
            None => return 0,
        };
        decorators.iter().map(|decorator| decorator.flush()).sum()
    }

    fn instance(
        &self,
        config: &DecoratorConfig,
        context: &LogicExecutionContext,
    ) -> Arc<dyn OutputLogicDecorator> {
        let instance_id = config.instance_id(context);
        let key = InstanceKey {
            decorator_type: config.decorator_type().to_string(),
            kryon_id: context.kryon_id.clone(),
            instance_id: instance_id.clone(),
        };
        self.instances()
            .entry(key)
            .or_insert_with(|| {
                DecoratorInstanceCreated {
                    decorator_type: config.decorator_type(),
                    kryon_id: context.kryon_id.as_str(),
                    instance_id: &instance_id,
                }
                .log();
                config.create(&DecoratorContext {
                    instance_id: instance_id.clone(),
                    logic_context: context.clone(),
                })
            })
            .clone()
    }

    fn instances(&self) -> MutexGuard<'_, Instances> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn live_instances(&self) -> usize {
        self.instances().len()
    }

    pub fn flush_all(&self) {
        let live: Vec<_> = self.instances().values().cloned().collect();
        for decorator in live {
            decorator.flush();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes and forgets every live instance, then runs config closers.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let live: Vec<_> = self.instances().drain().map(|(_, d)| d).collect();
        for decorator in &live {
            decorator.close();
        }
        self.decorated().clear();
        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        for (_, config) in configs.iter() {
            config.close_resources();
        }
        DecoratorsClosed {
            instances: live.len(),
        }
        .log();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Facets;
    use crate::graph::{KryonDefinition, KryonDefinitionRegistry};
    use crate::traits::{compute_logic, LogicResults};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Appends its label to the string output of the wrapped logic.
    struct Suffix {
        id: String,
        label: &'static str,
    }

    struct SuffixLogic {
        inner: Arc<dyn OutputLogic>,
        label: &'static str,
    }

    impl OutputLogic for SuffixLogic {
        fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
            let label = self.label;
            self.inner
                .execute(inputs)
                .into_iter()
                .map(|(facets, output)| {
                    let output: crate::traits::LogicFuture = Box::pin(async move {
                        output
                            .await
                            .map(|v| json!(format!("{}{}", v.as_str().unwrap_or(""), label)))
                    });
                    (facets, output)
                })
                .collect()
        }
    }

    impl OutputLogicDecorator for Suffix {
        fn decorate(
            &self,
            logic: Arc<dyn OutputLogic>,
            _context: &LogicExecutionContext,
        ) -> Arc<dyn OutputLogic> {
            Arc::new(SuffixLogic {
                inner: logic,
                label: self.label,
            })
        }

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn context(chain: DependantChain) -> LogicExecutionContext {
        let registry = Arc::new(KryonDefinitionRegistry::new());
        let definition = registry
            .define(KryonDefinition::builder("k", compute_logic(|_| Ok(json!("x")))).build())
            .unwrap();
        LogicExecutionContext {
            kryon_id: "k".into(),
            dependants: chain,
            definition,
            registry,
        }
    }

    fn suffix_config(label: &'static str, created: Arc<AtomicUsize>) -> DecoratorConfig {
        DecoratorConfig::per_dependant_chain(label, move |ctx| {
            created.fetch_add(1, Ordering::SeqCst);
            Arc::new(Suffix {
                id: ctx.instance_id.clone(),
                label,
            })
        })
    }

    #[tokio::test]
    async fn test_first_registered_decorator_is_innermost() {
        let registry = DecoratorRegistry::new();
        let created = Arc::new(AtomicUsize::new(0));
        registry.register(DecoratorScope::Global, suffix_config("-a", created.clone()));
        registry.register(DecoratorScope::Global, suffix_config("-b", created.clone()));

        let logic = registry.decorated_logic(&context(DependantChain::start()));
        let output = logic
            .execute(vec![Facets::new()])
            .remove(&Facets::new())
            .unwrap()
            .await;

        assert_eq!(output.value(), Some(&json!("x-a-b")));
    }

    #[test]
    fn test_one_instance_per_chain_and_type() {
        let registry = DecoratorRegistry::new();
        let created = Arc::new(AtomicUsize::new(0));
        registry.register(DecoratorScope::Global, suffix_config("-a", created.clone()));

        let start = DependantChain::start();
        let nested = start.extend(&"parent".into(), "child").unwrap();
        registry.decorated_logic(&context(start.clone()));
        registry.decorated_logic(&context(start));
        registry.decorated_logic(&context(nested));

        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(registry.live_instances(), 2);
    }

    #[test]
    fn test_shared_config_covers_only_listed_chains() {
        let registry = DecoratorRegistry::new();
        let start = DependantChain::start();
        let first = start.extend(&"p".into(), "d1").unwrap();
        let second = start.extend(&"p".into(), "d2").unwrap();
        let outside = start.extend(&"p".into(), "d3").unwrap();
        registry.register(
            DecoratorScope::Kryon("k".into()),
            DecoratorConfig::shared("-s", "shared", [first.clone(), second.clone()], |ctx| {
                Arc::new(Suffix {
                    id: ctx.instance_id.clone(),
                    label: "-s",
                }) as Arc<dyn OutputLogicDecorator>
            }),
        );

        registry.decorated_logic(&context(first));
        registry.decorated_logic(&context(second));
        registry.decorated_logic(&context(outside));

        assert_eq!(registry.live_instances(), 1);
    }

    #[test]
    fn test_close_all_runs_closers_and_forgets_instances() {
        let registry = DecoratorRegistry::new();
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = closed.clone();
        registry.register(
            DecoratorScope::Global,
            suffix_config("-a", Arc::new(AtomicUsize::new(0))).with_closer(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        registry.decorated_logic(&context(DependantChain::start()));

        registry.close_all();

        assert_eq!(registry.live_instances(), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_registry_creates_no_instances() {
        let registry = DecoratorRegistry::new();
        registry.register(DecoratorScope::Global, suffix_config("-a", Arc::new(AtomicUsize::new(0))));
        registry.close_all();

        let logic = registry.decorated_logic(&context(DependantChain::start()));
        let output = logic
            .execute(vec![Facets::new()])
            .remove(&Facets::new())
            .unwrap()
            .await;

        assert_eq!(output, Errable::with_error(FacetError::Closed));
        assert_eq!(registry.live_instances(), 0);
    }

    /// Reports a fixed number of dispatched facet sets per flush.
    struct Buffered(usize);

    impl OutputLogicDecorator for Buffered {
        fn decorate(
            &self,
            logic: Arc<dyn OutputLogic>,
            _context: &LogicExecutionContext,
        ) -> Arc<dyn OutputLogic> {
            logic
        }

        fn id(&self) -> &str {
            "buffered"
        }

        fn flush(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn test_flush_chain_reaches_only_that_chain() {
        let registry = DecoratorRegistry::new();
        registry.register(
            DecoratorScope::Global,
            DecoratorConfig::per_dependant_chain("buffered", |_| {
                Arc::new(Buffered(2)) as Arc<dyn OutputLogicDecorator>
            }),
        );
        let start = DependantChain::start();
        let nested = start.extend(&"parent".into(), "child").unwrap();
        registry.decorated_logic(&context(start.clone()));

        assert_eq!(registry.flush_chain(&"k".into(), &start), 2);
        assert_eq!(registry.flush_chain(&"k".into(), &nested), 0);
    }
}
