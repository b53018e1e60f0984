// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::graph::{DependantChain, KryonDefinition, KryonDefinitionRegistry, KryonId};
use crate::traits::OutputLogicDecorator;

/// Everything a decorator predicate or factory may inspect about one
/// (kryon, dependant chain) pair.
#[derive(Clone)]
pub struct LogicExecutionContext {
    pub kryon_id: KryonId,
    pub dependants: DependantChain,
    pub definition: Arc<KryonDefinition>,
    pub registry: Arc<KryonDefinitionRegistry>,
}

impl Debug for LogicExecutionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicExecutionContext")
            .field("kryon_id", &self.kryon_id)
            .field("dependants", &self.dependants.to_path_string())
            .finish()
    }
}

/// Which kryons a registered decorator config applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoratorScope {
    Global,
    Kryon(KryonId),
}

impl DecoratorScope {
    pub fn applies_to(&self, kryon_id: &KryonId) -> bool {
        match self {
            DecoratorScope::Global => true,
            DecoratorScope::Kryon(id) => id == kryon_id,
        }
    }
}

/// Handed to a decorator factory when a new live instance is needed.
#[derive(Debug, Clone)]
pub struct DecoratorContext {
    pub instance_id: String,
    pub logic_context: LogicExecutionContext,
}

type Predicate = Arc<dyn Fn(&LogicExecutionContext) -> bool + Send + Sync>;
type InstanceIdGenerator = Arc<dyn Fn(&LogicExecutionContext) -> String + Send + Sync>;
type Factory = Arc<dyn Fn(&DecoratorContext) -> Arc<dyn OutputLogicDecorator> + Send + Sync>;
type Closer = Arc<dyn Fn() + Send + Sync>;

/// How to decide, identify and build one kind of decorator.
///
/// For each (kryon, chain) the predicate decides whether to decorate and the
/// instance id generator picks the live instance to use; all chains that map
/// to the same id share that instance.
#[derive(Clone)]
pub struct DecoratorConfig {
    decorator_type: String,
    should_decorate: Predicate,
    instance_id_generator: InstanceIdGenerator,
    factory: Factory,
    closer: Option<Closer>,
}

impl DecoratorConfig {
    pub fn new(
        decorator_type: impl Into<String>,
        should_decorate: impl Fn(&LogicExecutionContext) -> bool + Send + Sync + 'static,
        instance_id_generator: impl Fn(&LogicExecutionContext) -> String + Send + Sync + 'static,
        factory: impl Fn(&DecoratorContext) -> Arc<dyn OutputLogicDecorator> + Send + Sync + 'static,
    ) -> Self {
        Self {
            decorator_type: decorator_type.into(),
            should_decorate: Arc::new(should_decorate),
            instance_id_generator: Arc::new(instance_id_generator),
            factory: Arc::new(factory),
            closer: None,
        }
    }

    /// One instance per dependant chain, keyed by the chain's path string.
    pub fn per_dependant_chain(
        decorator_type: impl Into<String>,
        factory: impl Fn(&DecoratorContext) -> Arc<dyn OutputLogicDecorator> + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            decorator_type,
            |_| true,
            |context| context.dependants.to_path_string(),
            factory,
        )
    }

    /// One instance shared by exactly the listed chains; other chains are
    /// left undecorated.
    pub fn shared(
        decorator_type: impl Into<String>,
        instance_id: impl Into<String>,
        chains: impl IntoIterator<Item = DependantChain>,
        factory: impl Fn(&DecoratorContext) -> Arc<dyn OutputLogicDecorator> + Send + Sync + 'static,
    ) -> Self {
        let chains: HashSet<DependantChain> = chains.into_iter().collect();
        let instance_id = instance_id.into();
        Self::new(
            decorator_type,
            move |context| chains.contains(&context.dependants),
            move |_| instance_id.clone(),
            factory,
        )
    }

    /// Narrows the predicate: both the existing one and `predicate` must hold.
    pub fn when(
        mut self,
        predicate: impl Fn(&LogicExecutionContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        let existing = self.should_decorate.clone();
        self.should_decorate = Arc::new(move |context| existing(context) && predicate(context));
        self
    }

    /// Runs once when the owning executor closes, after every live instance
    /// of this config was closed.
    pub fn with_closer(mut self, closer: impl Fn() + Send + Sync + 'static) -> Self {
        self.closer = Some(Arc::new(closer));
        self
    }

    pub fn decorator_type(&self) -> &str {
        &self.decorator_type
    }

    pub fn should_decorate(&self, context: &LogicExecutionContext) -> bool {
        (self.should_decorate)(context)
    }

    pub fn instance_id(&self, context: &LogicExecutionContext) -> String {
        (self.instance_id_generator)(context)
    }

    pub fn create(&self, context: &DecoratorContext) -> Arc<dyn OutputLogicDecorator> {
        (self.factory)(context)
    }

    pub(crate) fn close_resources(&self) {
        if let Some(closer) = &self.closer {
            closer();
        }
    }
}

impl Debug for DecoratorConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoratorConfig")
            .field("decorator_type", &self.decorator_type)
            .field("has_closer", &self.closer.is_some())
            .finish_non_exhaustive()
    }
}
