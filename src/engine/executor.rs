// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::future::{self, join_all, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::Poll;

use crate::data::{Errable, FacetValue, Facets};
use crate::decoration::{DecoratorConfig, DecoratorRegistry, DecoratorScope, LogicExecutionContext};
use crate::engine::request::{MemoFuture, RequestGuard, RequestScope, Requests};
use crate::errors::{ExecutionError, FacetError};
use crate::graph::{DependantChain, KryonDefinition, KryonDefinitionRegistry, KryonId, RequestId};
use crate::observability::messages::engine::{
    DependencySkipped, ExecutionRequested, ExecutorClosed, KryonStateChanged,
};
use crate::observability::messages::StructuredLog;
use crate::resolution::{resolve_dependency, ConflictPolicy, DependencyCommand};

/// Future of a root kryon's output.
pub type KryonResponse = BoxFuture<'static, Errable<Value>>;

type EdgeFuture = Shared<BoxFuture<'static, FacetValue>>;

/// Lifecycle of one (kryon, facet set) invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KryonState {
    Pending,
    Resolving,
    Waiting,
    Executing,
    Done,
    Failed,
}

impl Display for KryonState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            KryonState::Pending => "PENDING",
            KryonState::Resolving => "RESOLVING",
            KryonState::Waiting => "WAITING",
            KryonState::Executing => "EXECUTING",
            KryonState::Done => "DONE",
            KryonState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Shared by every in-flight invocation of one executor.
struct Runtime {
    registry: Arc<KryonDefinitionRegistry>,
    conflict_policy: ConflictPolicy,
    decorators: DecoratorRegistry,
}

/// Executes kryon graphs.
///
/// Every invocation of a kryon with a given facet set runs at most once per
/// request; repeated references, from diamonds or from several roots of the
/// same request, share one future. Dependencies of a kryon resolve
/// concurrently, except that a dependency whose resolvers consume another
/// dependency waits for it. Failures travel as data: a failed dependency
/// becomes an error facet and the depending kryon still runs.
pub struct KryonExecutor {
    runtime: Arc<Runtime>,
    requests: Requests,
    closed: AtomicBool,
}

impl KryonExecutor {
    pub fn new(registry: Arc<KryonDefinitionRegistry>) -> Self {
        Self::with_conflict_policy(registry, ConflictPolicy::default())
    }

    pub fn with_conflict_policy(
        registry: Arc<KryonDefinitionRegistry>,
        conflict_policy: ConflictPolicy,
    ) -> Self {
        Self {
            runtime: Arc::new(Runtime {
                registry,
                conflict_policy,
                decorators: DecoratorRegistry::new(),
            }),
            requests: Arc::new(Mutex::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<KryonDefinitionRegistry> {
        &self.runtime.registry
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.runtime.conflict_policy
    }

    /// Starts `kryon_id` with client `facets` inside `request_id`.
    ///
    /// The response resolves to an error only when the root kryon's own
    /// output logic produced one.
    pub fn execute_kryon(
        &self,
        kryon_id: &KryonId,
        facets: Facets,
        request_id: RequestId,
    ) -> Result<KryonResponse, ExecutionError> {
        if self.is_closed() {
            return Err(ExecutionError::EngineClosed);
        }
        let definition = self.runtime.registry.get(kryon_id)?;

        ExecutionRequested {
            kryon_id: kryon_id.as_str(),
            request_id: request_id.as_str(),
            facet_count: facets.len(),
        }
        .log();

        let guard = RequestGuard::acquire(&self.requests, request_id);
        let output = invoke(
            &self.runtime,
            guard.scope(),
            definition,
            facets,
            DependantChain::start(),
        );
        let output = flush_when_blocked(
            self.runtime.clone(),
            kryon_id.clone(),
            DependantChain::start(),
            output.boxed(),
        );
        Ok(async move {
            let _guard = guard;
            output.await
        }
        .boxed())
    }

    /// Registers a decorator config. Applies to invocations whose decorated
    /// logic has not been built yet.
    pub fn register_decorator(&self, scope: DecoratorScope, config: DecoratorConfig) {
        self.runtime.decorators.register(scope, config);
    }

    /// Flushes every live decorator. Responses flush their own chains when
    /// they block, so this only matters for work driven outside of them.
    pub fn flush(&self) {
        self.runtime.decorators.flush_all();
    }

    /// Rejects new executions, then flushes and closes live decorators.
    /// In-flight work completes or fails on its own.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.runtime.decorators.flush_all();
        self.runtime.decorators.close_all();
        ExecutorClosed {
            active_requests: self.active_requests(),
        }
        .log();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Requests with at least one pending root response.
    pub fn active_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn live_decorators(&self) -> usize {
        self.runtime.decorators.live_instances()
    }
}

/// Drives `pending`, flushing the decorators of `kryon_id` along `chain`
/// each time it blocks, until a flush dispatches nothing. Invocations still
/// waiting on their own dependencies submit later and flush on a later poll.
fn flush_when_blocked<T>(
    runtime: Arc<Runtime>,
    kryon_id: KryonId,
    chain: DependantChain,
    mut pending: BoxFuture<'static, T>,
) -> BoxFuture<'static, T>
where
    T: Send + 'static,
{
    future::poll_fn(move |cx| loop {
        if let Poll::Ready(value) = pending.poll_unpin(cx) {
            return Poll::Ready(value);
        }
        if runtime.decorators.flush_chain(&kryon_id, &chain) == 0 {
            return Poll::Pending;
        }
    })
    .boxed()
}

fn log_state(definition: &KryonDefinition, chain: &DependantChain, state: KryonState) {
    KryonStateChanged {
        kryon_id: definition.id().as_str(),
        dependants: chain,
        state,
    }
    .log();
}

/// The memoized invocation of `definition` with `facets` in `scope`.
fn invoke(
    runtime: &Arc<Runtime>,
    scope: &Arc<RequestScope>,
    definition: Arc<KryonDefinition>,
    facets: Facets,
    chain: DependantChain,
) -> MemoFuture {
    let kryon_id = definition.id().clone();
    let (output, started) = scope.memoized(&kryon_id, &facets, || {
        run(
            runtime.clone(),
            Arc::downgrade(scope),
            definition.clone(),
            facets.clone(),
            chain.clone(),
        )
    });
    if started {
        log_state(&definition, &chain, KryonState::Pending);
    }
    output
}

fn run(
    runtime: Arc<Runtime>,
    scope: Weak<RequestScope>,
    definition: Arc<KryonDefinition>,
    facets: Facets,
    chain: DependantChain,
) -> BoxFuture<'static, Errable<Value>> {
    async move {
        log_state(&definition, &chain, KryonState::Resolving);

        let mut edges: HashMap<String, EdgeFuture> = HashMap::new();
        for dependency in definition.dependency_order() {
            let prerequisites: Vec<(String, EdgeFuture)> = definition
                .prerequisites(dependency)
                .into_iter()
                .flatten()
                .filter_map(|name| edges.get(name).map(|edge| (name.clone(), edge.clone())))
                .collect();
            let edge = resolve_edge(
                runtime.clone(),
                scope.clone(),
                definition.clone(),
                dependency.clone(),
                facets.clone(),
                chain.clone(),
                prerequisites,
            );
            edges.insert(dependency.clone(), edge.shared());
        }

        if !edges.is_empty() {
            log_state(&definition, &chain, KryonState::Waiting);
        }
        let resolved = join_all(
            edges
                .into_iter()
                .map(|(name, edge)| async move { (name, edge.await) }),
        )
        .await;

        let mut inputs = facets;
        for (name, value) in resolved {
            inputs.insert(name, value);
        }

        log_state(&definition, &chain, KryonState::Executing);
        let context = LogicExecutionContext {
            kryon_id: definition.id().clone(),
            dependants: chain.clone(),
            definition: definition.clone(),
            registry: runtime.registry.clone(),
        };
        let logic = runtime.decorators.decorated_logic(&context);
        let output = match logic.execute(vec![inputs.clone()]).remove(&inputs) {
            Some(output) => output.await,
            None => Errable::with_error(FacetError::MissingOutput),
        };

        let state = match output {
            Errable::Error(_) => KryonState::Failed,
            _ => KryonState::Done,
        };
        log_state(&definition, &chain, state);
        output
    }
    .boxed()
}

/// Resolves and invokes one dependency of `definition`, yielding the value
/// of its dependency facet.
fn resolve_edge(
    runtime: Arc<Runtime>,
    scope: Weak<RequestScope>,
    definition: Arc<KryonDefinition>,
    dependency: String,
    mut facets: Facets,
    chain: DependantChain,
    prerequisites: Vec<(String, EdgeFuture)>,
) -> BoxFuture<'static, FacetValue> {
    async move {
        for (name, prerequisite) in prerequisites {
            let value = prerequisite.await;
            facets.insert(name, value);
        }

        let chain = match chain.extend(definition.id(), &dependency) {
            Ok(chain) => chain,
            Err(cycle) => return FacetValue::error(cycle),
        };

        let sets = match resolve_dependency(
            &definition,
            &dependency,
            &facets,
            runtime.conflict_policy,
        ) {
            DependencyCommand::Execute(sets) => sets,
            DependencyCommand::Skip(reasons) => {
                DependencySkipped {
                    kryon_id: definition.id().as_str(),
                    dependency: &dependency,
                    reasons: &reasons,
                }
                .log();
                return FacetValue::error(FacetError::Skipped { reasons });
            }
            DependencyCommand::Conflict(error) => return FacetValue::error(error),
        };

        let target = match definition
            .dependency(&dependency)
            .ok_or_else(|| FacetError::UnknownKryon(dependency.clone()))
            .and_then(|id| runtime.registry.get(id).map_err(FacetError::from))
        {
            Ok(target) => target,
            Err(error) => return FacetValue::error(error),
        };

        let invocations: Vec<_> = {
            let Some(scope) = scope.upgrade() else {
                return FacetValue::error(FacetError::RequestReleased);
            };
            sets.into_iter()
                .map(|set| {
                    let output = invoke(&runtime, &scope, target.clone(), set.clone(), chain.clone());
                    async move { (set, output.await) }
                })
                .collect()
        };

        let results = flush_when_blocked(
            runtime,
            target.id().clone(),
            chain,
            join_all(invocations).boxed(),
        );
        FacetValue::Results(results.await)
    }
    .boxed()
}
