// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Input modulation: batches facet sets from independent invocations into a
//! single call of the wrapped output logic.
//!
//! Decorator instances do not own their buffers. Each instance leases a
//! [`BatchBuffer`] from a [`MultiLeasePool`], so chain-scoped instances
//! multiplex onto a bounded number of buffers and one flush dispatches work
//! from all of them, grouped by wrapped logic.

use futures::future::{self, FutureExt, Shared};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::{LeasePoolConfig, ModulationConfig};
use crate::data::{Errable, Facets};
use crate::decoration::{DecoratorConfig, LogicExecutionContext};
use crate::errors::FacetError;
use crate::observability::messages::decoration::BatchFlushed;
use crate::observability::messages::StructuredLog;
use crate::pool::{Lease, MultiLeasePool};
use crate::traits::{InputModulator, LogicFuture, LogicResults, OutputLogic, OutputLogicDecorator};

pub const INPUT_MODULATION: &str = "input_modulation";

/// Output tag that opts a kryon into input modulation.
pub const MODULATED_TAG: &str = "input_modulation";

static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

/// Flushes when `max_batch_size` facet sets are pending or `max_wait` has
/// passed since the first one arrived.
#[derive(Debug, Clone)]
pub struct BatchSizeModulator {
    max_batch_size: usize,
    max_wait: Option<Duration>,
}

impl BatchSizeModulator {
    pub fn new(max_batch_size: usize, max_wait: Option<Duration>) -> Self {
        Self {
            max_batch_size,
            max_wait,
        }
    }
}

impl InputModulator for BatchSizeModulator {
    fn should_flush(&self, pending: usize) -> bool {
        pending >= self.max_batch_size
    }

    fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }
}

struct PendingEntry {
    owner: u64,
    logic: Arc<dyn OutputLogic>,
    facets: Facets,
    reply: oneshot::Sender<LogicFuture>,
}

impl PendingEntry {
    fn fail(self, error: FacetError) {
        // the caller may have dropped its response
        let _ = self
            .reply
            .send(future::ready(Errable::with_error(error)).boxed());
    }
}

#[derive(Default)]
struct BufferState {
    pending: Vec<PendingEntry>,
    closed: bool,
}

/// Pending facet sets waiting for a flush.
#[derive(Default)]
pub struct BatchBuffer {
    state: Mutex<BufferState>,
    timer: Mutex<Option<CancellationToken>>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pending count after the push, or the entry back if the buffer closed.
    fn push(&self, entry: PendingEntry) -> Result<usize, PendingEntry> {
        let mut state = self.state();
        if state.closed {
            return Err(entry);
        }
        state.pending.push(entry);
        Ok(state.pending.len())
    }

    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Dispatches every pending facet set, one call per wrapped logic, and
    /// returns how many were dispatched.
    pub fn flush(&self) -> usize {
        let entries = std::mem::take(&mut self.state().pending);
        self.cancel_timer();
        if entries.is_empty() {
            return 0;
        }

        let batch_size = entries.len();
        let mut groups: Vec<(Arc<dyn OutputLogic>, Vec<PendingEntry>)> = Vec::new();
        for entry in entries {
            match groups
                .iter_mut()
                .find(|(logic, _)| same_logic(logic, &entry.logic))
            {
                Some((_, group)) => group.push(entry),
                None => groups.push((entry.logic.clone(), vec![entry])),
            }
        }

        BatchFlushed {
            batch_size,
            logic_groups: groups.len(),
        }
        .log();

        for (logic, entries) in groups {
            let mut seen = HashSet::new();
            let distinct: Vec<Facets> = entries
                .iter()
                .filter(|entry| seen.insert(entry.facets.clone()))
                .map(|entry| entry.facets.clone())
                .collect();

            let results: HashMap<Facets, Shared<LogicFuture>> = logic
                .execute(distinct)
                .into_iter()
                .map(|(facets, output)| (facets, output.shared()))
                .collect();

            for entry in entries {
                match results.get(&entry.facets) {
                    Some(output) => {
                        let _ = entry.reply.send(output.clone().boxed());
                    }
                    None => entry.fail(FacetError::MissingOutput),
                }
            }
        }
        batch_size
    }

    /// Fails the pending facet sets submitted by one decorator instance.
    fn fail_owned(&self, owner: u64) {
        let owned: Vec<_> = {
            let mut state = self.state();
            let (owned, kept) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|entry| entry.owner == owner);
            state.pending = kept;
            owned
        };
        for entry in owned {
            entry.fail(FacetError::Closed);
        }
    }

    /// Fails everything pending and rejects later submissions.
    pub fn close(&self) {
        let pending = {
            let mut state = self.state();
            state.closed = true;
            std::mem::take(&mut state.pending)
        };
        self.cancel_timer();
        for entry in pending {
            entry.fail(FacetError::Closed);
        }
    }

    fn schedule_flush(self: &Arc<Self>, wait: Duration) {
        let Ok(handle) = Handle::try_current() else {
            self.flush();
            return;
        };
        let token = CancellationToken::new();
        if let Some(previous) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone())
        {
            previous.cancel();
        }
        let buffer = Arc::clone(self);
        handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(wait) => {
                    buffer.flush();
                }
            }
        });
    }

    fn cancel_timer(&self) {
        if let Some(token) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }
}

fn same_logic(a: &Arc<dyn OutputLogic>, b: &Arc<dyn OutputLogic>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

struct ModulationState {
    owner: u64,
    lease: Mutex<Option<Lease<BatchBuffer>>>,
    modulator: Arc<dyn InputModulator>,
}

impl ModulationState {
    fn buffer(&self) -> Option<Arc<BatchBuffer>> {
        self.lease
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|lease| lease.shared().ok())
    }
}

/// Batching decorator backed by a leased [`BatchBuffer`].
pub struct InputModulationDecorator {
    id: String,
    state: Arc<ModulationState>,
}

impl InputModulationDecorator {
    /// A decorator created after `pool` closed starts closed.
    pub fn new(
        id: impl Into<String>,
        pool: &MultiLeasePool<BatchBuffer>,
        modulator: Arc<dyn InputModulator>,
    ) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(ModulationState {
                owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
                lease: Mutex::new(pool.lease().ok()),
                modulator,
            }),
        }
    }
}

impl OutputLogicDecorator for InputModulationDecorator {
    fn decorate(
        &self,
        logic: Arc<dyn OutputLogic>,
        _context: &LogicExecutionContext,
    ) -> Arc<dyn OutputLogic> {
        Arc::new(ModulatedLogic {
            state: self.state.clone(),
            inner: logic,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn flush(&self) -> usize {
        self.state.buffer().map_or(0, |buffer| buffer.flush())
    }

    fn close(&self) {
        let lease = self
            .state
            .lease
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut lease) = lease {
            if let Ok(buffer) = lease.get() {
                buffer.fail_owned(self.state.owner);
            }
            lease.release();
        }
    }
}

struct ModulatedLogic {
    state: Arc<ModulationState>,
    inner: Arc<dyn OutputLogic>,
}

fn closed() -> LogicFuture {
    future::ready(Errable::with_error(FacetError::Closed)).boxed()
}

impl OutputLogic for ModulatedLogic {
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
        let mut results = LogicResults::new();
        let Some(buffer) = self.state.buffer() else {
            for facets in inputs {
                results.insert(facets, closed());
            }
            return results;
        };

        let mut flush = false;
        let mut started_batch = false;
        for facets in inputs {
            if results.contains_key(&facets) {
                continue;
            }
            let (reply, response) = oneshot::channel();
            let entry = PendingEntry {
                owner: self.state.owner,
                logic: self.inner.clone(),
                facets: facets.clone(),
                reply,
            };
            let output = match buffer.push(entry) {
                Ok(pending) => {
                    started_batch |= pending == 1;
                    flush |= self.state.modulator.should_flush(pending);
                    async move {
                        match response.await {
                            Ok(output) => output.await,
                            Err(_) => Errable::with_error(FacetError::Closed),
                        }
                    }
                    .boxed()
                }
                Err(_) => closed(),
            };
            results.insert(facets, output);
        }

        if flush {
            buffer.flush();
        } else if started_batch {
            if let Some(wait) = self.state.modulator.max_wait() {
                buffer.schedule_flush(wait);
            }
        }
        results
    }
}

/// Pool and strategy shared by every modulation decorator of one executor.
#[derive(Clone)]
pub struct InputModulationConfig {
    pool: MultiLeasePool<BatchBuffer>,
    modulator: Arc<dyn InputModulator>,
}

impl InputModulationConfig {
    pub fn new(pool: MultiLeasePool<BatchBuffer>, modulator: Arc<dyn InputModulator>) -> Self {
        Self { pool, modulator }
    }

    pub fn from_options(modulation: &ModulationConfig, lease_pool: &LeasePoolConfig) -> Self {
        let pool = MultiLeasePool::new(
            BatchBuffer::new,
            lease_pool.max_active_leases_per_object(),
            BatchBuffer::close,
        )
        .with_idle_strike_threshold(lease_pool.idle_strike_threshold());
        let modulator = Arc::new(BatchSizeModulator::new(
            modulation.max_batch_size(),
            modulation.max_wait(),
        ));
        Self::new(pool, modulator)
    }

    pub fn pool(&self) -> &MultiLeasePool<BatchBuffer> {
        &self.pool
    }

    /// One decorator per dependant chain of every kryon tagged with
    /// [`MODULATED_TAG`]; closing the executor closes the pool.
    pub fn decorator_config(&self) -> DecoratorConfig {
        let pool = self.pool.clone();
        let modulator = self.modulator.clone();
        let closer = self.pool.clone();
        DecoratorConfig::per_dependant_chain(INPUT_MODULATION, move |context| {
            Arc::new(InputModulationDecorator::new(
                context.instance_id.clone(),
                &pool,
                modulator.clone(),
            )) as Arc<dyn OutputLogicDecorator>
        })
        .when(|context| context.definition.output_tags().contains_key(MODULATED_TAG))
        .with_closer(move || closer.close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependantChain, KryonDefinition, KryonDefinitionRegistry};
    use serde_json::{json, Value};

    /// Squares `n` and records the size of every batch it receives.
    #[derive(Default)]
    struct Square {
        batches: Mutex<Vec<usize>>,
    }

    impl OutputLogic for Square {
        fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
            self.batches
                .lock()
                .unwrap()
                .push(inputs.len());
            inputs
                .into_iter()
                .map(|facets| {
                    let n = facets.input("n").value().and_then(Value::as_i64).unwrap_or(0);
                    let output: LogicFuture = future::ready(Errable::with_value(json!(n * n))).boxed();
                    (facets, output)
                })
                .collect()
        }
    }

    fn context(logic: Arc<dyn OutputLogic>) -> LogicExecutionContext {
        let registry = Arc::new(KryonDefinitionRegistry::new());
        let definition = registry
            .define(KryonDefinition::builder("square", logic).build())
            .unwrap();
        LogicExecutionContext {
            kryon_id: "square".into(),
            dependants: DependantChain::start(),
            definition,
            registry,
        }
    }

    fn pool(cap: usize) -> MultiLeasePool<BatchBuffer> {
        MultiLeasePool::new(BatchBuffer::new, cap, BatchBuffer::close)
    }

    fn n(value: i64) -> Facets {
        Facets::new().with("n", json!(value))
    }

    fn modulated(
        decorator: &InputModulationDecorator,
        square: &Arc<Square>,
    ) -> Arc<dyn OutputLogic> {
        let logic: Arc<dyn OutputLogic> = square.clone();
        decorator.decorate(logic.clone(), &context(logic))
    }

    #[tokio::test]
    async fn test_batch_flushes_when_size_reached() {
        let square = Arc::new(Square::default());
        let decorator = InputModulationDecorator::new(
            "d",
            &pool(4),
            Arc::new(BatchSizeModulator::new(3, None)),
        );
        let logic = modulated(&decorator, &square);

        let outputs: Vec<_> = (1..=3)
            .map(|i| logic.execute(vec![n(i)]).remove(&n(i)).unwrap())
            .collect();
        let values = futures::future::join_all(outputs).await;

        assert_eq!(*square.batches.lock().unwrap(), vec![3]);
        assert_eq!(
            values,
            vec![
                Errable::with_value(json!(1)),
                Errable::with_value(json!(4)),
                Errable::with_value(json!(9)),
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_flush_dispatches_pending() {
        let square = Arc::new(Square::default());
        let decorator = InputModulationDecorator::new(
            "d",
            &pool(4),
            Arc::new(BatchSizeModulator::new(100, None)),
        );
        let logic = modulated(&decorator, &square);

        let mut output = logic.execute(vec![n(5)]).remove(&n(5)).unwrap();
        assert!((&mut output).now_or_never().is_none());

        decorator.flush();

        assert_eq!(output.await, Errable::with_value(json!(25)));
    }

    #[tokio::test]
    async fn test_max_wait_forces_flush() {
        let square = Arc::new(Square::default());
        let decorator = InputModulationDecorator::new(
            "d",
            &pool(4),
            Arc::new(BatchSizeModulator::new(100, Some(Duration::from_millis(5)))),
        );
        let logic = modulated(&decorator, &square);

        let output = logic.execute(vec![n(2), n(3)]).remove(&n(3)).unwrap();

        assert_eq!(output.await, Errable::with_value(json!(9)));
        assert_eq!(*square.batches.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_instances_sharing_a_buffer_flush_together() {
        let square = Arc::new(Square::default());
        let shared_pool = pool(2);
        let modulator: Arc<dyn InputModulator> = Arc::new(BatchSizeModulator::new(100, None));
        let first = InputModulationDecorator::new("a", &shared_pool, modulator.clone());
        let second = InputModulationDecorator::new("b", &shared_pool, modulator);

        let from_first = modulated(&first, &square).execute(vec![n(1)]).remove(&n(1)).unwrap();
        let from_second = modulated(&second, &square).execute(vec![n(2)]).remove(&n(2)).unwrap();
        first.flush();

        assert_eq!(from_first.await, Errable::with_value(json!(1)));
        assert_eq!(from_second.await, Errable::with_value(json!(4)));
        assert_eq!(shared_pool.pool_size(), 1);
        assert_eq!(*square.batches.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_later_submissions() {
        let square = Arc::new(Square::default());
        let decorator = InputModulationDecorator::new(
            "d",
            &pool(4),
            Arc::new(BatchSizeModulator::new(100, None)),
        );
        let logic = modulated(&decorator, &square);
        let pending = logic.execute(vec![n(1)]).remove(&n(1)).unwrap();

        decorator.close();
        let late = logic.execute(vec![n(2)]).remove(&n(2)).unwrap();

        assert_eq!(pending.await, Errable::with_error(FacetError::Closed));
        assert_eq!(late.await, Errable::with_error(FacetError::Closed));
        assert!(square.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pool_close_fails_buffered_work() {
        let square = Arc::new(Square::default());
        let buffers = pool(4);
        let decorator = InputModulationDecorator::new(
            "d",
            &buffers,
            Arc::new(BatchSizeModulator::new(100, None)),
        );
        let pending = modulated(&decorator, &square)
            .execute(vec![n(1)])
            .remove(&n(1))
            .unwrap();

        buffers.close();

        assert_eq!(pending.await, Errable::with_error(FacetError::Closed));
    }
}
