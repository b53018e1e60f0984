// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A pool whose objects are shared by a bounded number of concurrent leases.
//!
//! Leasing scans the queue round-robin for an object below the per-object
//! lease cap and creates a new object when none is found. Objects that keep
//! dropping back to zero leases without ever being shared accumulate idle
//! strikes; once the strikes exceed the threshold the object is destroyed the
//! next time it goes idle, so the pool shrinks back after a burst.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::consts::DEFAULT_IDLE_STRIKE_THRESHOLD;
use crate::errors::PoolError;
use crate::observability::messages::pool::{PoolClosed, PooledObjectCreated, PooledObjectDestroyed};
use crate::observability::messages::StructuredLog;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Destroyer<T> = Box<dyn Fn(&T) + Send + Sync>;

struct PooledObject<T> {
    id: u64,
    value: Arc<T>,
    active_leases: usize,
    idle_strikes: usize,
}

struct PoolState<T> {
    queue: VecDeque<PooledObject<T>>,
    next_id: u64,
    closed: bool,
    idle_strike_threshold: usize,
    max_pool_size: usize,
    peak_avg_active_leases: f64,
}

impl<T> PoolState<T> {
    fn record_peaks(&mut self) {
        self.max_pool_size = self.max_pool_size.max(self.queue.len());
        if !self.queue.is_empty() {
            let active: usize = self.queue.iter().map(|o| o.active_leases).sum();
            let average = active as f64 / self.queue.len() as f64;
            if average > self.peak_avg_active_leases {
                self.peak_avg_active_leases = average;
            }
        }
    }
}

struct PoolInner<T> {
    state: Mutex<PoolState<T>>,
    factory: Factory<T>,
    destroyer: Destroyer<T>,
    max_active_leases_per_object: usize,
}

impl<T> PoolInner<T> {
    fn state(&self) -> MutexGuard<'_, PoolState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, object_id: u64) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        let Some(position) = state.queue.iter().position(|o| o.id == object_id) else {
            return;
        };

        let threshold = state.idle_strike_threshold;
        let object = &mut state.queue[position];
        object.active_leases = object.active_leases.saturating_sub(1);
        if object.active_leases > 0 || self.max_active_leases_per_object <= 1 {
            return;
        }

        object.idle_strikes += 1;
        if object.idle_strikes > threshold {
            if let Some(object) = state.queue.remove(position) {
                (self.destroyer)(&object.value);
                PooledObjectDestroyed {
                    object_id: object.id,
                    idle_strikes: object.idle_strikes,
                    pool_size: state.queue.len(),
                }
                .log();
            }
        }
    }
}

/// Pool of objects that can each be leased up to `max_active_leases_per_object`
/// times at once.
pub struct MultiLeasePool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for MultiLeasePool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> MultiLeasePool<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(
        factory: impl Fn() -> T + Send + Sync + 'static,
        max_active_leases_per_object: usize,
        destroyer: impl Fn(&T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    next_id: 0,
                    closed: false,
                    idle_strike_threshold: DEFAULT_IDLE_STRIKE_THRESHOLD,
                    max_pool_size: 0,
                    peak_avg_active_leases: 0.0,
                }),
                factory: Box::new(factory),
                destroyer: Box::new(destroyer),
                max_active_leases_per_object: max_active_leases_per_object.max(1),
            }),
        }
    }

    pub fn with_idle_strike_threshold(self, idle_strike_threshold: usize) -> Self {
        self.inner.state().idle_strike_threshold = idle_strike_threshold;
        self
    }

    /// Leases the first object below the cap, creating one if none is.
    /// Idle strikes reset only when the lease makes the object shared (more
    /// than one active lease), so repeated solo use still strikes out.
    pub fn lease(&self) -> Result<Lease<T>, PoolError> {
        let mut state = self.inner.state();
        if state.closed {
            return Err(PoolError::PoolClosed);
        }

        let cap = self.inner.max_active_leases_per_object;
        let mut leased = None;
        for _ in 0..state.queue.len() {
            let Some(mut object) = state.queue.pop_front() else {
                break;
            };
            if leased.is_none() && object.active_leases < cap {
                object.active_leases += 1;
                if object.active_leases > 1 {
                    object.idle_strikes = 0;
                }
                leased = Some((object.id, object.value.clone()));
            }
            state.queue.push_back(object);
            if leased.is_some() {
                break;
            }
        }

        let (object_id, value) = match leased {
            Some(leased) => leased,
            None => {
                let id = state.next_id;
                state.next_id += 1;
                let value = Arc::new((self.inner.factory)());
                state.queue.push_back(PooledObject {
                    id,
                    value: value.clone(),
                    active_leases: 1,
                    idle_strikes: 0,
                });
                PooledObjectCreated {
                    object_id: id,
                    pool_size: state.queue.len(),
                }
                .log();
                (id, value)
            }
        };

        state.record_peaks();
        Ok(Lease {
            pool: self.inner.clone(),
            object_id,
            value: Some(value),
        })
    }

    /// Destroys every pooled object, leased or not, and rejects further
    /// leases. Idempotent.
    pub fn close(&self) {
        let mut state = self.inner.state();
        if state.closed {
            return;
        }
        state.closed = true;
        let destroyed = state.queue.len();
        for object in state.queue.drain(..) {
            (self.inner.destroyer)(&object.value);
        }
        PoolClosed { destroyed }.log();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    pub fn pool_size(&self) -> usize {
        self.inner.state().queue.len()
    }

    pub fn max_pool_size(&self) -> usize {
        self.inner.state().max_pool_size
    }

    pub fn peak_avg_active_leases_per_object(&self) -> f64 {
        self.inner.state().peak_avg_active_leases
    }
}

/// A share of one pooled object. Released explicitly or on drop.
pub struct Lease<T> {
    pool: Arc<PoolInner<T>>,
    object_id: u64,
    value: Option<Arc<T>>,
}

impl<T> Lease<T> {
    pub fn get(&self) -> Result<&T, PoolError> {
        self.value.as_deref().ok_or(PoolError::LeaseAlreadyReleased)
    }

    pub fn shared(&self) -> Result<Arc<T>, PoolError> {
        self.value.clone().ok_or(PoolError::LeaseAlreadyReleased)
    }

    /// Returns the share to the pool. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.value.take().is_some() {
            self.pool.release(self.object_id);
        }
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        self.release();
    }
}
