// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-request memoization.
//!
//! A request scope maps (kryon, facet set) to the shared future of that
//! invocation. It lives as long as at least one root response of the request
//! is pending; the last [`RequestGuard`] to drop clears the memo and forgets
//! the scope.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::data::{Errable, Facets};
use crate::graph::{KryonId, RequestId};
use crate::observability::messages::engine::RequestReleased;
use crate::observability::messages::StructuredLog;

pub(crate) type MemoFuture = Shared<BoxFuture<'static, Errable<Value>>>;

pub(crate) type Requests = Arc<Mutex<HashMap<RequestId, Arc<RequestScope>>>>;

pub(crate) struct RequestScope {
    request_id: RequestId,
    memo: Mutex<HashMap<(KryonId, Facets), MemoFuture>>,
    // only changed while the requests map is locked
    roots: Mutex<usize>,
}

impl RequestScope {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            memo: Mutex::new(HashMap::new()),
            roots: Mutex::new(0),
        }
    }

    pub(crate) fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    fn memo(&self) -> MutexGuard<'_, HashMap<(KryonId, Facets), MemoFuture>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The memoized invocation of `kryon_id` with `facets`, started by
    /// `start` the first time it is asked for. Returns whether it was new.
    pub(crate) fn memoized(
        &self,
        kryon_id: &KryonId,
        facets: &Facets,
        start: impl FnOnce() -> BoxFuture<'static, Errable<Value>>,
    ) -> (MemoFuture, bool) {
        let mut memo = self.memo();
        let key = (kryon_id.clone(), facets.clone());
        if let Some(existing) = memo.get(&key) {
            return (existing.clone(), false);
        }
        let output = start().shared();
        memo.insert(key, output.clone());
        (output, true)
    }

    pub(crate) fn memo_size(&self) -> usize {
        self.memo().len()
    }
}

/// Keeps a request scope alive for one root response.
pub(crate) struct RequestGuard {
    requests: Requests,
    scope: Arc<RequestScope>,
}

impl RequestGuard {
    pub(crate) fn acquire(requests: &Requests, request_id: RequestId) -> Self {
        let mut map = requests.lock().unwrap_or_else(PoisonError::into_inner);
        let scope = map
            .entry(request_id.clone())
            .or_insert_with(|| Arc::new(RequestScope::new(request_id)))
            .clone();
        *scope.roots.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Self {
            requests: requests.clone(),
            scope,
        }
    }

    pub(crate) fn scope(&self) -> &Arc<RequestScope> {
        &self.scope
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let mut map = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let mut roots = self.scope.roots.lock().unwrap_or_else(PoisonError::into_inner);
        *roots = roots.saturating_sub(1);
        if *roots > 0 {
            return;
        }
        drop(roots);

        if map
            .get(&self.scope.request_id)
            .is_some_and(|scope| Arc::ptr_eq(scope, &self.scope))
        {
            map.remove(&self.scope.request_id);
        }
        drop(map);

        // release memoized futures outside the locks
        let memo = std::mem::take(&mut *self.scope.memo());
        RequestReleased {
            request_id: self.scope.request_id.as_str(),
            memoized: memo.len(),
        }
        .log();
        drop(memo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future;
    use serde_json::json;

    fn requests() -> Requests {
        Arc::new(Mutex::new(HashMap::new()))
    }

    #[test]
    fn test_memoized_starts_once_per_key() {
        let scope = RequestScope::new("r".into());
        let facets = Facets::new().with("n", json!(1));
        let mut started = 0;

        for _ in 0..3 {
            scope.memoized(&"k".into(), &facets, || {
                started += 1;
                future::ready(Errable::Empty).boxed()
            });
        }
        scope.memoized(&"other".into(), &facets, || future::ready(Errable::Empty).boxed());

        assert_eq!(started, 1);
        assert_eq!(scope.memo_size(), 2);
    }

    #[test]
    fn test_last_guard_releases_scope() {
        let requests = requests();
        let first = RequestGuard::acquire(&requests, "r".into());
        let second = RequestGuard::acquire(&requests, "r".into());
        assert!(Arc::ptr_eq(first.scope(), second.scope()));
        first
            .scope()
            .memoized(&"k".into(), &Facets::new(), || future::ready(Errable::Empty).boxed());

        let scope = first.scope().clone();
        drop(first);
        assert_eq!(requests.lock().unwrap().len(), 1);
        assert_eq!(scope.memo_size(), 1);

        drop(second);
        assert!(requests.lock().unwrap().is_empty());
        assert_eq!(scope.memo_size(), 0);
    }
}
