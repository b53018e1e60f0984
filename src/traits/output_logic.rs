// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{Errable, Facets};
use crate::errors::FacetError;

/// Future of one facet set's output.
pub type LogicFuture = BoxFuture<'static, Errable<Value>>;

/// One future per distinct facet set handed to [`OutputLogic::execute`].
pub type LogicResults = HashMap<Facets, LogicFuture>;

/// The uniform output-logic contract every kryon is executed through.
///
/// Implementations receive a batch of facet sets and return one future per
/// distinct set. Decorators wrap this contract, so a batching decorator can
/// hand a single call many sets collected from independent invocations.
pub trait OutputLogic: Send + Sync {
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults;
}

/// Per-invocation async logic, for kryons that do not care about batching.
#[async_trait]
pub trait KryonLogic: Send + Sync {
    async fn compute(&self, facets: Facets) -> Result<Value, FacetError>;
}

struct AsyncLogic<L>(Arc<L>);

impl<L> OutputLogic for AsyncLogic<L>
where
    L: KryonLogic + 'static,
{
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
        inputs
            .into_iter()
            .map(|facets| {
                let logic = self.0.clone();
                let key = facets.clone();
                let output = async move { Errable::from(logic.compute(facets).await) }.boxed();
                (key, output)
            })
            .collect()
    }
}

struct ComputeLogic<F>(F);

impl<F> OutputLogic for ComputeLogic<F>
where
    F: Fn(&Facets) -> Result<Value, FacetError> + Send + Sync,
{
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
        inputs
            .into_iter()
            .map(|facets| {
                let output = Errable::from((self.0)(&facets));
                (facets, future::ready(output).boxed())
            })
            .collect()
    }
}

/// Adapts a [`KryonLogic`] to the batch contract.
pub fn async_logic<L>(logic: L) -> Arc<dyn OutputLogic>
where
    L: KryonLogic + 'static,
{
    Arc::new(AsyncLogic(Arc::new(logic)))
}

/// Adapts a synchronous closure to the batch contract.
pub fn compute_logic<F>(compute: F) -> Arc<dyn OutputLogic>
where
    F: Fn(&Facets) -> Result<Value, FacetError> + Send + Sync + 'static,
{
    Arc::new(ComputeLogic(compute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl KryonLogic for Echo {
        async fn compute(&self, facets: Facets) -> Result<Value, FacetError> {
            facets
                .input("text")
                .value()
                .cloned()
                .ok_or_else(|| FacetError::failed("text missing"))
        }
    }

    #[tokio::test]
    async fn test_async_logic_returns_one_future_per_facet_set() {
        let logic = async_logic(Echo);
        let first = Facets::new().with("text", json!("a"));
        let second = Facets::new();

        let mut results = logic.execute(vec![first.clone(), second.clone()]);

        assert_eq!(results.len(), 2);
        let first_output = results.remove(&first).unwrap().await;
        let second_output = results.remove(&second).unwrap().await;
        assert_eq!(first_output, Errable::with_value(json!("a")));
        assert_eq!(
            second_output,
            Errable::with_error(FacetError::failed("text missing"))
        );
    }

    #[tokio::test]
    async fn test_compute_logic_collapses_duplicate_facet_sets() {
        let logic = compute_logic(|_| Ok(json!(1)));
        let facets = Facets::new().with("n", json!(1));

        let results = logic.execute(vec![facets.clone(), facets]);

        assert_eq!(results.len(), 1);
    }
}
