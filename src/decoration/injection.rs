// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Session input injection.

use futures::future::{self, FutureExt};
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{Errable, FacetValue, Facets};
use crate::decoration::{DecoratorConfig, LogicExecutionContext};
use crate::errors::FacetError;
use crate::graph::{InputDefinition, KryonDefinition};
use crate::observability::messages::decoration::InjectionFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::{InjectionProvider, LogicResults, OutputLogic, OutputLogicDecorator};

pub const INPUT_INJECTION: &str = "input_injection";

/// Fills empty session-sourced inputs from an [`InjectionProvider`].
///
/// Stateless, so one instance serves every chain of a kryon.
pub struct InputInjector {
    id: String,
    provider: Option<Arc<dyn InjectionProvider>>,
}

impl InputInjector {
    pub fn new(id: impl Into<String>, provider: Option<Arc<dyn InjectionProvider>>) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }

    /// Decorates every kryon that declares a session-sourced input.
    pub fn config(provider: Option<Arc<dyn InjectionProvider>>) -> DecoratorConfig {
        DecoratorConfig::new(
            INPUT_INJECTION,
            |context: &LogicExecutionContext| {
                context
                    .definition
                    .inputs()
                    .iter()
                    .any(InputDefinition::is_session_sourced)
            },
            |_| INPUT_INJECTION.to_string(),
            move |context| {
                Arc::new(InputInjector::new(
                    context.instance_id.clone(),
                    provider.clone(),
                )) as Arc<dyn OutputLogicDecorator>
            },
        )
    }
}

impl OutputLogicDecorator for InputInjector {
    fn decorate(
        &self,
        logic: Arc<dyn OutputLogic>,
        context: &LogicExecutionContext,
    ) -> Arc<dyn OutputLogic> {
        Arc::new(InjectingLogic {
            inner: logic,
            definition: context.definition.clone(),
            provider: self.provider.clone(),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

struct InjectingLogic {
    inner: Arc<dyn OutputLogic>,
    definition: Arc<KryonDefinition>,
    provider: Option<Arc<dyn InjectionProvider>>,
}

impl InjectingLogic {
    fn inject(&self, facets: &Facets) -> Facets {
        let mut injected = facets.clone();
        for input in self.definition.inputs() {
            if !input.is_session_sourced() || !facets.input(&input.name).is_empty() {
                continue;
            }
            let value = match self.resolve(input) {
                Ok(value) => Errable::with_value(value),
                Err(error) => {
                    InjectionFailed {
                        kryon_id: self.definition.id().as_str(),
                        input: &input.name,
                        error: &error,
                    }
                    .log();
                    Errable::with_error(error)
                }
            };
            injected.insert(input.name.clone(), FacetValue::Single(value));
        }
        injected
    }

    fn resolve(&self, input: &InputDefinition) -> Result<serde_json::Value, FacetError> {
        let provider = self.provider.as_ref().ok_or_else(|| FacetError::Injection {
            input: input.name.clone(),
            reason: "no injection provider configured".to_string(),
        })?;

        input
            .named_tag()
            .and_then(|name| provider.get_named_instance(&input.data_type, name))
            .or_else(|| provider.get_instance(&input.data_type))
            .ok_or_else(|| FacetError::Injection {
                input: input.name.clone(),
                reason: format!("no instance of type '{}'", input.data_type),
            })
    }
}

impl OutputLogic for InjectingLogic {
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
        // injected set -> the caller's sets that map onto it
        let mut originals: HashMap<Facets, Vec<Facets>> = HashMap::new();
        let mut order = Vec::new();
        for facets in inputs {
            let injected = self.inject(&facets);
            let callers = originals.entry(injected.clone()).or_default();
            if callers.is_empty() {
                order.push(injected);
            }
            callers.push(facets);
        }

        let mut results = self.inner.execute(order.clone());
        let mut remapped = LogicResults::new();
        for injected in order {
            let output = results
                .remove(&injected)
                .unwrap_or_else(|| future::ready(Errable::with_error(FacetError::MissingOutput)).boxed());
            let mut callers = originals.remove(&injected).unwrap_or_default();
            if callers.len() == 1 {
                if let Some(facets) = callers.pop() {
                    remapped.insert(facets, output);
                }
                continue;
            }
            let shared = output.shared();
            for facets in callers {
                remapped.insert(facets, shared.clone().boxed());
            }
        }
        remapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependantChain, KryonDefinitionRegistry};
    use crate::traits::compute_logic;
    use serde_json::{json, Value};

    struct Session;

    impl InjectionProvider for Session {
        fn get_instance(&self, data_type: &str) -> Option<Value> {
            match data_type {
                "user" => Some(json!("default-user")),
                _ => None,
            }
        }

        fn get_named_instance(&self, data_type: &str, name: &str) -> Option<Value> {
            (data_type == "user" && name == "admin").then(|| json!("root"))
        }
    }

    fn echo_inputs() -> Arc<dyn OutputLogic> {
        compute_logic(|facets| {
            let render = |name: &str| match facets.input(name) {
                Errable::Value(value) => value.to_string(),
                Errable::Error(_) => "error".to_string(),
                Errable::Empty => "empty".to_string(),
            };
            Ok(json!(format!(
                "{}|{}|{}",
                render("user"),
                render("admin"),
                render("token")
            )))
        })
    }

    fn injected_logic(provider: Option<Arc<dyn InjectionProvider>>) -> Arc<dyn OutputLogic> {
        let registry = Arc::new(KryonDefinitionRegistry::new());
        let definition = registry
            .define(
                KryonDefinition::builder("k", echo_inputs())
                    .input(InputDefinition::session("user", "user").also_from(
                        crate::graph::InputSource::Client,
                    ))
                    .input(InputDefinition::session("admin", "user").named("admin"))
                    .input(InputDefinition::session("token", "token"))
                    .build(),
            )
            .unwrap();
        let context = LogicExecutionContext {
            kryon_id: "k".into(),
            dependants: DependantChain::start(),
            definition: definition.clone(),
            registry,
        };
        InputInjector::new("test", provider).decorate(definition.logic().clone(), &context)
    }

    #[tokio::test]
    async fn test_session_inputs_resolve_by_name_then_type() {
        let logic = injected_logic(Some(Arc::new(Session)));
        let facets = Facets::new();

        let output = logic.execute(vec![facets.clone()]).remove(&facets).unwrap().await;

        assert_eq!(
            output,
            Errable::with_value(json!("\"default-user\"|\"root\"|error"))
        );
    }

    #[tokio::test]
    async fn test_client_value_is_left_untouched() {
        let logic = injected_logic(Some(Arc::new(Session)));
        let facets = Facets::new().with("user", json!("alice"));

        let output = logic.execute(vec![facets.clone()]).remove(&facets).unwrap().await;

        assert_eq!(
            output,
            Errable::with_value(json!("\"alice\"|\"root\"|error"))
        );
    }

    #[tokio::test]
    async fn test_missing_provider_fails_per_facet() {
        let logic = injected_logic(None);
        let facets = Facets::new();

        let output = logic.execute(vec![facets.clone()]).remove(&facets).unwrap().await;

        assert_eq!(output, Errable::with_value(json!("error|error|error")));
    }

    #[tokio::test]
    async fn test_results_keyed_by_original_facets() {
        let logic = injected_logic(Some(Arc::new(Session)));
        let empty = Facets::new();
        let explicit = Facets::new().with("user", json!("default-user"));

        let mut results = logic.execute(vec![empty.clone(), explicit.clone()]);

        assert_eq!(results.len(), 2);
        let a = results.remove(&empty).unwrap().await;
        let b = results.remove(&explicit).unwrap().await;
        assert_eq!(a, b);
    }
}
