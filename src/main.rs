// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use futures::future::{self, FutureExt};
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use kryonflow::config::load_and_validate_config;
use kryonflow::data::{Errable, Facets};
use kryonflow::decoration::modulation::MODULATED_TAG;
use kryonflow::engine::ExecutorFactory;
use kryonflow::errors::FacetError;
use kryonflow::graph::{
    InputDefinition, KryonDefinition, KryonDefinitionRegistry, RequestId, ResolverCommand,
    ResolverDefinition,
};
use kryonflow::traits::{compute_logic, InjectionProvider, LogicFuture, LogicResults, OutputLogic};

/// Squares every facet set of a batch in one call.
struct SquareBatch;

impl OutputLogic for SquareBatch {
    fn execute(&self, inputs: Vec<Facets>) -> LogicResults {
        println!("   squaring a batch of {}", inputs.len());
        inputs
            .into_iter()
            .map(|facets| {
                let output = match facets.input("n") {
                    Errable::Value(Value::Number(n)) => {
                        let n = n.as_i64().unwrap_or_default();
                        Errable::with_value(json!(n * n))
                    }
                    Errable::Error(error) => Errable::with_error(error),
                    _ => Errable::with_error(FacetError::failed("n is not an integer")),
                };
                let output: LogicFuture = future::ready(output).boxed();
                (facets, output)
            })
            .collect()
    }
}

/// Serves the `User` session type from the `USER` environment variable.
struct EnvSession;

impl InjectionProvider for EnvSession {
    fn get_instance(&self, data_type: &str) -> Option<Value> {
        match data_type {
            "User" => Some(json!(env::var("USER").unwrap_or_else(|_| "guest".to_string()))),
            _ => None,
        }
    }

    fn get_named_instance(&self, _data_type: &str, _name: &str) -> Option<Value> {
        None
    }
}

fn numbers_resolver(dependency: &str, target: &str) -> ResolverDefinition {
    let target_name = target.to_string();
    ResolverDefinition::new(dependency, [target], move |sources: &Facets| {
        let numbers = sources.input("numbers").value().cloned().unwrap_or(json!([]));
        ResolverCommand::execute(Facets::new().with(target_name.clone(), numbers))
    })
    .sources(["numbers"])
}

/// report(numbers, user) -> sum(numbers) -> square(n) for each n
fn define_demo_graph(registry: &KryonDefinitionRegistry) -> Result<()> {
    registry.define(
        KryonDefinition::builder("square", Arc::new(SquareBatch))
            .input(InputDefinition::client("n", "i64"))
            .tag(MODULATED_TAG, "true")
            .build(),
    )?;

    registry.define(
        KryonDefinition::builder(
            "sum",
            compute_logic(|facets: &Facets| {
                let mut total = 0;
                for (_, result) in facets.dependency_results("squares") {
                    if let Some(value) = result.into_result()? {
                        total += value.as_i64().unwrap_or_default();
                    }
                }
                Ok(json!(total))
            }),
        )
        .input(InputDefinition::client("numbers", "Vec<i64>"))
        .dependency("squares", "square")
        .resolver(
            ResolverDefinition::new("squares", ["n"], |sources: &Facets| {
                let numbers = sources
                    .input("numbers")
                    .value()
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                ResolverCommand::fanout(numbers.into_iter().map(|n| Facets::new().with("n", n)))
            })
            .sources(["numbers"])
            .skip_when("no numbers given", |sources| {
                sources
                    .input("numbers")
                    .value()
                    .and_then(Value::as_array)
                    .map_or(true, |numbers| numbers.is_empty())
            }),
        )
        .build(),
    )?;

    registry.define(
        KryonDefinition::builder(
            "report",
            compute_logic(|facets: &Facets| {
                let user = facets.input("user").into_result()?.unwrap_or(json!("nobody"));
                let numbers = facets.input("numbers").value().cloned().unwrap_or(json!([]));
                let total = match facets.dependency_value("total") {
                    Errable::Value(total) => total.to_string(),
                    Errable::Error(FacetError::Skipped { reasons }) => {
                        format!("nothing ({})", reasons.join(", "))
                    }
                    Errable::Error(error) => return Err(error),
                    Errable::Empty => "nothing".to_string(),
                };
                Ok(json!(format!(
                    "{}: sum of squares of {} is {}",
                    user.as_str().unwrap_or("?"),
                    numbers,
                    total
                )))
            }),
        )
        .input(InputDefinition::client("numbers", "Vec<i64>"))
        .input(InputDefinition::session("user", "User"))
        .dependency("total", "sum")
        .resolver(numbers_resolver("total", "numbers"))
        .build(),
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kryonflow=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <config.yaml|config.toml> [numbers...]", args[0]);
        eprintln!("Example: {} configs/demo.yaml 1 2 3 4", args[0]);
        std::process::exit(1);
    }

    let config_file = &args[1];
    let config = load_and_validate_config(config_file)
        .with_context(|| format!("Failed to load config '{}'", config_file))?;
    let numbers = args[2..]
        .iter()
        .map(|arg| {
            arg.parse::<i64>()
                .with_context(|| format!("'{}' is not an integer", arg))
        })
        .collect::<Result<Vec<_>>>()?;

    println!("🚀 Kryon Graph Demo");
    println!("═══════════════════");
    println!("Config: {}", config_file);
    println!("Numbers: {:?}", numbers);
    println!();

    let registry = Arc::new(KryonDefinitionRegistry::new());
    define_demo_graph(&registry)?;
    let executor = ExecutorFactory::from_config_with_injection(&config, registry, Arc::new(EnvSession));

    let start = Instant::now();
    let response = executor.execute_kryon(
        &"report".into(),
        Facets::new().with("numbers", json!(numbers)),
        RequestId::new("demo-1"),
    )?;
    let output = response.await;
    let elapsed = start.elapsed();
    executor.close();

    match output.into_result()? {
        Some(report) => println!("\n✅ {}", report.as_str().unwrap_or_default()),
        None => println!("\n⚠️  report produced no value"),
    }
    println!("⏱️  Completed in {:?}", elapsed);

    Ok(())
}
