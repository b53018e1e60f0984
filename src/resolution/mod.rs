// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency resolution: turns the resolvers of one dependency edge into
//! the facet sets the dependency is invoked with.
//!
//! Resolvers are applied in declaration order. Each surviving resolver
//! contributes one set (`Execute`) or many (`Fanout`); contributions combine
//! as a cartesian product, so a single fan-out multiplies the invocations and
//! plain executes are merged into every set. A resolver that skips, through a
//! predicate or its own command, drops only its contribution. The dependency
//! itself is skipped only when every resolver dropped out.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::data::Facets;
use crate::errors::FacetError;
use crate::graph::{KryonDefinition, ResolverCommand};

/// What happens when two resolvers of one dependency write the same input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The resolver declared later overwrites the earlier value.
    #[default]
    LastDeclaredWins,
    /// The dependency facet fails with `ResolutionConflict`.
    Reject,
}

/// Outcome of resolving one dependency edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyCommand {
    /// Invoke the dependency once per facet set; an empty list means zero
    /// invocations.
    Execute(Vec<Facets>),
    /// Do not invoke the dependency; these are the collected skip reasons.
    Skip(Vec<String>),
    /// Resolution failed; the dependency facet carries this error.
    Conflict(FacetError),
}

/// Resolves `dependency` of `definition` against the kryon's current facets.
pub fn resolve_dependency(
    definition: &KryonDefinition,
    dependency: &str,
    facets: &Facets,
    policy: ConflictPolicy,
) -> DependencyCommand {
    let resolvers = definition.resolvers_for_dependency(dependency);

    if resolvers.is_empty() {
        let command = definition
            .multi_resolver()
            .and_then(|multi| multi.resolve(dependency, facets));
        return match command {
            Some(command) => single_command(command),
            None => DependencyCommand::Execute(vec![Facets::new()]),
        };
    }

    let mut merged = vec![Facets::new()];
    let mut skip_reasons = Vec::new();
    let mut contributed = false;
    let mut written: HashSet<&str> = HashSet::new();

    for resolver in resolvers {
        let sources = facets.subset(&resolver.sources);
        let contribution = match resolver.resolve(&sources) {
            ResolverCommand::Execute(set) => vec![set],
            ResolverCommand::Fanout(sets) => sets,
            ResolverCommand::Skip(reason) => {
                skip_reasons.push(reason);
                continue;
            }
        };
        contributed = true;

        for target in &resolver.targets {
            if !written.insert(target.as_str()) && policy == ConflictPolicy::Reject {
                return DependencyCommand::Conflict(FacetError::ResolutionConflict {
                    dependency: dependency.to_string(),
                    input: target.clone(),
                });
            }
        }

        merged = cartesian(merged, contribution);
    }

    if contributed {
        DependencyCommand::Execute(merged)
    } else {
        DependencyCommand::Skip(skip_reasons)
    }
}

fn single_command(command: ResolverCommand) -> DependencyCommand {
    match command {
        ResolverCommand::Execute(set) => DependencyCommand::Execute(vec![set]),
        ResolverCommand::Fanout(sets) => DependencyCommand::Execute(sets),
        ResolverCommand::Skip(reason) => DependencyCommand::Skip(vec![reason]),
    }
}

fn cartesian(merged: Vec<Facets>, contribution: Vec<Facets>) -> Vec<Facets> {
    let mut product = Vec::with_capacity(merged.len() * contribution.len());
    for base in &merged {
        for set in &contribution {
            let mut combined = base.clone();
            combined.extend(set.clone());
            product.push(combined);
        }
    }
    product
}
