// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolver definitions: the per-edge logic that computes the inputs of a
//! dependency from the facets of the kryon that depends on it.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::data::Facets;

/// What a resolver wants done with its dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverCommand {
    /// Invoke the dependency once with these target inputs.
    Execute(Facets),
    /// Invoke the dependency once per facet set. An empty list invokes it
    /// zero times.
    Fanout(Vec<Facets>),
    /// Drop this resolver's contribution.
    Skip(String),
}

impl ResolverCommand {
    pub fn execute(facets: Facets) -> Self {
        ResolverCommand::Execute(facets)
    }

    pub fn fanout(sets: impl IntoIterator<Item = Facets>) -> Self {
        ResolverCommand::Fanout(sets.into_iter().collect())
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        ResolverCommand::Skip(reason.into())
    }
}

/// Transform run by a resolver against the facets it consumes.
pub trait ResolverLogic: Send + Sync {
    fn resolve(&self, sources: &Facets) -> ResolverCommand;
}

impl<F> ResolverLogic for F
where
    F: Fn(&Facets) -> ResolverCommand + Send + Sync,
{
    fn resolve(&self, sources: &Facets) -> ResolverCommand {
        self(sources)
    }
}

/// A guard evaluated before the resolver transform. The first predicate that
/// holds drops the resolver's contribution with its reason.
#[derive(Clone)]
pub struct SkipPredicate {
    pub reason: String,
    condition: Arc<dyn Fn(&Facets) -> bool + Send + Sync>,
}

impl SkipPredicate {
    pub fn new(
        reason: impl Into<String>,
        condition: impl Fn(&Facets) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            reason: reason.into(),
            condition: Arc::new(condition),
        }
    }

    pub fn applies(&self, sources: &Facets) -> bool {
        (self.condition)(sources)
    }
}

impl Debug for SkipPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipPredicate")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Resolver of one dependency edge.
///
/// `sources` are facet names of the owning kryon (inputs or dependencies); an
/// empty list makes the resolver unconditional. `targets` are input names on
/// the dependency kryon.
#[derive(Clone)]
pub struct ResolverDefinition {
    pub sources: Vec<String>,
    pub dependency: String,
    pub targets: Vec<String>,
    pub skip_predicates: Vec<SkipPredicate>,
    pub logic: Arc<dyn ResolverLogic>,
}

impl ResolverDefinition {
    pub fn new<I, S>(
        dependency: impl Into<String>,
        targets: I,
        logic: impl ResolverLogic + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: Vec::new(),
            dependency: dependency.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            skip_predicates: Vec::new(),
            logic: Arc::new(logic),
        }
    }

    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn skip_when(
        mut self,
        reason: impl Into<String>,
        condition: impl Fn(&Facets) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.skip_predicates.push(SkipPredicate::new(reason, condition));
        self
    }

    /// Runs the skip predicates then the transform against `sources`.
    pub fn resolve(&self, sources: &Facets) -> ResolverCommand {
        if let Some(predicate) = self.skip_predicates.iter().find(|p| p.applies(sources)) {
            return ResolverCommand::Skip(predicate.reason.clone());
        }
        self.logic.resolve(sources)
    }
}

impl Debug for ResolverDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverDefinition")
            .field("sources", &self.sources)
            .field("dependency", &self.dependency)
            .field("targets", &self.targets)
            .field("skip_predicates", &self.skip_predicates)
            .finish_non_exhaustive()
    }
}

/// Fallback resolver for dependencies that have no declared resolvers.
///
/// Returning `None` means "not mine"; the dependency is then invoked once with
/// empty facets.
pub trait MultiResolver: Send + Sync {
    fn resolve(&self, dependency: &str, facets: &Facets) -> Option<ResolverCommand>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_matching_predicate_wins() {
        let resolver = ResolverDefinition::new("dep", ["x"], |_: &Facets| {
            ResolverCommand::execute(Facets::new().with("x", json!(1)))
        })
        .sources(["flag"])
        .skip_when("flag missing", |f: &Facets| !f.contains("flag"))
        .skip_when("flag false", |f: &Facets| f.input("flag").value() == Some(&json!(false)));

        let cases = vec![
            (Facets::new(), ResolverCommand::skip("flag missing")),
            (
                Facets::new().with("flag", json!(false)),
                ResolverCommand::skip("flag false"),
            ),
            (
                Facets::new().with("flag", json!(true)),
                ResolverCommand::execute(Facets::new().with("x", json!(1))),
            ),
        ];

        for (sources, expected) in cases {
            assert_eq!(resolver.resolve(&sources), expected);
        }
    }
}
