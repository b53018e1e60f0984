// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Kryon definitions.
//!
//! A [`KryonDefinition`] is assembled with [`KryonDefinition::builder`] and
//! becomes usable once the registry has validated it and computed its views.
//! The views answer the questions the engine asks on every invocation:
//! which resolvers feed a dependency, which dependencies have none, and in
//! which order dependencies must be awaited when resolvers consume other
//! dependencies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::errors::DefinitionError;
use crate::graph::resolver::{MultiResolver, ResolverDefinition};
use crate::graph::KryonId;
use crate::traits::OutputLogic;

/// Tag key that narrows session injection to a named instance.
pub const NAMED_TAG: &str = "named";

/// Where an input's value may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Supplied by the caller or computed by a resolver.
    Client,
    /// Supplied by the session through input injection.
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDefinition {
    pub name: String,
    pub data_type: String,
    pub sources: BTreeSet<InputSource>,
    pub tags: BTreeMap<String, String>,
}

impl InputDefinition {
    pub fn client(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::with_source(name, data_type, InputSource::Client)
    }

    pub fn session(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::with_source(name, data_type, InputSource::Session)
    }

    fn with_source(
        name: impl Into<String>,
        data_type: impl Into<String>,
        source: InputSource,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            sources: BTreeSet::from([source]),
            tags: BTreeMap::new(),
        }
    }

    pub fn also_from(mut self, source: InputSource) -> Self {
        self.sources.insert(source);
        self
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        self.tag(NAMED_TAG, name)
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn is_session_sourced(&self) -> bool {
        self.sources.contains(&InputSource::Session)
    }

    pub fn is_client_sourced(&self) -> bool {
        self.sources.contains(&InputSource::Client)
    }

    pub fn named_tag(&self) -> Option<&str> {
        self.tags.get(NAMED_TAG).map(String::as_str)
    }
}

/// Output logic of a kryon plus its tags.
#[derive(Clone)]
pub struct OutputLogicDefinition {
    pub logic: Arc<dyn OutputLogic>,
    pub tags: BTreeMap<String, String>,
}

impl Debug for OutputLogicDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputLogicDefinition")
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
struct DefinitionViews {
    resolvers_by_input: HashMap<Option<String>, Vec<usize>>,
    resolvers_by_dependency: HashMap<String, Vec<usize>>,
    dependencies_with_no_resolvers: BTreeSet<String>,
    prerequisites: HashMap<String, BTreeSet<String>>,
    dependency_order: Vec<String>,
}

#[derive(Clone)]
pub struct KryonDefinition {
    id: KryonId,
    output_logic: OutputLogicDefinition,
    inputs: Vec<InputDefinition>,
    dependencies: Vec<(String, KryonId)>,
    resolvers: Vec<ResolverDefinition>,
    multi_resolver: Option<Arc<dyn MultiResolver>>,
    views: DefinitionViews,
}

impl KryonDefinition {
    pub fn builder(id: impl Into<KryonId>, logic: Arc<dyn OutputLogic>) -> KryonDefinitionBuilder {
        KryonDefinitionBuilder {
            definition: KryonDefinition {
                id: id.into(),
                output_logic: OutputLogicDefinition {
                    logic,
                    tags: BTreeMap::new(),
                },
                inputs: Vec::new(),
                dependencies: Vec::new(),
                resolvers: Vec::new(),
                multi_resolver: None,
                views: DefinitionViews::default(),
            },
        }
    }

    pub fn id(&self) -> &KryonId {
        &self.id
    }

    pub fn logic(&self) -> &Arc<dyn OutputLogic> {
        &self.output_logic.logic
    }

    pub fn output_tags(&self) -> &BTreeMap<String, String> {
        &self.output_logic.tags
    }

    pub fn inputs(&self) -> &[InputDefinition] {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&InputDefinition> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Dependency names and the kryons they reference, in declaration order.
    pub fn dependencies(&self) -> &[(String, KryonId)] {
        &self.dependencies
    }

    pub fn dependency(&self, name: &str) -> Option<&KryonId> {
        self.dependencies
            .iter()
            .find(|(dependency, _)| dependency == name)
            .map(|(_, kryon_id)| kryon_id)
    }

    pub fn resolvers(&self) -> &[ResolverDefinition] {
        &self.resolvers
    }

    pub fn multi_resolver(&self) -> Option<&Arc<dyn MultiResolver>> {
        self.multi_resolver.as_ref()
    }

    /// Names of all inputs and dependencies.
    pub fn facet_names(&self) -> Vec<String> {
        self.inputs
            .iter()
            .map(|input| input.name.clone())
            .chain(self.dependencies.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    /// Resolvers targeting `dependency`, in declaration order.
    pub fn resolvers_for_dependency(&self, dependency: &str) -> Vec<&ResolverDefinition> {
        self.indexed(self.views.resolvers_by_dependency.get(dependency))
    }

    /// Resolvers consuming `facet`; `None` selects resolvers with no sources.
    pub fn resolvers_for_input(&self, facet: Option<&str>) -> Vec<&ResolverDefinition> {
        self.indexed(self.views.resolvers_by_input.get(&facet.map(str::to_string)))
    }

    pub fn dependencies_with_no_resolvers(&self) -> &BTreeSet<String> {
        &self.views.dependencies_with_no_resolvers
    }

    /// Other dependencies whose values the resolvers of `dependency` consume.
    pub fn prerequisites(&self, dependency: &str) -> Option<&BTreeSet<String>> {
        self.views.prerequisites.get(dependency)
    }

    /// Dependencies ordered so each comes after its prerequisites.
    pub fn dependency_order(&self) -> &[String] {
        &self.views.dependency_order
    }

    fn indexed(&self, positions: Option<&Vec<usize>>) -> Vec<&ResolverDefinition> {
        positions
            .map(|positions| positions.iter().map(|&i| &self.resolvers[i]).collect())
            .unwrap_or_default()
    }

    /// Validates what can be checked without other kryons and computes views.
    pub(crate) fn index(&mut self) -> Result<(), DefinitionError> {
        let mut seen = HashSet::new();
        for name in self.facet_names() {
            if !seen.insert(name.clone()) {
                return Err(DefinitionError::DuplicateFacet {
                    kryon_id: self.id.clone(),
                    facet: name,
                });
            }
        }

        let mut views = DefinitionViews::default();
        for (position, resolver) in self.resolvers.iter().enumerate() {
            if self.dependency(&resolver.dependency).is_none() {
                return Err(DefinitionError::UnknownDependency {
                    kryon_id: self.id.clone(),
                    dependency: resolver.dependency.clone(),
                    reason: "is not declared".to_string(),
                });
            }
            if resolver.sources.is_empty() {
                views
                    .resolvers_by_input
                    .entry(None)
                    .or_default()
                    .push(position);
            }
            for source in &resolver.sources {
                if !seen.contains(source) {
                    return Err(DefinitionError::UnknownFacet {
                        kryon_id: self.id.clone(),
                        facet: source.clone(),
                        owner: self.id.clone(),
                    });
                }
                views
                    .resolvers_by_input
                    .entry(Some(source.clone()))
                    .or_default()
                    .push(position);
                if self.dependency(source).is_some() {
                    views
                        .prerequisites
                        .entry(resolver.dependency.clone())
                        .or_default()
                        .insert(source.clone());
                }
            }
            views
                .resolvers_by_dependency
                .entry(resolver.dependency.clone())
                .or_default()
                .push(position);
        }

        views.dependencies_with_no_resolvers = self
            .dependencies
            .iter()
            .filter(|(name, _)| !views.resolvers_by_dependency.contains_key(name))
            .map(|(name, _)| name.clone())
            .collect();

        views.dependency_order = order_dependencies(&self.dependencies, &views.prerequisites)
            .map_err(|cycle| DefinitionError::CyclicDependency {
                kryon_id: self.id.clone(),
                cycle,
            })?;

        self.views = views;
        Ok(())
    }
}

impl Debug for KryonDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KryonDefinition")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("dependencies", &self.dependencies)
            .field("resolvers", &self.resolvers)
            .field("has_multi_resolver", &self.multi_resolver.is_some())
            .finish()
    }
}

/// Depth-first ordering of dependencies by their prerequisites.
///
/// Returns the cycle path when the prerequisites wait on each other.
fn order_dependencies(
    dependencies: &[(String, KryonId)],
    prerequisites: &HashMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, Vec<String>> {
    let mut order = Vec::with_capacity(dependencies.len());
    let mut visited = HashSet::new();
    let mut path = Vec::new();

    for (name, _) in dependencies {
        visit(name, prerequisites, &mut visited, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    node: &str,
    prerequisites: &HashMap<String, BTreeSet<String>>,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<(), Vec<String>> {
    if visited.contains(node) {
        return Ok(());
    }
    if let Some(start) = path.iter().position(|entry| entry == node) {
        let mut cycle = path[start..].to_vec();
        cycle.push(node.to_string());
        return Err(cycle);
    }

    path.push(node.to_string());
    if let Some(required) = prerequisites.get(node) {
        for prerequisite in required {
            visit(prerequisite, prerequisites, visited, path, order)?;
        }
    }
    path.pop();

    visited.insert(node.to_string());
    order.push(node.to_string());
    Ok(())
}

pub struct KryonDefinitionBuilder {
    definition: KryonDefinition,
}

impl KryonDefinitionBuilder {
    pub fn input(mut self, input: InputDefinition) -> Self {
        self.definition.inputs.push(input);
        self
    }

    pub fn dependency(mut self, name: impl Into<String>, kryon_id: impl Into<KryonId>) -> Self {
        self.definition
            .dependencies
            .push((name.into(), kryon_id.into()));
        self
    }

    pub fn resolver(mut self, resolver: ResolverDefinition) -> Self {
        self.definition.resolvers.push(resolver);
        self
    }

    pub fn multi_resolver(mut self, resolver: impl MultiResolver + 'static) -> Self {
        self.definition.multi_resolver = Some(Arc::new(resolver));
        self
    }

    /// Tag on the output logic, visible to decorator predicates.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.definition
            .output_logic
            .tags
            .insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> KryonDefinition {
        self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Facets;
    use crate::graph::resolver::ResolverCommand;
    use crate::traits::compute_logic;
    use serde_json::json;

    fn constant() -> Arc<dyn OutputLogic> {
        compute_logic(|_| Ok(json!(null)))
    }

    fn passthrough(dependency: &str, target: &str) -> ResolverDefinition {
        ResolverDefinition::new(dependency, [target], |_: &Facets| {
            ResolverCommand::execute(Facets::new())
        })
    }

    #[test]
    fn test_views_group_resolvers() {
        let mut definition = KryonDefinition::builder("k", constant())
            .input(InputDefinition::client("a", "string"))
            .dependency("x", "dx")
            .dependency("y", "dy")
            .dependency("z", "dz")
            .resolver(passthrough("x", "in").sources(["a"]))
            .resolver(passthrough("y", "in"))
            .resolver(passthrough("y", "other").sources(["x"]))
            .build();

        definition.index().unwrap();

        assert_eq!(definition.resolvers_for_dependency("y").len(), 2);
        assert_eq!(definition.resolvers_for_input(None).len(), 1);
        assert_eq!(definition.resolvers_for_input(Some("a")).len(), 1);
        assert_eq!(
            definition.dependencies_with_no_resolvers(),
            &BTreeSet::from(["z".to_string()])
        );
        assert_eq!(
            definition.prerequisites("y"),
            Some(&BTreeSet::from(["x".to_string()]))
        );
        let order = definition.dependency_order();
        let position = |name: &str| order.iter().position(|entry| entry == name).unwrap();
        assert!(position("x") < position("y"));
    }

    #[test]
    fn test_input_and_dependency_sharing_a_name_is_rejected() {
        let mut definition = KryonDefinition::builder("k", constant())
            .input(InputDefinition::client("shared", "string"))
            .dependency("shared", "other")
            .build();

        assert_eq!(
            definition.index(),
            Err(DefinitionError::DuplicateFacet {
                kryon_id: KryonId::new("k"),
                facet: "shared".to_string(),
            })
        );
    }

    #[test]
    fn test_resolvers_waiting_on_each_other_are_rejected() {
        let mut definition = KryonDefinition::builder("k", constant())
            .dependency("x", "dx")
            .dependency("y", "dy")
            .resolver(passthrough("x", "in").sources(["y"]))
            .resolver(passthrough("y", "in").sources(["x"]))
            .build();

        match definition.index() {
            Err(DefinitionError::CyclicDependency { cycle, .. }) => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"x".to_string()));
                assert!(cycle.contains(&"y".to_string()));
            }
            other => panic!("expected cyclic dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_resolver_source_is_rejected() {
        let mut definition = KryonDefinition::builder("k", constant())
            .dependency("x", "dx")
            .resolver(passthrough("x", "in").sources(["nope"]))
            .build();

        assert!(matches!(
            definition.index(),
            Err(DefinitionError::UnknownFacet { facet, .. }) if facet == "nope"
        ));
    }
}
