// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::errors::DefinitionError;
use crate::graph::{KryonDefinition, KryonId};
use crate::observability::messages::registry::{DefinitionRejected, KryonDefined};
use crate::observability::messages::StructuredLog;

/// The set of defined kryons.
///
/// A kryon may only depend on kryons that are already defined, so the kryon
/// graph held here is acyclic at all times.
#[derive(Debug, Default)]
pub struct KryonDefinitionRegistry {
    definitions: RwLock<HashMap<KryonId, Arc<KryonDefinition>>>,
}

impl KryonDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `definition`, computes its views and adds it.
    ///
    /// On error the registry is left unchanged.
    pub fn define(
        &self,
        definition: KryonDefinition,
    ) -> Result<Arc<KryonDefinition>, DefinitionError> {
        let kryon_id = definition.id().clone();
        let result = self.validate_and_insert(definition);
        match &result {
            Ok(definition) => KryonDefined {
                kryon_id: kryon_id.as_str(),
                input_count: definition.inputs().len(),
                dependency_count: definition.dependencies().len(),
                resolver_count: definition.resolvers().len(),
            }
            .log(),
            Err(error) => DefinitionRejected {
                kryon_id: kryon_id.as_str(),
                error,
            }
            .log(),
        }
        result
    }

    fn validate_and_insert(
        &self,
        mut definition: KryonDefinition,
    ) -> Result<Arc<KryonDefinition>, DefinitionError> {
        let mut definitions = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if definitions.contains_key(definition.id()) {
            return Err(DefinitionError::DuplicateDefinition(definition.id().clone()));
        }

        definition.index()?;

        for (dependency, target_id) in definition.dependencies() {
            let target = definitions.get(target_id).ok_or_else(|| {
                DefinitionError::UnknownDependency {
                    kryon_id: definition.id().clone(),
                    dependency: dependency.clone(),
                    reason: format!("references undefined kryon '{}'", target_id),
                }
            })?;

            for resolver in definition.resolvers_for_dependency(dependency) {
                if let Some(missing) = resolver
                    .targets
                    .iter()
                    .find(|target_input| target.input(target_input).is_none())
                {
                    return Err(DefinitionError::UnknownFacet {
                        kryon_id: definition.id().clone(),
                        facet: missing.clone(),
                        owner: target_id.clone(),
                    });
                }
            }
        }

        let definition = Arc::new(definition);
        definitions.insert(definition.id().clone(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, kryon_id: &KryonId) -> Result<Arc<KryonDefinition>, DefinitionError> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kryon_id)
            .cloned()
            .ok_or_else(|| DefinitionError::NotFound(kryon_id.clone()))
    }

    /// All definitions, sorted by id.
    pub fn all_definitions(&self) -> Vec<Arc<KryonDefinition>> {
        let mut all: Vec<_> = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Declared input and dependency names of a kryon.
    pub fn facets_of(&self, kryon_id: &KryonId) -> Result<Vec<String>, DefinitionError> {
        Ok(self.get(kryon_id)?.facet_names())
    }

    /// Output logic tags of a kryon.
    pub fn tags_of(
        &self,
        kryon_id: &KryonId,
    ) -> Result<BTreeMap<String, String>, DefinitionError> {
        Ok(self.get(kryon_id)?.output_tags().clone())
    }
}
