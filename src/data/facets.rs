// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::data::Errable;
use crate::errors::FacetError;

/// The per-invocation results of a dependency: one entry per facet set the
/// dependency kryon was invoked with.
pub type DependencyResults = Vec<(Facets, Errable<Value>)>;

/// Value held by one facet of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FacetValue {
    /// Inputs, and dependencies that never ran (skipped, conflicting, cyclic).
    Single(Errable<Value>),
    /// Dependencies that ran, possibly fanned out.
    Results(DependencyResults),
}

impl FacetValue {
    pub fn value(value: Value) -> Self {
        FacetValue::Single(Errable::Value(value))
    }

    pub fn error(error: FacetError) -> Self {
        FacetValue::Single(Errable::Error(error))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FacetValue::Single(Errable::Empty))
    }
}

/// Ordered mapping from facet name to [`FacetValue`] for a single invocation.
///
/// Ordering is by name so two structurally equal facet sets compare, hash and
/// print identically no matter the order they were filled in. This is what
/// lets a `Facets` act as a memoization key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets(BTreeMap<String, FacetValue>);

impl Facets {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert of a plain input value.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), FacetValue::value(value));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FacetValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FacetValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FacetValue)> {
        self.0.iter()
    }

    /// Value of an input facet. Missing facets read as `Empty`.
    pub fn input(&self, name: &str) -> Errable<Value> {
        match self.0.get(name) {
            Some(FacetValue::Single(errable)) => errable.clone(),
            Some(FacetValue::Results(results)) => single_result(results),
            None => Errable::Empty,
        }
    }

    /// Value of a dependency that was invoked once (or skipped).
    ///
    /// A fanned-out dependency yields `NotSingular`; use
    /// [`Facets::dependency_results`] for those.
    pub fn dependency_value(&self, name: &str) -> Errable<Value> {
        self.input(name)
    }

    /// All invocation results of a dependency, in resolution order.
    pub fn dependency_results(&self, name: &str) -> DependencyResults {
        match self.0.get(name) {
            Some(FacetValue::Results(results)) => results.clone(),
            _ => Vec::new(),
        }
    }

    /// The subset of facets named in `names`; absent names are skipped.
    pub fn subset<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Facets {
        let mut subset = Facets::new();
        for name in names {
            if let Some(value) = self.0.get(name) {
                subset.insert(name.clone(), value.clone());
            }
        }
        subset
    }

    /// Copies every facet of `other` into `self`, overwriting on collision.
    pub fn extend(&mut self, other: Facets) {
        self.0.extend(other.0);
    }
}

fn single_result(results: &DependencyResults) -> Errable<Value> {
    match results.as_slice() {
        [] => Errable::Empty,
        [(_, result)] => result.clone(),
        many => Errable::Error(FacetError::NotSingular(many.len())),
    }
}

impl IntoIterator for Facets {
    type Item = (String, FacetValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FacetValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, FacetValue)> for Facets {
    fn from_iter<I: IntoIterator<Item = (String, FacetValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// serde_json::Value has no Hash impl; hash structurally so that equal facet
// sets (by Eq) always hash equal.
impl Hash for Facets {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0.len());
        for (name, value) in &self.0 {
            name.hash(state);
            hash_facet_value(value, state);
        }
    }
}

fn hash_facet_value<H: Hasher>(value: &FacetValue, state: &mut H) {
    match value {
        FacetValue::Single(errable) => {
            state.write_u8(0);
            hash_errable(errable, state);
        }
        FacetValue::Results(results) => {
            state.write_u8(1);
            state.write_usize(results.len());
            for (facets, errable) in results {
                facets.hash(state);
                hash_errable(errable, state);
            }
        }
    }
}

fn hash_errable<H: Hasher>(errable: &Errable<Value>, state: &mut H) {
    match errable {
        Errable::Empty => state.write_u8(0),
        Errable::Value(value) => {
            state.write_u8(1);
            hash_json(value, state);
        }
        Errable::Error(error) => {
            state.write_u8(2);
            error.to_string().hash(state);
        }
    }
}

fn hash_json<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::Number(n) => {
            state.write_u8(2);
            n.to_string().hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                hash_json(item, state);
            }
        }
        Value::Object(map) => {
            state.write_u8(5);
            state.write_usize(map.len());
            for (key, item) in map {
                key.hash(state);
                hash_json(item, state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(facets: &Facets) -> u64 {
        let mut hasher = DefaultHasher::new();
        facets.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equal_facets_hash_equal_regardless_of_insert_order() {
        let a = Facets::new().with("x", json!(1)).with("y", json!({"k": [1, 2]}));
        let b = Facets::new().with("y", json!({"k": [1, 2]})).with("x", json!(1));

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_dependency_value_reads_single_result() {
        let mut facets = Facets::new();
        facets.insert(
            "dep",
            FacetValue::Results(vec![(Facets::new(), Errable::with_value(json!("ok")))]),
        );

        assert_eq!(facets.dependency_value("dep"), Errable::with_value(json!("ok")));
        assert_eq!(facets.dependency_value("missing"), Errable::Empty);
    }

    #[test]
    fn test_dependency_value_rejects_fanout() {
        let mut facets = Facets::new();
        facets.insert(
            "dep",
            FacetValue::Results(vec![
                (Facets::new().with("n", json!(1)), Errable::with_value(json!(1))),
                (Facets::new().with("n", json!(2)), Errable::with_value(json!(2))),
            ]),
        );

        assert_eq!(
            facets.dependency_value("dep"),
            Errable::with_error(FacetError::NotSingular(2))
        );
        assert_eq!(facets.dependency_results("dep").len(), 2);
    }

    #[test]
    fn test_subset_skips_absent_names() {
        let facets = Facets::new().with("a", json!(1)).with("b", json!(2));
        let names = vec!["a".to_string(), "c".to_string()];

        let subset = facets.subset(&names);

        assert_eq!(subset.len(), 1);
        assert_eq!(subset.input("a"), Errable::with_value(json!(1)));
    }
}
