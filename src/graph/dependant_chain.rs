// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::errors::FacetError;
use crate::graph::KryonId;

/// The path by which an invocation was reached: the root marker followed by
/// one (kryon, dependency) link per edge traversed.
///
/// Chains are persistent; extending one shares the parent through an `Arc`.
/// Equality and hashing are structural, so two invocations reached along the
/// same edges carry equal chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DependantChain {
    #[default]
    Start,
    Link(Arc<ChainLink>),
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ChainLink {
    pub parent: DependantChain,
    pub kryon_id: KryonId,
    pub dependency: String,
}

impl DependantChain {
    pub fn start() -> Self {
        DependantChain::Start
    }

    /// The chain of the invocation of `dependency` made by `kryon_id`.
    ///
    /// Fails if this very edge was already traversed on the way here.
    pub fn extend(&self, kryon_id: &KryonId, dependency: &str) -> Result<Self, FacetError> {
        if self.contains(kryon_id, dependency) {
            return Err(FacetError::Cycle {
                chain: format!("{}>{}:{}", self, kryon_id, dependency),
            });
        }
        Ok(DependantChain::Link(Arc::new(ChainLink {
            parent: self.clone(),
            kryon_id: kryon_id.clone(),
            dependency: dependency.to_string(),
        })))
    }

    pub fn contains(&self, kryon_id: &KryonId, dependency: &str) -> bool {
        self.links()
            .any(|link| &link.kryon_id == kryon_id && link.dependency == dependency)
    }

    pub fn is_start(&self) -> bool {
        matches!(self, DependantChain::Start)
    }

    /// Number of edges from the root.
    pub fn depth(&self) -> usize {
        self.links().count()
    }

    /// Renders `Start>kryon1:dep1>kryon2:dep2`, root first.
    pub fn to_path_string(&self) -> String {
        let mut links: Vec<_> = self.links().collect();
        links.reverse();
        let mut path = String::from("Start");
        for link in links {
            path.push('>');
            path.push_str(link.kryon_id.as_str());
            path.push(':');
            path.push_str(&link.dependency);
        }
        path
    }

    /// Links from the innermost edge back to the root.
    fn links(&self) -> impl Iterator<Item = &ChainLink> {
        let mut current = self;
        std::iter::from_fn(move || match current {
            DependantChain::Start => None,
            DependantChain::Link(link) => {
                current = &link.parent;
                Some(link.as_ref())
            }
        })
    }
}

impl Display for DependantChain {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(&self.to_path_string())
    }
}
