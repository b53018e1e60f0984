// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Facet and value model: tri-state [`Errable`] results and [`Facets`]
//! aggregates keyed by facet name.

mod errable;
mod facets;

pub use errable::Errable;
pub use facets::{DependencyResults, FacetValue, Facets};
