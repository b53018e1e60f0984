// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;

use crate::errors::FacetError;

/// Tri-state result of one facet on one invocation.
///
/// `Empty` means "not computed yet". Once a facet holds a value or an error it
/// never goes back to `Empty`; the engine replaces whole facet sets rather than
/// mutating values in place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Errable<T> {
    #[default]
    Empty,
    Value(T),
    Error(FacetError),
}

impl<T> Errable<T> {
    pub fn with_value(value: T) -> Self {
        Errable::Value(value)
    }

    pub fn with_error(error: FacetError) -> Self {
        Errable::Error(error)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Errable::Empty)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Errable::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FacetError> {
        match self {
            Errable::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Errable<U> {
        match self {
            Errable::Empty => Errable::Empty,
            Errable::Value(value) => Errable::Value(f(value)),
            Errable::Error(error) => Errable::Error(error),
        }
    }

    /// `Ok(None)` for `Empty`, so callers can tell "absent" from "failed".
    pub fn into_result(self) -> Result<Option<T>, FacetError> {
        match self {
            Errable::Empty => Ok(None),
            Errable::Value(value) => Ok(Some(value)),
            Errable::Error(error) => Err(error),
        }
    }
}

impl<T> From<Result<T, FacetError>> for Errable<T> {
    fn from(result: Result<T, FacetError>) -> Self {
        match result {
            Ok(value) => Errable::Value(value),
            Err(error) => Errable::Error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result_distinguishes_empty_from_error() {
        assert_eq!(Errable::<i32>::Empty.into_result(), Ok(None));
        assert_eq!(Errable::with_value(3).into_result(), Ok(Some(3)));
        assert_eq!(
            Errable::<i32>::with_error(FacetError::Closed).into_result(),
            Err(FacetError::Closed)
        );
    }

    #[test]
    fn test_map_preserves_error_state() {
        let errable: Errable<i32> = Errable::with_error(FacetError::failed("boom"));
        assert_eq!(errable.map(|v| v + 1).error(), Some(&FacetError::failed("boom")));
        assert_eq!(Errable::with_value(1).map(|v| v + 1).value(), Some(&2));
    }
}
