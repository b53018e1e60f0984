// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::decoration::LogicExecutionContext;
use crate::traits::OutputLogic;

/// Wraps the output logic of a kryon for one dependant chain (or a set of
/// chains sharing an instance id).
///
/// A live decorator instance may be asked to decorate several logics; each
/// call must return a logic that routes through this instance.
pub trait OutputLogicDecorator: Send + Sync {
    fn decorate(
        &self,
        logic: Arc<dyn OutputLogic>,
        context: &LogicExecutionContext,
    ) -> Arc<dyn OutputLogic>;

    fn id(&self) -> &str;

    /// Push out any buffered work, returning how many facet sets were
    /// dispatched.
    fn flush(&self) -> usize {
        0
    }

    /// Release resources; buffered work that cannot complete fails.
    fn close(&self) {}
}
