// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Flush policy of the input modulation decorator.
pub trait InputModulator: Send + Sync {
    /// Called after every accepted facet set with the number now pending.
    fn should_flush(&self, pending: usize) -> bool;

    /// Upper bound on how long the first pending facet set waits before a
    /// flush is forced. `None` leaves flushing to size and explicit flushes.
    fn max_wait(&self) -> Option<Duration>;
}
