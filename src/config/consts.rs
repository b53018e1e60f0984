// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default number of concurrent leases a pooled batch buffer accepts
pub const DEFAULT_MAX_ACTIVE_LEASES_PER_OBJECT: usize = 4;
/// Default number of idle transitions a pooled object survives without being shared
pub const DEFAULT_IDLE_STRIKE_THRESHOLD: usize = 100;
/// Default number of pending facet sets that triggers a batch flush
pub const DEFAULT_MAX_BATCH_SIZE: usize = 16;
/// Default time the first pending facet set waits before a forced flush
pub const DEFAULT_MAX_WAIT_MS: u64 = 10;
/// Smallest accepted lease cap and batch size
pub const MIN_CAPACITY: usize = 1;
