// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("Multi-lease pool is closed")]
    PoolClosed,

    #[error("Lease already released")]
    LeaseAlreadyReleased,
}
