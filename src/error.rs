// Copyright 2026 The Blackboard Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error kinds surfaced across the blackboard's public API.
//!
//! Per the propagation policy, the server never raises across the mutex boundary: every
//! per-call failure surfaces through the value a caller's future resolves to. Only a subset
//! of the internal outcomes (see `crate::server`) are ever turned into a [`BlackboardError`]
//! that reaches a caller; the rest (`OutdatedUnlock`, `OutOfRangeChange`) are internal
//! bookkeeping, logged via `tracing` and never returned.

use thiserror::Error;

/// Failure surfaced from a blackboard operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlackboardError {
    /// A queued lock request did not complete before its deadline (or was cancelled by the
    /// caller dropping the future, which is treated identically).
    #[error("lock request timed out before a lock could be granted")]
    Timeout,

    /// The server was constructed with an invalid configuration (buffer mode `None`, or a
    /// `lock_check_interval` that violates the required cadence). Fatal for the instance.
    #[error("invalid blackboard configuration: {reason}")]
    InvalidConfiguration {
        /// Human-readable description of what made the configuration invalid.
        reason: String,
    },

    /// The blackboard's buffer pool could not produce an unused buffer within its configured
    /// capacity. The call that triggered this is rejected as if no lock could be obtained.
    #[error("buffer pool exhausted: {outstanding} buffers already outstanding (limit {limit})")]
    PoolExhaustion {
        /// Number of buffers already checked out of the pool.
        outstanding: usize,
        /// The pool's configured capacity.
        limit: usize,
    },

    /// The server has been torn down via `managed_delete` and no longer accepts operations.
    #[error("blackboard server has been torn down")]
    TornDown,
}
