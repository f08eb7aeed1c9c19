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

//! Construction-time configuration for a [`crate::server::Blackboard`].

use std::time::Duration;

use crate::error::BlackboardError;

/// The buffer-mode policy a blackboard server is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferMode {
    /// One buffer; writes mutate it in place when unique; readers may block behind writers.
    SingleBuffered,
    /// Writes produce new buffers; readers never block behind writers; extra copy cost.
    MultiBuffered,
    /// Starts `SingleBuffered`, irreversibly upgrades to `MultiBuffered` the first time a
    /// read would otherwise have to block behind a writer.
    MultiBufferedOnParallelAccess,
}

/// Read-only client-side configuration describing which servers a handle should bind to by
/// name. The server itself never reads this — it is carried purely for the convenience of
/// callers that build their own discovery layer on top, mirroring the original's auto-connect
/// modes. Set once at construction and returned verbatim by
/// [`crate::server::Blackboard::auto_connect_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoConnectMode {
    /// No auto-connect.
    #[default]
    Off,
    /// Match by name, any locality.
    All,
    /// Only shared-scope servers.
    Shared,
    /// Only local servers.
    Local,
    /// Only remote servers.
    Remote,
}

/// Construction-time, immutable-for-the-server's-lifetime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of elements the initial buffer is constructed with.
    pub initial_len: usize,
    /// The buffer-mode policy; selected once, may be upgraded in place at runtime only
    /// from `MultiBufferedOnParallelAccess` to `MultiBuffered`.
    pub buffer_mode: BufferMode,
    /// How long a held write lock may go without the holder committing before the server
    /// recovers it as a `LockHolderFailure`. Default: one second.
    pub write_lock_keep_alive: Duration,
    /// Cadence of the background sweep that expires queued lock requests past their
    /// deadline. Must be `<= 250ms`. Default: 100ms.
    pub lock_check_interval: Duration,
    /// Maximum number of buffers the pool will have outstanding at once. Default: 4.
    pub max_pooled_buffers: usize,
    /// Client-side discovery hint, carried but never read by the server itself. Default: `Off`.
    pub auto_connect: AutoConnectMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_len: 0,
            buffer_mode: BufferMode::MultiBuffered,
            write_lock_keep_alive: Duration::from_secs(1),
            lock_check_interval: Duration::from_millis(100),
            max_pooled_buffers: 4,
            auto_connect: AutoConnectMode::Off,
        }
    }
}

impl Config {
    /// Validates the configuration, returning the `InvalidConfiguration` error the spec
    /// requires for a bad `lock_check_interval` cadence. Buffer mode `None` has no
    /// representation in [`BufferMode`] (it is rejected by construction, at the type level)
    /// so there is nothing further to check for it here.
    pub fn validate(&self) -> Result<(), BlackboardError> {
        if self.lock_check_interval > Duration::from_millis(250) {
            return Err(BlackboardError::InvalidConfiguration {
                reason: format!(
                    "lock_check_interval must be <= 250ms, got {:?}",
                    self.lock_check_interval
                ),
            });
        }
        if self.lock_check_interval.is_zero() {
            return Err(BlackboardError::InvalidConfiguration {
                reason: "lock_check_interval must be positive".to_string(),
            });
        }
        if self.max_pooled_buffers == 0 {
            return Err(BlackboardError::InvalidConfiguration {
                reason: "max_pooled_buffers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
