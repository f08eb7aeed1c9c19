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

//! RPC-facing wire types. Gated behind the `serde` feature so in-process-only users never
//! pull in `serde`. This module defines the wire shapes and the stub trait a real transport
//! would implement against; it carries no transport itself — network transport, service
//! discovery, and wire format are all left to the caller.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::changeset::ChangeEntry;
use crate::changeset::ChangeSet;

/// Serialized lock-parameter form: a timeout only. A call arriving through this type has
/// necessarily crossed the wire, so the server side always treats it as `remote = true` rather
/// than trusting a field this form deliberately does not carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireLockParameters {
    pub timeout_millis: u64,
}

impl WireLockParameters {
    pub fn new(timeout: Duration) -> Self {
        WireLockParameters {
            timeout_millis: timeout.as_millis() as u64,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

/// Serialized locked-buffer form: `<lock-id, present-flag, [elements]>`. `present = false`
/// is the wire encoding of `commit_no_changes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLockedBuffer<T> {
    pub lock_id: u64,
    pub present: bool,
    pub data: Vec<T>,
}

impl<T> WireLockedBuffer<T> {
    pub fn commit(lock_id: u64, data: Vec<T>) -> Self {
        WireLockedBuffer { lock_id, present: true, data }
    }

    pub fn no_changes(lock_id: u64) -> Self {
        WireLockedBuffer { lock_id, present: false, data: Vec::new() }
    }
}

/// Serialized change-set entry form: `<index: i32, element>`; `index < 0` is the skip
/// sentinel, carried across the wire at 32 bits since no single change-set realistically
/// exceeds that index range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChangeEntry<T> {
    pub index: i32,
    pub value: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WireChangeSet<T> {
    pub entries: Vec<WireChangeEntry<T>>,
}

impl<T> From<WireChangeSet<T>> for ChangeSet<T> {
    fn from(wire: WireChangeSet<T>) -> Self {
        ChangeSet::new(wire.entries.into_iter().map(|e| ChangeEntry::new(e.index as i64, e.value)).collect())
    }
}

/// Failure reported back from a remote peer. Distinct from [`crate::error::BlackboardError`],
/// which is this crate's own, purely local, failure surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteCallError {
    #[error("remote call timed out")]
    Timeout,
    #[error("remote peer cancelled the call")]
    Cancelled,
    #[error("remote peer reported an exception: {0}")]
    Exception(String),
}

/// The request/response surface a remote blackboard stub needs to offer: a request/response
/// channel, cancellation/exception notification, and a way to register an unlock callback. A
/// real transport implements this against its own wire format; this crate only defines the
/// shapes it would carry.
#[allow(async_fn_in_trait)]
pub trait RemoteBlackboardStub<T> {
    async fn read_lock(&self, params: WireLockParameters) -> Result<WireLockedBuffer<T>, RemoteCallError>;
    async fn write_lock(&self, params: WireLockParameters) -> Result<WireLockedBuffer<T>, RemoteCallError>;
    async fn unlock(&self, buffer: WireLockedBuffer<T>) -> Result<(), RemoteCallError>;
    async fn asynchronous_change(&self, changes: WireChangeSet<T>) -> Result<(), RemoteCallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_change_set_converts_preserving_order() {
        let wire = WireChangeSet {
            entries: vec![WireChangeEntry { index: 0, value: 1 }, WireChangeEntry { index: -1, value: 2 }],
        };
        let cs: ChangeSet<i32> = wire.into();
        let mut buf = vec![9, 9];
        cs.apply_to(&mut buf);
        assert_eq!(buf, vec![1, 9]);
    }

    #[test]
    fn locked_buffer_no_changes_carries_no_data() {
        let wlb: WireLockedBuffer<i32> = WireLockedBuffer::no_changes(7);
        assert!(!wlb.present);
        assert!(wlb.data.is_empty());
    }
}
