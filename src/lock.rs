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

//! Lock request handling: the pending lock-request queue, lock identifiers, and the
//! write-lock state.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::BlackboardError;
use crate::handle::ReadGuard;
use crate::handle::WriteGuard;

/// A monotonically non-decreasing generation number. Regenerated on every state transition
/// that invalidates outstanding unlocks; its sole job is rejecting stale unlocks, not granting
/// mutual exclusion by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct LockId(u64);

impl LockId {
    /// Sentinel meaning "the server is being torn down; discard all unlocks".
    const TORN_DOWN: LockId = LockId(u64::MAX);

    pub(crate) const fn initial() -> Self {
        LockId(0)
    }

    pub(crate) fn next(self) -> Self {
        // Wrapping keeps a live server from ever colliding with the teardown sentinel except
        // by wrapping exactly onto it, which `u64` generations make practically unreachable.
        LockId(self.0.wrapping_add(1))
    }

    pub(crate) fn torn_down() -> Self {
        Self::TORN_DOWN
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// Write-lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteLockState {
    /// No writer holds the blackboard.
    None,
    /// A writer mutates the current buffer in place.
    Exclusive,
    /// A writer holds a private copy; commit replaces the current buffer.
    OnCopy,
}

impl WriteLockState {
    pub(crate) fn is_none(self) -> bool {
        matches!(self, WriteLockState::None)
    }

    pub(crate) fn is_exclusive(self) -> bool {
        matches!(self, WriteLockState::Exclusive)
    }
}

/// A queued request's kind, carrying the responder that completes it when granted.
pub(crate) enum PendingKind<T> {
    Read(oneshot::Sender<Result<ReadGuard<T>, BlackboardError>>),
    Write {
        remote: bool,
        responder: oneshot::Sender<Result<WriteGuard<T>, BlackboardError>>,
    },
}

impl<T> PendingKind<T> {
    fn is_closed(&self) -> bool {
        match self {
            PendingKind::Read(tx) => tx.is_closed(),
            PendingKind::Write { responder, .. } => responder.is_closed(),
        }
    }
}

/// One entry in the pending lock-request queue.
pub(crate) struct PendingRequest<T> {
    pub(crate) kind: PendingKind<T>,
    pub(crate) deadline: Instant,
}

impl<T> PendingRequest<T> {
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.kind.is_closed()
    }

    /// Resolves this entry with [`BlackboardError::Timeout`], used both for deadline expiry
    /// and for the periodic sweep discarding cancelled callers identically — immediate
    /// cancellation is treated exactly like deadline expiry.
    pub(crate) fn resolve_timeout(self) {
        match self.kind {
            PendingKind::Read(tx) => {
                let _ = tx.send(Err(BlackboardError::Timeout));
            }
            PendingKind::Write { responder, .. } => {
                let _ = responder.send(Err(BlackboardError::Timeout));
            }
        }
    }

    pub(crate) fn resolve_torn_down(self) {
        match self.kind {
            PendingKind::Read(tx) => {
                let _ = tx.send(Err(BlackboardError::TornDown));
            }
            PendingKind::Write { responder, .. } => {
                let _ = responder.send(Err(BlackboardError::TornDown));
            }
        }
    }
}

/// FIFO queue of pending lock requests.
pub(crate) type PendingQueue<T> = VecDeque<PendingRequest<T>>;

/// Sweeps `queue`, discarding (and resolving with `Timeout`) every entry whose deadline has
/// passed or whose caller already dropped the receiving end. This is the periodic backstop for
/// deadlines that `reprocess_queue`'s event-triggered walk doesn't happen to reach.
pub(crate) fn sweep_expired<T>(queue: &mut PendingQueue<T>, now: Instant) {
    let mut i = 0;
    while i < queue.len() {
        if queue[i].is_expired(now) || queue[i].is_cancelled() {
            let entry = queue.remove(i).expect("index in bounds");
            entry.resolve_timeout();
        } else {
            i += 1;
        }
    }
}
