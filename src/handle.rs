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

//! Reader and writer handles: the unlock callback protocol.
//!
//! [`ReadGuard`] is a const snapshot whose drop notifies the server so it can reconsider the
//! pending lock-request queue once the buffer it references might have become unique again.
//! [`WriteGuard`] carries the caller's half of the unlock promise: calling neither
//! [`WriteGuard::commit`] nor [`WriteGuard::commit_no_changes`] before it drops still resolves
//! the promise (via `WriteGuard`'s own `Drop`), but flagged as implicit — the server treats
//! that the same way it treats an explicit `LockHolderFailure`.

use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::Weak;

use tokio::sync::oneshot;

use crate::buffer::Buffer;
use crate::lock::LockId;
use crate::server::Inner;

/// A const snapshot of the blackboard's contents at some instant at or after the `ReadLock`
/// call that produced it.
pub struct ReadGuard<T> {
    pub(crate) buffer: Option<Buffer<T>>,
    pub(crate) server: Weak<Inner<T>>,
}

impl<T> ReadGuard<T> {
    /// Borrow the elements.
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_ref().expect("buffer present for the lifetime of the guard").as_slice()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<T> Deref for ReadGuard<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for ReadGuard<T> {
    fn drop(&mut self) {
        // Drop our own strong reference *before* asking the server to reconsider the queue,
        // so the refcount it observes (`buffer::is_unique`) already reflects our release.
        self.buffer.take();
        if let Some(inner) = self.server.upgrade() {
            inner.on_read_release();
        }
    }
}

/// Resolution of a write-lock's unlock promise: either a replacement buffer (the caller's
/// finished edits) or "no changes", which still carries the guard's buffer back so the server
/// can restore it if it was the only copy (`Exclusive`). `implicit` distinguishes an explicit
/// [`WriteGuard::commit_no_changes`] from a guard that was simply dropped — the latter is the
/// `LockHolderFailure` path.
pub(crate) enum CommitOutcome<T> {
    Commit(Buffer<T>),
    NoChange { buffer: Buffer<T>, implicit: bool },
}

/// A held write lock. Derefs to `&mut [T]` for in-place editing; the
/// buffer underneath is always uniquely owned by this guard for the duration of the hold,
/// whether it is the live current buffer (`Exclusive`) or a private copy of it (`OnCopy`) —
/// see `crate::server` for which one a given grant produces.
pub struct WriteGuard<T> {
    pub(crate) buffer: Option<Buffer<T>>,
    pub(crate) lock_id: LockId,
    pub(crate) responder: Option<oneshot::Sender<CommitOutcome<T>>>,
}

impl<T> WriteGuard<T> {
    pub(crate) fn lock_id(&self) -> LockId {
        self.lock_id
    }

    /// Finalizes the lock, publishing the (possibly edited) buffer as the blackboard's new
    /// contents. Corresponds to the original's "commit-current-buffer".
    pub fn commit(mut self) {
        let buf = self.buffer.take().expect("buffer present until commit");
        if let Some(tx) = self.responder.take() {
            let _ = tx.send(CommitOutcome::Commit(buf));
        }
    }

    /// Releases the lock without publishing any edits made through this guard. Corresponds
    /// to the original's "commit-no-changes"; pending asynchronous changes queued by other
    /// callers while this lock was held are still applied.
    pub fn commit_no_changes(mut self) {
        let buf = self.buffer.take().expect("buffer present until commit");
        if let Some(tx) = self.responder.take() {
            let _ = tx.send(CommitOutcome::NoChange { buffer: buf, implicit: false });
        }
    }
}

impl<T> Deref for WriteGuard<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.buffer.as_ref().expect("buffer present until commit").as_slice()
    }
}

impl<T> DerefMut for WriteGuard<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        let buf = self.buffer.as_mut().expect("buffer present until commit");
        Arc::get_mut(buf)
            .expect("write guard uniquely owns its buffer for the duration of the hold")
            .as_mut_slice()
    }
}

impl<T> Drop for WriteGuard<T> {
    fn drop(&mut self) {
        // `commit`/`commit_no_changes` already took both fields; this only fires for a guard
        // that was dropped (scope exit, panic unwind, early return) without either call.
        if let (Some(buf), Some(tx)) = (self.buffer.take(), self.responder.take()) {
            let _ = tx.send(CommitOutcome::NoChange { buffer: buf, implicit: true });
        }
    }
}
