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

//! Server state machine and the public operations a caller invokes.
//!
//! [`Blackboard<T>`] is a cheap `Arc`-backed handle; all server state lives behind a single
//! `parking_lot::Mutex`, taken only for bounded, non-blocking critical sections. Waiting for a
//! lock is modeled by an unresolved `tokio::sync::oneshot` receiver, never by blocking a
//! thread inside the server.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::buffer;
use crate::buffer::Buffer;
use crate::buffer::BufferPool;
use crate::changeset::ChangeSet;
use crate::component::Component;
use crate::config::AutoConnectMode;
use crate::config::BufferMode;
use crate::config::Config;
use crate::error::BlackboardError;
use crate::handle::CommitOutcome;
use crate::handle::ReadGuard;
use crate::handle::WriteGuard;
use crate::lock::sweep_expired;
use crate::lock::LockId;
use crate::lock::PendingKind;
use crate::lock::PendingQueue;
use crate::lock::PendingRequest;
use crate::lock::WriteLockState;
use crate::revision::Revision;

/// A pending write grant produced while [`State`] held the server mutex: the actual
/// `tokio::spawn` call happens after the mutex is released, so this is just the ingredients.
type PendingSpawn<T> = (LockId, bool, oneshot::Receiver<CommitOutcome<T>>);

/// Server-internal state: everything behind the single per-server mutex.
struct State<T> {
    /// `None` only transiently, while an `Exclusive` write lock holds sole ownership of the
    /// only copy of the buffer. `Some` at every other time — the current buffer is never left
    /// marked unused.
    current: Option<Buffer<T>>,
    write_lock: WriteLockState,
    lock_id: LockId,
    pending_changes: VecDeque<ChangeSet<T>>,
    pending_requests: PendingQueue<T>,
    revision: Revision,
    buffer_mode: BufferMode,
    torn_down: bool,
    /// Set only for a remote ("`OnCopy`-only") write lock; local holds rely on Rust's own
    /// ownership/drop guarantees instead of a forced timeout — see `DESIGN.md` for why.
    write_lock_deadline: Option<Instant>,
    write_lock_keep_alive: Duration,
}

impl<T: Clone> State<T> {
    /// `MultiBufferedOnParallelAccess` has not yet upgraded and so is still behaving like
    /// `SingleBuffered` for every grantability decision: it only flips to genuinely
    /// `MultiBuffered` behavior once `ReadLock` actually upgrades `buffer_mode` in place (see
    /// `Blackboard::read_lock`). Until that happens it must block readers/writers exactly like
    /// `SingleBuffered`, or the upgrade path can never be reached.
    fn is_single_buffered_like(&self) -> bool {
        matches!(self.buffer_mode, BufferMode::SingleBuffered | BufferMode::MultiBufferedOnParallelAccess)
    }

    fn is_write_grantable(&self) -> bool {
        if self.is_single_buffered_like() {
            self.current.as_ref().map(buffer::is_unique).unwrap_or(false)
        } else {
            self.write_lock.is_none()
        }
    }

    /// Grantability for a *fresh* caller arriving at `ReadLock`. In `SingleBuffered` mode (and
    /// in `MultiBufferedOnParallelAccess` before it upgrades) a new arrival must still queue
    /// behind anyone already waiting, to preserve FIFO ordering against queued writers (write
    /// head-of-line blocking).
    fn is_read_immediately_grantable(&self) -> bool {
        !self.write_lock.is_exclusive() && (!self.is_single_buffered_like() || self.pending_requests.is_empty())
    }

    /// Grantability for an entry already at the front of the queue being reconsidered: the
    /// "queue empty" nuance above exists only to decide whether a *new* arrival must queue at
    /// all, and is moot once an entry is already queued.
    fn is_read_queued_grantable(&self) -> bool {
        !self.write_lock.is_exclusive()
    }

    fn grant_read(&mut self, server: &Weak<Inner<T>>) -> ReadGuard<T> {
        let buffer = self.current.clone().expect("current present whenever a read can be granted");
        ReadGuard {
            buffer: Some(buffer),
            server: server.clone(),
        }
    }

    /// Grants a write lock immediately. Returns the guard, whether it is `Exclusive` (vs.
    /// `OnCopy`), and the receiver half of its unlock promise — the caller is responsible for
    /// spawning the task that awaits that receiver once the mutex is released.
    fn grant_write(&mut self, remote: bool) -> (WriteGuard<T>, bool, oneshot::Receiver<CommitOutcome<T>>) {
        self.lock_id = self.lock_id.next();
        let exclusive = !remote
            && self.is_single_buffered_like()
            && self.current.as_ref().map(buffer::is_unique).unwrap_or(false);

        let buffer = if exclusive {
            self.write_lock = WriteLockState::Exclusive;
            self.write_lock_deadline = None;
            self.current.take().expect("current present when granting an exclusive lock")
        } else {
            self.write_lock = WriteLockState::OnCopy;
            self.write_lock_deadline = if remote { Some(Instant::now() + self.write_lock_keep_alive) } else { None };
            buffer::deep_clone(self.current.as_ref().expect("current present outside an exclusive hold"))
        };

        let (tx, rx) = oneshot::channel();
        let guard = WriteGuard {
            buffer: Some(buffer),
            lock_id: self.lock_id,
            responder: Some(tx),
        };
        (guard, exclusive, rx)
    }

    /// Applies and clears the pending change queue onto `buf`, which must be uniquely owned.
    fn drain_pending_onto(&mut self, buf: &mut Buffer<T>) {
        if self.pending_changes.is_empty() {
            return;
        }
        let changes = std::mem::take(&mut self.pending_changes);
        let data = Arc::get_mut(buf).expect("sole reference to a buffer about to receive pending changes").as_mut_slice();
        for change_set in changes {
            change_set.apply_to(data);
        }
    }

    fn publish(&mut self, tx: &watch::Sender<Option<Buffer<T>>>) {
        self.revision = self.revision.next();
        if self.buffer_mode != BufferMode::SingleBuffered {
            if let Some(buf) = &self.current {
                let _ = tx.send(Some(Arc::clone(buf)));
            }
        }
    }

    /// Lock-request reprocessing: walks the queue from the front, granting whatever can be
    /// granted. An entry whose deadline has already passed is discarded in place (rather than
    /// left for the next periodic sweep) before its kind is even considered. A write request
    /// stops the walk either way (granting one consumes mutation rights for this round; an
    /// ungrantable one blocks everything behind it). A read request that is granted lets the
    /// walk continue, since multiple queued reads may all be servable at once; one that cannot
    /// be granted also stops the walk.
    fn reprocess_queue(&mut self, now: Instant, server: &Weak<Inner<T>>) -> Vec<PendingSpawn<T>> {
        let mut spawns = Vec::new();
        loop {
            let Some(front) = self.pending_requests.front() else {
                break;
            };
            if front.is_expired(now) {
                let entry = self.pending_requests.pop_front().expect("front checked above");
                entry.resolve_timeout();
                continue;
            }
            // A caller that already dropped its future must be discarded here, before a
            // guard is ever built for it: granting a read to a closed `oneshot::Sender` would
            // drop the `ReadGuard` inline, and its `Drop` calls back into `on_read_release`,
            // which re-locks this same (already-held) mutex. Dropping the entry outright,
            // with nothing to send to, sidesteps that re-entrant lock entirely.
            if front.is_cancelled() {
                self.pending_requests.pop_front();
                continue;
            }
            match &front.kind {
                PendingKind::Write { .. } => {
                    if self.is_write_grantable() {
                        let entry = self.pending_requests.pop_front().expect("front checked above");
                        let PendingKind::Write { remote, responder } = entry.kind else {
                            unreachable!("matched Write above")
                        };
                        let (guard, exclusive, rx) = self.grant_write(remote);
                        let lock_id = guard.lock_id();
                        // Spawn the unlock watcher regardless of whether the caller is still
                        // listening: if `send` fails the guard drops immediately, and only the
                        // watcher (via `WriteGuard::drop`'s implicit resolution) restores
                        // `write_lock`/`current` afterwards. Skipping it here would leave the
                        // grant permanently stuck.
                        spawns.push((lock_id, exclusive, rx));
                        let _ = responder.send(Ok(guard));
                    }
                    break;
                }
                PendingKind::Read(_) => {
                    if self.is_read_queued_grantable() {
                        let entry = self.pending_requests.pop_front().expect("front checked above");
                        let PendingKind::Read(tx) = entry.kind else {
                            unreachable!("matched Read above")
                        };
                        let _ = tx.send(Ok(self.grant_read(server)));
                        continue;
                    }
                    break;
                }
            }
        }
        spawns
    }

    /// Keep-alive recovery for a remote write lock that never committed (see `DESIGN.md` for
    /// why this only ever applies to remote/`OnCopy` holds).
    fn recover_expired_write_lock(&mut self, now: Instant, tx: &watch::Sender<Option<Buffer<T>>>, server: &Weak<Inner<T>>) -> Vec<PendingSpawn<T>> {
        warn!(lock_id = %self.lock_id, "write-lock keep-alive expired, recovering");
        self.lock_id = self.lock_id.next();
        self.write_lock = WriteLockState::None;
        self.write_lock_deadline = None;
        if !self.pending_changes.is_empty() {
            let mut buf = buffer::deep_clone(self.current.as_ref().expect("current present (remote write locks never remove it)"));
            self.drain_pending_onto(&mut buf);
            self.current = Some(buf);
            self.publish(tx);
        }
        self.reprocess_queue(now, server)
    }
}

/// Server-internal shared state, reference-counted by [`Blackboard`] handles and by the
/// background tasks that watch unlock promises and sweep expired lock requests.
pub(crate) struct Inner<T> {
    name: String,
    config: Config,
    pool: BufferPool<T>,
    publish_tx: watch::Sender<Option<Buffer<T>>>,
    state: Mutex<State<T>>,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + Sync + 'static> Inner<T> {
    /// For reads, the returned handle carries a back-pointer to the server; its drop
    /// reprocesses pending lock requests, since releasing a snapshot may be what makes the
    /// current buffer unique again.
    pub(crate) fn on_read_release(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut state = self.state.lock();
        if state.torn_down {
            return;
        }
        let spawns = state.reprocess_queue(Instant::now(), &weak);
        drop(state);
        self.spawn_all(spawns);
    }

    fn spawn_all(self: &Arc<Self>, spawns: Vec<PendingSpawn<T>>) {
        for (lock_id, exclusive, rx) in spawns {
            self.spawn_unlock_watcher(lock_id, exclusive, rx);
        }
    }

    /// Binds the unlock callback: awaits the unlock promise's resolution and, inside the
    /// server mutex, performs the state-machine transition it implies. Holds only a `Weak`
    /// reference so an abandoned server (no live `Blackboard` handle, never `managed_delete`d)
    /// can still be reclaimed instead of being kept alive by this task.
    fn spawn_unlock_watcher(self: &Arc<Self>, lock_id: LockId, exclusive: bool, rx: oneshot::Receiver<CommitOutcome<T>>) {
        let weak: Weak<Inner<T>> = Arc::downgrade(self);
        tokio::spawn(async move {
            let outcome = rx.await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.handle_unlock(lock_id, exclusive, outcome);
        });
    }

    /// Handles every way a write lock's unlock promise can resolve: committed, explicitly
    /// released without changes, or (implicitly, via `Drop`) abandoned.
    fn handle_unlock(self: &Arc<Self>, lock_id: LockId, exclusive: bool, outcome: Result<CommitOutcome<T>, oneshot::error::RecvError>) {
        let weak = Arc::downgrade(self);
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.torn_down || state.lock_id != lock_id {
            debug!(%lock_id, "discarding outdated write-unlock");
            return;
        }

        let spawns = match outcome {
            Ok(CommitOutcome::Commit(mut buf)) => {
                state.drain_pending_onto(&mut buf);
                state.current = Some(buf);
                state.write_lock = WriteLockState::None;
                state.write_lock_deadline = None;
                state.publish(&self.publish_tx);
                state.reprocess_queue(now, &weak)
            }
            Ok(CommitOutcome::NoChange { buffer: guard_buf, implicit }) => {
                if implicit {
                    warn!(%lock_id, "write lock released without an explicit commit, recovering as a lock-holder failure");
                }
                if exclusive {
                    // No independent "previous" buffer exists to fall back to; the guard's
                    // buffer *is* the only copy and must be restored either way.
                    let mut buf = guard_buf;
                    let had_pending = !state.pending_changes.is_empty();
                    state.drain_pending_onto(&mut buf);
                    state.current = Some(buf);
                    state.write_lock = WriteLockState::None;
                    state.write_lock_deadline = None;
                    if had_pending || implicit {
                        state.publish(&self.publish_tx);
                    }
                } else {
                    // `OnCopy`: the private scratch buffer is simply discarded; `current`
                    // (still the pre-lock contents) needs the pending changes applied instead.
                    drop(guard_buf);
                    state.write_lock = WriteLockState::None;
                    state.write_lock_deadline = None;
                    let had_pending = !state.pending_changes.is_empty();
                    if had_pending {
                        let mut buf = buffer::deep_clone(state.current.as_ref().expect("current present outside an exclusive hold"));
                        state.drain_pending_onto(&mut buf);
                        state.current = Some(buf);
                    }
                    if had_pending || implicit {
                        state.publish(&self.publish_tx);
                    }
                }
                state.reprocess_queue(now, &weak)
            }
            Err(_) => {
                // Practically unreachable: `WriteGuard::drop` always resolves the channel
                // before its fields drop. Kept as a defensive fallback (e.g. `mem::forget`).
                warn!(%lock_id, "write-unlock channel closed without a resolution");
                state.write_lock = WriteLockState::None;
                state.write_lock_deadline = None;
                state.reprocess_queue(now, &weak)
            }
        };
        drop(state);
        self.spawn_all(spawns);
    }
}

fn spawn_sweep_task<T: Clone + Send + Sync + 'static>(inner: &Arc<Inner<T>>) -> JoinHandle<()> {
    let weak: Weak<Inner<T>> = Arc::downgrade(inner);
    let interval = inner.config.lock_check_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; nothing to sweep yet.
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let mut state = inner.state.lock();
            if state.torn_down {
                break;
            }
            let now = Instant::now();
            sweep_expired(&mut state.pending_requests, now);
            let spawns = if state.write_lock_deadline.map(|d| now >= d).unwrap_or(false) {
                state.recover_expired_write_lock(now, &inner.publish_tx, &weak)
            } else {
                Vec::new()
            };
            drop(state);
            inner.spawn_all(spawns);
        }
    })
}

/// A shared, typed, array-structured value cell. Cheap to clone; every clone refers to the
/// same underlying server.
pub struct Blackboard<T>(Arc<Inner<T>>);

impl<T> Clone for Blackboard<T> {
    fn clone(&self) -> Self {
        Blackboard(Arc::clone(&self.0))
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Blackboard<T> {
    /// Constructs a server with `config.initial_len` default-constructed elements. Publishes
    /// once at construction if the mode is not `SingleBuffered` and the initial length is
    /// non-zero.
    pub fn new(name: impl Into<String>, config: Config) -> Result<Self, BlackboardError> {
        config.validate()?;
        let pool = BufferPool::new(config.max_pooled_buffers);
        let initial = pool.obtain_unused(config.initial_len)?;
        let (publish_tx, _rx) = watch::channel(None);

        let state = State {
            current: Some(initial),
            write_lock: WriteLockState::None,
            lock_id: LockId::initial(),
            pending_changes: VecDeque::new(),
            pending_requests: VecDeque::new(),
            revision: Revision::zero(),
            buffer_mode: config.buffer_mode,
            torn_down: false,
            write_lock_deadline: None,
            write_lock_keep_alive: config.write_lock_keep_alive,
        };

        let inner = Arc::new(Inner {
            name: name.into(),
            config: config.clone(),
            pool,
            publish_tx,
            state: Mutex::new(state),
            sweep_task: Mutex::new(None),
        });

        if config.initial_len != 0 && config.buffer_mode != BufferMode::SingleBuffered {
            inner.state.lock().publish(&inner.publish_tx);
        }

        let task = spawn_sweep_task(&inner);
        *inner.sweep_task.lock() = Some(task);
        Ok(Blackboard(inner))
    }
}

impl<T: Clone + Send + Sync + 'static> Blackboard<T> {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Takes a read lock, returning a const snapshot once one can be granted or failing once
    /// `timeout` elapses without one.
    pub async fn read_lock(&self, timeout: Duration) -> Result<ReadGuard<T>, BlackboardError> {
        let now = Instant::now();
        let weak = Arc::downgrade(&self.0);
        let mut state = self.0.state.lock();
        if state.torn_down {
            return Err(BlackboardError::TornDown);
        }

        if state.is_read_immediately_grantable() {
            let guard = state.grant_read(&weak);
            drop(state);
            return Ok(guard);
        }

        // Adaptive upgrade: this read would have to block, so an adaptive mode irreversibly
        // becomes MultiBuffered. The upgrade may or may not make *this* particular read
        // grantable right away (it still can't jump an Exclusive writer).
        if state.buffer_mode == BufferMode::MultiBufferedOnParallelAccess {
            state.buffer_mode = BufferMode::MultiBuffered;
            if state.is_read_immediately_grantable() {
                let guard = state.grant_read(&weak);
                drop(state);
                return Ok(guard);
            }
        }

        if timeout.is_zero() {
            return Err(BlackboardError::Timeout);
        }

        let (tx, rx) = oneshot::channel();
        state.pending_requests.push_back(PendingRequest {
            kind: PendingKind::Read(tx),
            deadline: now + timeout,
        });
        drop(state);
        rx.await.unwrap_or(Err(BlackboardError::Timeout))
    }

    /// Takes a write lock. `remote` must be `true` for any call that arrived via RPC
    /// deserialization, so the server can tell such a call apart from a local one.
    pub async fn write_lock(&self, timeout: Duration, remote: bool) -> Result<WriteGuard<T>, BlackboardError> {
        let now = Instant::now();
        let mut state = self.0.state.lock();
        if state.torn_down {
            return Err(BlackboardError::TornDown);
        }

        if state.is_write_grantable() {
            let (guard, exclusive, rx) = state.grant_write(remote);
            let lock_id = guard.lock_id();
            drop(state);
            self.0.spawn_unlock_watcher(lock_id, exclusive, rx);
            return Ok(guard);
        }

        if timeout.is_zero() {
            return Err(BlackboardError::Timeout);
        }

        let (tx, rx) = oneshot::channel();
        state.pending_requests.push_back(PendingRequest {
            kind: PendingKind::Write { remote, responder: tx },
            deadline: now + timeout,
        });
        drop(state);
        rx.await.unwrap_or(Err(BlackboardError::Timeout))
    }

    /// Applies a change-set without taking a lock. An empty change-set is a guaranteed no-op
    /// in every server state.
    pub fn asynchronous_change(&self, changes: ChangeSet<T>) {
        if changes.is_empty() {
            return;
        }
        let mut state = self.0.state.lock();
        if state.torn_down {
            return;
        }

        if !state.write_lock.is_none() {
            state.pending_changes.push_back(changes);
            return;
        }

        let mut buf = state.current.take().expect("current present while idle");
        if !buffer::is_unique(&buf) {
            changes.apply_to(buffer::make_unique_mut(&mut buf));
        } else {
            changes.apply_to(Arc::get_mut(&mut buf).expect("uniqueness checked above").as_mut_slice());
        }
        state.current = Some(buf);
        state.publish(&self.0.publish_tx);
    }

    /// Unconditionally replaces the current buffer's contents, clears any pending change
    /// queue, and discards any outstanding unlock without invoking the lock-holder's commit.
    pub fn direct_commit(&self, data: Vec<T>) {
        let now = Instant::now();
        let weak = Arc::downgrade(&self.0);
        let mut state = self.0.state.lock();
        if state.torn_down {
            return;
        }

        state.pending_changes.clear();
        state.lock_id = state.lock_id.next();
        state.write_lock = WriteLockState::None;
        state.write_lock_deadline = None;
        state.current = Some(self.0.pool.wrap(data));
        state.publish(&self.0.publish_tx);
        let spawns = state.reprocess_queue(now, &weak);
        drop(state);
        self.0.spawn_all(spawns);
    }

    /// The current revision counter, bumped by one on every publication.
    pub fn revision(&self) -> Revision {
        self.0.state.lock().revision
    }

    /// The buffer-mode policy this server is currently using, reflecting any in-place adaptive
    /// upgrade.
    pub fn buffer_mode(&self) -> BufferMode {
        self.0.state.lock().buffer_mode
    }

    /// The auto-connect mode this server was constructed with, carried unchanged for the
    /// lifetime of the instance. Purely informational: the server itself never acts on it.
    pub fn auto_connect_mode(&self) -> AutoConnectMode {
        self.0.config.auto_connect
    }

    /// Subscribes to the publication port: a push-based alternative to polling `read_lock` for
    /// subscribers that merely want the latest snapshot. Never fires in `SingleBuffered` mode,
    /// where subscribers are expected to read the one buffer directly on request instead.
    pub fn subscribe(&self) -> watch::Receiver<Option<Buffer<T>>> {
        self.0.publish_tx.subscribe()
    }

    /// Tears the server down. Idempotent; subsequent operations fail with
    /// [`BlackboardError::TornDown`].
    pub fn managed_delete(&self) {
        let mut state = self.0.state.lock();
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        state.lock_id = LockId::torn_down();
        state.write_lock = WriteLockState::None;
        state.write_lock_deadline = None;
        while let Some(request) = state.pending_requests.pop_front() {
            request.resolve_torn_down();
        }
        drop(state);
        if let Some(task) = self.0.sweep_task.lock().take() {
            task.abort();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Component for Blackboard<T> {
    fn name(&self) -> &str {
        Blackboard::name(self)
    }

    fn parent(&self) -> Option<Arc<dyn Component + Send + Sync>> {
        None
    }

    fn prepare_delete(&self) {
        self.managed_delete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::ChangeEntry;

    fn cfg(mode: BufferMode, initial_len: usize) -> Config {
        Config {
            initial_len,
            buffer_mode: mode,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn read_after_write_sees_committed_values() {
        let bb: Blackboard<f64> = Blackboard::new("bb", cfg(BufferMode::MultiBuffered, 20)).unwrap();
        let mut w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
        for i in 0..10 {
            w[i] = 7.0;
        }
        w.commit();
        let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
        assert!(r[0..10].iter().all(|v| *v == 7.0));
        assert!(r[10..20].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn revision_increases_by_one_per_publication() {
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::MultiBuffered, 4)).unwrap();
        let before = bb.revision();
        let w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
        w.commit();
        assert_eq!(bb.revision().value(), before.value() + 1);
    }

    #[tokio::test]
    async fn asynchronous_change_while_locked_is_deferred() {
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::MultiBuffered, 4)).unwrap();
        let w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
        let before = bb.revision();
        bb.asynchronous_change(ChangeSet::new(vec![ChangeEntry::new(0, 99)]));
        assert_eq!(bb.revision().value(), before.value()); // no publish yet
        w.commit();
        let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
        assert_eq!(r[0], 99);
    }

    #[tokio::test]
    async fn write_lock_mutual_exclusion() {
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::MultiBuffered, 1)).unwrap();
        let _w1 = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
        let w2 = bb.write_lock(Duration::ZERO, false).await;
        assert!(matches!(w2, Err(BlackboardError::Timeout)));
    }

    #[tokio::test]
    async fn direct_commit_replaces_contents_and_publishes() {
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::MultiBuffered, 2)).unwrap();
        let before = bb.revision();
        bb.direct_commit(vec![5, 6, 7]);
        assert_eq!(bb.revision().value(), before.value() + 1);
        let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
        assert_eq!(r.as_slice(), &[5, 6, 7]);
    }

    #[tokio::test]
    async fn managed_delete_rejects_further_operations() {
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::MultiBuffered, 1)).unwrap();
        bb.managed_delete();
        let err = bb.read_lock(Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, BlackboardError::TornDown));
    }

    #[tokio::test]
    async fn single_buffered_exclusive_blocks_reader_until_unlock() {
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::SingleBuffered, 4)).unwrap();
        let w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
        let bb2 = bb.clone();
        let reader = tokio::spawn(async move { bb2.read_lock(Duration::from_millis(200)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        w.commit();
        let r = reader.await.unwrap().unwrap();
        assert_eq!(r.len(), 4);
    }

    #[tokio::test]
    async fn queued_request_past_its_deadline_is_discarded_without_waiting_for_the_sweep() {
        // A long `lock_check_interval` means the periodic sweep alone would not catch this
        // queued reader expiring; the event-triggered walk in `reprocess_queue` must discard
        // it inline when the holder finally unlocks.
        let bb: Blackboard<i32> = Blackboard::new(
            "bb",
            Config {
                initial_len: 4,
                buffer_mode: BufferMode::SingleBuffered,
                lock_check_interval: Duration::from_millis(250),
                ..Config::default()
            },
        )
        .unwrap();

        let w = bb.write_lock(Duration::from_secs(5), false).await.unwrap();
        let bb2 = bb.clone();
        let reader = tokio::spawn(async move { bb2.read_lock(Duration::from_millis(30)).await });

        // Let the reader's own deadline pass while the writer still holds the lock.
        tokio::time::sleep(Duration::from_millis(60)).await;
        w.commit();

        let result = reader.await.unwrap();
        assert!(matches!(result, Err(BlackboardError::Timeout)));
    }

    #[tokio::test]
    async fn cancelled_queued_reader_does_not_deadlock_reprocessing() {
        // Regression test: reprocessing must discard a queued read whose caller already
        // dropped its future before granting it. Building a `ReadGuard` for it would drop the
        // guard inline, and `ReadGuard::drop` calls back into the server's own mutex, which
        // `reprocess_queue`'s caller is already holding.
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::SingleBuffered, 4)).unwrap();
        let w = bb.write_lock(Duration::from_secs(5), false).await.unwrap();

        let bb2 = bb.clone();
        let reader = tokio::spawn(async move { bb2.read_lock(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        reader.abort(); // drops the queued request's receiver while still enqueued.
        tokio::time::sleep(Duration::from_millis(10)).await;

        w.commit();

        // A deadlock on reprocessing would hang this call forever.
        let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
        assert_eq!(r.len(), 4);
    }

    #[tokio::test]
    async fn adaptive_mode_blocks_reader_like_single_buffered_before_upgrading() {
        // Regression test: before the first read-would-block, `MultiBufferedOnParallelAccess`
        // must behave exactly like `SingleBuffered` (exclusive local writes, readers queue
        // behind them) or the upgrade path in `read_lock` is never reached.
        let bb: Blackboard<i32> = Blackboard::new("bb", cfg(BufferMode::MultiBufferedOnParallelAccess, 4)).unwrap();
        let w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();

        let bb2 = bb.clone();
        let reader = tokio::spawn(async move { bb2.read_lock(Duration::from_millis(200)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished(), "reader must still be blocked behind the exclusive writer");
        assert_eq!(bb.buffer_mode(), BufferMode::MultiBuffered, "blocking read must upgrade the mode immediately");

        w.commit();
        reader.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn auto_connect_mode_is_carried_from_config() {
        let bb: Blackboard<i32> = Blackboard::new(
            "bb",
            Config {
                initial_len: 1,
                auto_connect: crate::config::AutoConnectMode::Shared,
                ..Config::default()
            },
        )
        .unwrap();
        assert_eq!(bb.auto_connect_mode(), crate::config::AutoConnectMode::Shared);
    }
}
