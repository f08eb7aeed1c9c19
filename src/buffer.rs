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

//! Buffer & reference manager.
//!
//! A [`Buffer<T>`] is an `Arc` over the element storage. `Arc`'s own strong/weak counts give
//! us the "is-unique" query for free (`Arc::get_mut` succeeds iff no other handle can observe
//! a mutation), which is the safe, idiomatic equivalent of the reference-count discrimination
//! `active_standby`'s `Table`/`TableWriteGuard` perform manually with raw pointers. Buffers
//! are drawn from a bounded [`BufferPool`] standing in for the data-port subsystem's pool
//! source; exhausting it is a `PoolExhaustion` failure.

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;

use crate::error::BlackboardError;

/// One physical copy of the blackboard's elements, reference-counted so that snapshot
/// handles can share it until the last one drops.
pub type Buffer<T> = Arc<BufferCell<T>>;

/// A buffer's affiliation with the pool it was allocated from. `counted` is true only for
/// buffers actually drawn via [`BufferPool::obtain_unused`] — the pool's `outstanding` count
/// tracks those, and only those, against `max_buffers`. Buffers built by [`deep_clone`],
/// [`make_unique_mut`]'s clone-on-write path, or [`BufferPool::wrap`] still return their
/// storage to the free list on drop (so the `Vec` allocation isn't wasted), but were never
/// checked out against the pool's capacity, so they must not be un-checked-out either.
struct PoolAffiliation<T> {
    shared: Weak<PoolShared<T>>,
    counted: bool,
}

/// Backing storage for a [`Buffer`]. Returns its `Vec` to the pool it was drawn from (if any)
/// when the last reference is dropped, rather than deallocating outright — the pool's free
/// list is this storage's way home.
pub struct BufferCell<T> {
    data: Vec<T>,
    pool: Option<PoolAffiliation<T>>,
}

impl<T: fmt::Debug> fmt::Debug for BufferCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferCell").field("data", &self.data).finish()
    }
}

impl<T> BufferCell<T> {
    /// Borrow the elements.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mutable access to the elements. Callers only ever reach this through
    /// [`Arc::get_mut`] on a uniquely-owned [`Buffer`], so there is no torn-write risk.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Drop for BufferCell<T> {
    fn drop(&mut self) {
        if let Some(affiliation) = self.pool.take() {
            if let Some(pool) = affiliation.shared.upgrade() {
                let reclaimed = std::mem::take(&mut self.data);
                pool.reclaim(reclaimed, affiliation.counted);
            }
        }
    }
}

/// True iff no other handle can observe mutations to `buf` (the "is-unique" query).
pub fn is_unique<T>(buf: &Buffer<T>) -> bool {
    Arc::strong_count(buf) == 1 && Arc::weak_count(buf) == 0
}

/// Ensures `buf` is uniquely owned, deep-copying its contents into a fresh buffer first if it
/// is shared (used when the writer requires exclusive mutation but the current buffer is
/// shared). Returns mutable access to the (now unique) element storage. The clone-on-write
/// copy is never itself checked out against the pool's capacity — only `obtain_unused` is.
pub fn make_unique_mut<'a, T: Clone>(buf: &'a mut Buffer<T>) -> &'a mut Vec<T> {
    if !is_unique(buf) {
        let pool = buf.pool.as_ref().map(|affiliation| PoolAffiliation {
            shared: affiliation.shared.clone(),
            counted: false,
        });
        let data = buf.data.clone();
        *buf = Arc::new(BufferCell { data, pool });
    }
    &mut Arc::get_mut(buf)
        .expect("buffer was just made unique")
        .data
}

/// Deep-clones `buf` into a brand new, independently-owned buffer (used to stash a recovery
/// snapshot before handing out an `Exclusive` write lock; see `crate::server`). Like
/// [`make_unique_mut`]'s clone-on-write path, the clone recycles its storage into the pool's
/// free list on drop but is not counted against the pool's capacity.
pub fn deep_clone<T: Clone>(buf: &Buffer<T>) -> Buffer<T> {
    let pool = buf.pool.as_ref().map(|affiliation| PoolAffiliation {
        shared: affiliation.shared.clone(),
        counted: false,
    });
    Arc::new(BufferCell { data: buf.data.clone(), pool })
}

struct PoolState<T> {
    free: Vec<Vec<T>>,
    outstanding: usize,
}

struct PoolShared<T> {
    state: Mutex<PoolState<T>>,
    max_buffers: usize,
}

impl<T> PoolShared<T> {
    fn reclaim(&self, data: Vec<T>, counted: bool) {
        let mut state = self.state.lock();
        if counted {
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        state.free.push(data);
    }
}

/// A bounded pool of reusable element storage, standing in for the data-port subsystem as the
/// source of "unused" buffers.
pub struct BufferPool<T> {
    shared: Arc<PoolShared<T>>,
}

impl<T> fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BufferPool")
            .field("outstanding", &state.outstanding)
            .field("max_buffers", &self.shared.max_buffers)
            .finish()
    }
}

impl<T> Clone for BufferPool<T> {
    fn clone(&self) -> Self {
        BufferPool {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Default> BufferPool<T> {
    /// Creates a pool that allows at most `max_buffers` unused buffers to be outstanding at
    /// once.
    pub fn new(max_buffers: usize) -> Self {
        BufferPool {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    free: Vec::new(),
                    outstanding: 0,
                }),
                max_buffers,
            }),
        }
    }

    /// Draws a blank, exclusively-owned buffer of `len` default-constructed elements from the
    /// pool. Fails with [`BlackboardError::PoolExhaustion`] if doing so would exceed the
    /// pool's capacity. This is the only way a buffer becomes "counted" against that capacity;
    /// every other buffer constructor in this module merely piggybacks on the same free list.
    pub fn obtain_unused(&self, len: usize) -> Result<Buffer<T>, BlackboardError> {
        let mut state = self.shared.state.lock();
        if state.outstanding >= self.shared.max_buffers {
            return Err(BlackboardError::PoolExhaustion {
                outstanding: state.outstanding,
                limit: self.shared.max_buffers,
            });
        }
        state.outstanding += 1;
        let mut data = state.free.pop().unwrap_or_default();
        drop(state);
        data.clear();
        data.resize(len, T::default());
        Ok(Arc::new(BufferCell {
            data,
            pool: Some(PoolAffiliation { shared: Arc::downgrade(&self.shared), counted: true }),
        }))
    }
}

impl<T> BufferPool<T> {
    /// Wraps caller-supplied contents as a pool-affiliated buffer (used by `DirectCommit`,
    /// which hands the server a finished `Vec<T>` rather than drawing a blank one). Needs
    /// neither `Clone` nor `Default`, unlike [`BufferPool::obtain_unused`], so it lives in its
    /// own impl block with the minimal bound `direct_commit` actually requires. Not counted
    /// against the pool's capacity, matching every other non-`obtain_unused` constructor here.
    pub fn wrap(&self, data: Vec<T>) -> Buffer<T> {
        Arc::new(BufferCell {
            data,
            pool: Some(PoolAffiliation { shared: Arc::downgrade(&self.shared), counted: false }),
        })
    }
}
