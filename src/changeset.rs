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

//! Change-set engine.
//!
//! A [`ChangeSet<T>`] is an ordered list of element replacements, applied atomically to
//! whichever buffer the server is certain it may mutate. The element-indexed form here is the
//! replacement for the original's deprecated byte-offset `AsynchChange` API — out of scope for
//! this implementation.

use tracing::warn;

/// One element replacement within a [`ChangeSet`]: `index < 0` is the skip sentinel, carried
/// here as `i64` so the sentinel survives without a separate `Option` wrapper.
#[derive(Debug, Clone)]
pub struct ChangeEntry<T> {
    pub index: i64,
    pub value: T,
}

impl<T> ChangeEntry<T> {
    pub fn new(index: i64, value: T) -> Self {
        ChangeEntry { index, value }
    }
}

/// An ordered sequence of element replacements intended to apply atomically.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet<T> {
    entries: Vec<ChangeEntry<T>>,
}

impl<T> ChangeSet<T> {
    pub fn new(entries: Vec<ChangeEntry<T>>) -> Self {
        ChangeSet { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Applies every entry to `target` in order. An entry whose index is negative is a no-op
    /// (skip sentinel); an entry whose index is at or past `target.len()` is dropped with a
    /// warning rather than treated as an error.
    pub fn apply_to(self, target: &mut [T]) {
        for entry in self.entries {
            if entry.index < 0 {
                continue;
            }
            let idx = entry.index as usize;
            match target.get_mut(idx) {
                Some(slot) => *slot = entry.value,
                None => {
                    warn!(index = entry.index, len = target.len(), "change-set index out of range, skipping");
                }
            }
        }
    }
}

impl<T> FromIterator<ChangeEntry<T>> for ChangeSet<T> {
    fn from_iter<I: IntoIterator<Item = ChangeEntry<T>>>(iter: I) -> Self {
        ChangeSet::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_in_order() {
        let mut buf = vec![0i32; 5];
        let cs = ChangeSet::new(vec![ChangeEntry::new(0, 10), ChangeEntry::new(2, 20)]);
        cs.apply_to(&mut buf);
        assert_eq!(buf, vec![10, 0, 20, 0, 0]);
    }

    #[test]
    fn skip_sentinel_is_noop() {
        let mut buf = vec![1, 2, 3];
        let cs = ChangeSet::new(vec![ChangeEntry::new(-1, 99)]);
        cs.apply_to(&mut buf);
        assert_eq!(buf, vec![1, 2, 3]);
    }

    #[test]
    fn out_of_range_is_skipped_not_fatal() {
        let mut buf = vec![1, 2, 3];
        let cs = ChangeSet::new(vec![ChangeEntry::new(10, 99), ChangeEntry::new(1, 42)]);
        cs.apply_to(&mut buf);
        assert_eq!(buf, vec![1, 42, 3]);
    }

    #[test]
    fn empty_change_set_is_idempotent_noop() {
        let mut buf = vec![1, 2, 3];
        let cs: ChangeSet<i32> = ChangeSet::new(vec![]);
        assert!(cs.is_empty());
        cs.apply_to(&mut buf);
        assert_eq!(buf, vec![1, 2, 3]);
    }
}
