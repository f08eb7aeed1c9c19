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

//! The revision counter: a monotonically non-decreasing identifier bumped on every
//! publication, guarded by the same mutex as the rest of the server's state rather than
//! kept atomic — nothing reads it without already holding that lock.

use std::fmt;

/// A published revision of the blackboard's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    pub(crate) const fn zero() -> Self {
        Revision(0)
    }

    /// Returns the next revision. Wraps on overflow.
    #[must_use]
    pub(crate) fn next(self) -> Self {
        Revision(self.0.wrapping_add(1))
    }

    /// The raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rev#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(Revision::zero().value(), 0);
    }

    #[test]
    fn increments_by_one() {
        let r = Revision::zero();
        assert_eq!(r.next().value(), 1);
        assert_eq!(r.next().next().value(), 2);
    }

    #[test]
    fn wraps_on_overflow() {
        let r = Revision(u64::MAX);
        assert_eq!(r.next().value(), 0);
    }
}
