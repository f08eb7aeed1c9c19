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

//! A concurrent, versioned, array-structured shared value cell with transactional writes and
//! non-blocking reader snapshots.
//!
//! A [`Blackboard<T>`](server::Blackboard) holds a `Vec<T>`-shaped value behind a single
//! server. Readers take a [`ReadGuard`] snapshot that never blocks on a writer; writers take
//! a [`WriteGuard`] that either mutates the live buffer in place (`SingleBuffered`, when
//! uniquely owned) or a private copy of it (`MultiBuffered`, or any time a reader is
//! outstanding), and either [`WriteGuard::commit`] or [`WriteGuard::commit_no_changes`] it
//! when done. Callers that only need to poke a handful of elements without taking a lock can
//! use [`Blackboard::asynchronous_change`] instead.
//!
//! ```no_run
//! use std::time::Duration;
//! use blackboard::{Blackboard, Config};
//!
//! # async fn example() -> Result<(), blackboard::BlackboardError> {
//! let bb: Blackboard<f64> = Blackboard::new("distances", Config { initial_len: 8, ..Config::default() })?;
//! let mut w = bb.write_lock(Duration::from_secs(1), false).await?;
//! w[0] = 1.5;
//! w.commit();
//!
//! let r = bb.read_lock(Duration::from_secs(1)).await?;
//! assert_eq!(r[0], 1.5);
//! # Ok(())
//! # }
//! ```

mod buffer;
pub mod changeset;
pub mod component;
pub mod config;
pub mod error;
pub mod handle;
mod lock;
pub mod revision;
#[cfg(feature = "serde")]
pub mod rpc;
mod server;

pub use changeset::ChangeEntry;
pub use changeset::ChangeSet;
pub use component::Component;
pub use config::AutoConnectMode;
pub use config::BufferMode;
pub use config::Config;
pub use error::BlackboardError;
pub use handle::ReadGuard;
pub use handle::WriteGuard;
pub use revision::Revision;
pub use server::Blackboard;
