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

//! Minimal stand-in for the hosting component framework a surrounding component/module
//! framework would otherwise provide. The core only needs a name, an optional parent, and
//! the `init`/`prepare_delete` lifecycle hooks a real framework would call; it implements
//! this trait rather than assuming any particular framework's own base class.

use std::sync::Arc;

/// The lifecycle surface a surrounding component framework is assumed to drive. A real
/// framework calls `init()` once after construction and `prepare_delete()` before the
/// component is torn down; this crate's [`crate::server::Blackboard`] implements both, with
/// `prepare_delete` forwarding to [`crate::server::Blackboard::managed_delete`].
pub trait Component {
    /// The component's name, as used for by-name lookup (see `AutoConnectMode`).
    fn name(&self) -> &str;

    /// The component's parent in the framework's tree, if any.
    fn parent(&self) -> Option<Arc<dyn Component + Send + Sync>>;

    /// Called once after construction. No-op by default.
    fn init(&self) {}

    /// Called before the component is removed from the tree. Must release any server-held
    /// resources synchronously.
    fn prepare_delete(&self);
}
