// Copyright 2024 tison <wander4096@gmail.com>
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

//! The one-shot wake handle connecting a pair to its dispatcher.
//!
//! A [`Waker`] is installed on the receiving half when a pair is created and
//! consumed exactly once, when the sender completes or cancels the transfer.
//! A consumed (or default-constructed) handle is *empty*: firing it is a
//! no-op, and [`is_empty`] reports `true`.
//!
//! `Waker` wraps a [`std::task::Waker`], so any executor's wake mechanism
//! plugs in directly:
//!
//! ```
//! use std::sync::Arc;
//! use std::task;
//! use std::task::Wake;
//!
//! use handoff::waker::Waker;
//!
//! struct Enqueue;
//!
//! impl Wake for Enqueue {
//!     fn wake(self: Arc<Self>) {
//!         // hand the task back to the dispatcher's run queue
//!     }
//! }
//!
//! let empty = Waker::empty();
//! assert!(empty.is_empty());
//!
//! let waker = Waker::from(task::Waker::from(Arc::new(Enqueue)));
//! assert!(!waker.is_empty());
//! waker.fire();
//! ```
//!
//! Channels fire the handle while holding the pair lock, so the wrapped
//! waker's `wake` must not block: it should do no more than enqueue the task
//! with its dispatcher. A `wake` that blocks on a resource held by the
//! polling side deadlocks the pair.
//!
//! [`is_empty`]: Waker::is_empty

use std::fmt;
use std::mem;
use std::task;


/// A one-shot handle used to signal the dispatcher that the receiving task is
/// ready to be polled again.
///
/// See the [module level documentation](self) for more.
#[derive(Default)]
pub struct Waker {
    inner: Option<task::Waker>,
}

impl Waker {
    /// Creates an empty handle. Firing it is a no-op.
    ///
    /// An empty handle is indistinguishable from one that has already been
    /// consumed, so a by-reference pair created with an empty waker reports
    /// completion on the first poll.
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// Returns `true` if this handle holds no task waker, either because it
    /// was created empty or because it has been consumed.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Consumes the handle, waking the wrapped task waker if one is present.
    pub fn fire(self) {
        if let Some(waker) = self.inner {
            waker.wake();
        }
    }

    /// Takes the handle out of its slot, leaving an empty one behind.
    ///
    /// Receivers inspect the emptied slot to distinguish a completed transfer
    /// from a pending one.
    pub(crate) fn take(&mut self) -> Waker {
        mem::take(self)
    }
}

impl From<task::Waker> for Waker {
    fn from(waker: task::Waker) -> Self {
        Self { inner: Some(waker) }
    }
}

impl fmt::Debug for Waker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waker")
            .field("empty", &self.is_empty())
            .finish()
    }
}
