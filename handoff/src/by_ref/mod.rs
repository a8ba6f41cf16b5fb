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

//! A one-shot by-reference channel: the sender mutates a caller-owned buffer
//! in place, the receiver polls for completion.
//!
//! Where [`value`](crate::value) moves its payload through the channel,
//! this flavor leaves the payload where it is and hands the sender exclusive
//! write access to it. That makes it the right tool for filling in a large
//! pre-allocated buffer without a copy.
//!
//! [`pair`] borrows the target for as long as either endpoint lives, so the
//! caller cannot read or write the buffer until the transfer ends; exclusive
//! access moves back to the caller when both endpoints are gone.
//!
//! Completion is signalled through the pair's waker slot: once the sender has
//! consumed the waker with [`set`] or [`commit`], polling reports ready. If
//! the sender is dropped before committing, the receiver observes
//! [`Cancelled`] instead, and the buffer keeps whatever partial modifications
//! were applied.
//!
//! # Examples
//!
//! Single-step assignment:
//!
//! ```
//! use std::task::Poll;
//!
//! use handoff::by_ref;
//! use handoff::waker::Waker;
//!
//! let mut slot = 0u32;
//! let (mut tx, mut rx) = by_ref::pair(&mut slot, Waker::empty());
//!
//! tx.set(7);
//! assert_eq!(rx.poll(), Poll::Ready(Ok(())));
//!
//! drop(tx);
//! drop(rx);
//! assert_eq!(slot, 7);
//! ```
//!
//! Multi-step modification, committed once:
//!
//! ```
//! use std::task::Poll;
//!
//! use handoff::by_ref;
//! use handoff::waker::Waker;
//!
//! let mut buffer = [0u8; 4];
//! let (mut tx, mut rx) = by_ref::pair(&mut buffer, Waker::empty());
//!
//! tx.modify_unsafe(|b| b[0] = 1);
//! tx.modify_unsafe(|b| b[3] = 9);
//! tx.commit();
//! assert_eq!(rx.poll(), Poll::Ready(Ok(())));
//!
//! drop(tx);
//! drop(rx);
//! assert_eq!(buffer, [1, 0, 0, 9]);
//! ```
//!
//! [`set`]: Sender::set
//! [`commit`]: Sender::commit
//! [`Cancelled`]: crate::Cancelled

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;
use std::task::Poll;

use crate::Cancelled;
use crate::internal::Mutex;
use crate::waker::Waker;


/// Creates a new linked pair of [`Sender`] and [`Receiver`] around `target`.
///
/// The target is borrowed until both endpoints are dropped; the sender holds
/// exclusive logical access to it in the meantime. `waker` is fired exactly
/// once, when the sender commits its modifications or is dropped without
/// committing.
pub fn pair<'a, T>(target: &'a mut T, waker: Waker) -> (Sender<'a, T>, Receiver<'a, T>) {
    let channel = Arc::new(Channel {
        state: Mutex::new(State {
            linked: true,
            cancelled: false,
            target: NonNull::from(target),
            waker,
        }),
    });
    (
        Sender {
            channel: Some(channel.clone()),
            _target: PhantomData,
        },
        Receiver {
            channel: Some(channel),
            _target: PhantomData,
        },
    )
}

/// Links `sender` and `receiver` into a fresh pair around `target` in place.
///
/// The in-place variant of [`pair`], for endpoints living in storage the
/// caller already owns. An endpoint still belonging to a previous pair is
/// first torn down through its usual drop protocol.
pub fn init_pair<'a, T>(
    sender: &mut Sender<'a, T>,
    receiver: &mut Receiver<'a, T>,
    target: &'a mut T,
    waker: Waker,
) {
    let (tx, rx) = pair(target, waker);
    *sender = tx;
    *receiver = rx;
}

/// Internal channel state shared by one pair of endpoints.
struct Channel<T> {
    state: Mutex<State<T>>,
}

struct State<T> {
    /// True from construction until the terminal event or an endpoint drop.
    linked: bool,
    /// Set when the sender is dropped while the pair still awaits a commit.
    cancelled: bool,
    /// The caller-owned buffer. Only sender operations dereference it, and
    /// only under the pair lock.
    target: NonNull<T>,
    /// Consumed (taken and fired) at the terminal event. An empty slot with
    /// `cancelled` unset is the completion signal the receiver polls for.
    waker: Waker,
}

/// Mutates the buffer observed by the paired [`Receiver`].
pub struct Sender<'a, T> {
    channel: Option<Arc<Channel<T>>>,
    _target: PhantomData<&'a mut T>,
}

// SAFETY: the target pointer is dereferenced only by sender operations and
// only under the pair lock, and the pair owns the sole live borrow of the
// target for its whole lifetime. Moving an endpoint to another thread moves
// that exclusive access with it, which is sound exactly when `T: Send`.
unsafe impl<T: Send> Send for Sender<'_, T> {}
unsafe impl<T: Send> Sync for Sender<'_, T> {}
unsafe impl<T: Send> Send for Receiver<'_, T> {}
unsafe impl<T: Send> Sync for Receiver<'_, T> {}

impl<T> Sender<'_, T> {
    /// Assigns `value` to the target, fires the pair's waker, and unlinks.
    ///
    /// A no-op after the terminal event or once the receiver is gone; the
    /// buffer is left untouched in that case and `value` is discarded.
    pub fn set(&mut self, value: T) {
        let Some(channel) = &self.channel else { return };
        let mut state = channel.state.lock();
        if state.linked {
            // SAFETY: the pair holds the only live borrow of the target and
            // this sender is the only endpoint that dereferences it.
            unsafe { *state.target.as_mut() = value };
            state.linked = false;
            state.waker.take().fire();
        }
    }

    /// Runs `f` on the target under the pair lock, without firing the waker
    /// or unlinking.
    ///
    /// Use this for modifications spread over several steps, then call
    /// [`commit`] once to wake the receiver. The receiver keeps reporting
    /// `Pending` in between, but the caller-side aliasing rules are the same
    /// as for [`set`]: the partial state is only ever observed by `f` itself
    /// or, after cancellation, by the caller.
    ///
    /// `f` must not call back into any endpoint of any pair: every endpoint
    /// operation acquires the pair lock that is already held while `f` runs,
    /// so re-entrancy deadlocks. It must also not stash the reference it is
    /// given, which the closure signature already rules out.
    ///
    /// [`commit`]: Sender::commit
    pub fn modify_unsafe<F>(&mut self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let Some(channel) = &self.channel else { return };
        let mut state = channel.state.lock();
        if state.linked {
            // SAFETY: as in `set`.
            f(unsafe { state.target.as_mut() });
        }
    }

    /// Fires the pair's waker and unlinks, completing the transfer.
    ///
    /// Call this after one or more [`modify_unsafe`] invocations. Exactly one
    /// wake is delivered no matter how many modifications preceded it; a
    /// second `commit` is a no-op.
    ///
    /// [`modify_unsafe`]: Sender::modify_unsafe
    pub fn commit(&mut self) {
        let Some(channel) = &self.channel else { return };
        let mut state = channel.state.lock();
        if state.linked {
            state.linked = false;
            state.waker.take().fire();
        }
    }
}

impl<T> Default for Sender<'_, T> {
    /// Creates a detached sender. Every operation on it is a no-op until it
    /// is linked with [`init_pair`].
    fn default() -> Self {
        Self {
            channel: None,
            _target: PhantomData,
        }
    }
}

impl<T> Drop for Sender<'_, T> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            let mut state = channel.state.lock();
            if state.linked {
                state.linked = false;
                // Only an unconsumed waker marks the pair cancelled: with an
                // empty slot the receiver already observes completion, and
                // that verdict must not change.
                if !state.waker.is_empty() {
                    state.cancelled = true;
                    state.waker.take().fire();
                }
            }
        }
    }
}

impl<T> fmt::Debug for Sender<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("detached", &self.channel.is_none())
            .finish()
    }
}

/// Observes the completion of the mutation performed by the paired
/// [`Sender`].
pub struct Receiver<'a, T> {
    channel: Option<Arc<Channel<T>>>,
    _target: PhantomData<&'a mut T>,
}

impl<T> Receiver<'_, T> {
    /// Polls for completion of the transfer.
    ///
    /// Returns `Ready(Ok(()))` once the sender has consumed the pair's waker
    /// with a `set` or `commit`, `Ready(Err(Cancelled))` if the sender was
    /// dropped first, and `Pending` otherwise. Unlike
    /// [`value::Receiver::poll`](crate::value::Receiver::poll), the ready
    /// results are sticky: there is no payload to move out, so polling again
    /// keeps reporting the same verdict.
    pub fn poll(&mut self) -> Poll<Result<(), Cancelled>> {
        let Some(channel) = &self.channel else {
            return Poll::Ready(Ok(()));
        };
        let state = channel.state.lock();
        if state.cancelled {
            Poll::Ready(Err(Cancelled(())))
        } else if state.waker.is_empty() {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }
}

impl<T> Default for Receiver<'_, T> {
    /// Creates a detached receiver. With no pending waker and no recorded
    /// cancellation it polls `Ready(Ok(()))` until it is linked with
    /// [`init_pair`].
    fn default() -> Self {
        Self {
            channel: None,
            _target: PhantomData,
        }
    }
}

impl<T> Drop for Receiver<'_, T> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            let mut state = channel.state.lock();
            // Subsequent sender operations become no-ops and leave the
            // buffer alone. The unfired waker goes down with the receiver.
            state.linked = false;
            let _ = state.waker.take();
        }
    }
}

impl<T> fmt::Debug for Receiver<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("detached", &self.channel.is_none())
            .finish()
    }
}
