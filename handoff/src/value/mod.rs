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

//! A one-shot by-value channel for handing a single value to a polled task.
//!
//! The [`pair`] function creates a linked [`Sender`] and [`Receiver`]. The
//! sender produces the value with [`send`] (or lazily with [`send_with`]);
//! the receiver's task polls for it with [`poll`], driven by the dispatcher
//! that owns the [`Waker`] the pair was created with.
//!
//! Since `send` is not async it can be used anywhere: from another task, from
//! a plain OS thread, or from non-async code. The waker fires exactly once,
//! when the value is delivered or when the sender is dropped without sending.
//!
//! # Examples
//!
//! ```
//! use std::task::Poll;
//!
//! use handoff::value;
//! use handoff::waker::Waker;
//!
//! let (mut tx, mut rx) = value::pair::<u32>(Waker::empty());
//! assert_eq!(rx.poll(), Poll::Pending);
//!
//! tx.send(3);
//! assert_eq!(rx.poll(), Poll::Ready(Ok(3)));
//! ```
//!
//! If the sender is dropped without sending, the receiver observes
//! [`Cancelled`]:
//!
//! ```
//! use std::task::Poll;
//!
//! use handoff::value;
//! use handoff::waker::Waker;
//!
//! let (tx, mut rx) = value::pair::<u32>(Waker::empty());
//! drop(tx);
//!
//! assert!(matches!(rx.poll(), Poll::Ready(Err(_))));
//! ```
//!
//! [`send`]: Sender::send
//! [`send_with`]: Sender::send_with
//! [`poll`]: Receiver::poll
//! [`Waker`]: crate::waker::Waker

use std::fmt;
use std::sync::Arc;
use std::task::Poll;

use crate::Cancelled;
use crate::internal::Mutex;
use crate::waker::Waker;


/// Creates a new linked pair of [`Sender`] and [`Receiver`].
///
/// `waker` is fired exactly once, when the sender delivers a value or is
/// dropped without delivering one.
pub fn pair<T>(waker: Waker) -> (Sender<T>, Receiver<T>) {
    let channel = Arc::new(Channel {
        state: Mutex::new(State {
            linked: true,
            value: None,
            waker,
        }),
    });
    (
        Sender {
            channel: Some(channel.clone()),
        },
        Receiver {
            channel: Some(channel),
        },
    )
}

/// Links `sender` and `receiver` into a fresh pair in place.
///
/// This is the in-place variant of [`pair`] for endpoints living in storage
/// the caller already owns, e.g. default-constructed fields of a long-lived
/// struct. If either endpoint still belongs to a previous pair, that pair is
/// first torn down through the endpoint's usual drop protocol: a previously
/// linked sender cancels its old peer, a previously linked receiver abandons
/// its old transfer.
pub fn init_pair<T>(sender: &mut Sender<T>, receiver: &mut Receiver<T>, waker: Waker) {
    let (tx, rx) = pair(waker);
    *sender = tx;
    *receiver = rx;
}

/// Internal channel state shared by one pair of endpoints.
///
/// Both halves hold an `Arc` to this cell; the last endpoint dropped frees
/// it. All fields are read and written under the pair lock.
struct Channel<T> {
    state: Mutex<State<T>>,
}

struct State<T> {
    /// True from construction until the terminal event or an endpoint drop.
    linked: bool,
    /// The delivered value, present between `send` and the `poll` that takes
    /// it out.
    value: Option<T>,
    /// Consumed (taken and fired) at the terminal event.
    waker: Waker,
}

/// Sends a single value to the paired [`Receiver`].
pub struct Sender<T> {
    channel: Option<Arc<Channel<T>>>,
}

impl<T> Sender<T> {
    /// Delivers `value` to the paired receiver and fires the pair's waker.
    ///
    /// Delivery is at-most-once: after the first terminal event, or if the
    /// receiver has been dropped, this is a no-op and `value` is discarded.
    /// Losing the value that way is not an error, so there is nothing to
    /// return.
    pub fn send(&mut self, value: T) {
        self.send_with(move || value);
    }

    /// Like [`send`], but constructs the value only if the pair is still
    /// linked.
    ///
    /// Use this when producing the value is expensive and the receiver may
    /// already be gone. `f` runs under the pair lock and must not call back
    /// into any endpoint of any pair.
    ///
    /// [`send`]: Sender::send
    pub fn send_with<F>(&mut self, f: F)
    where
        F: FnOnce() -> T,
    {
        let Some(channel) = &self.channel else { return };
        let mut state = channel.state.lock();
        if state.linked {
            state.value = Some(f());
            state.linked = false;
            state.waker.take().fire();
        }
    }
}

impl<T> Default for Sender<T> {
    /// Creates a detached sender. Every operation on it is a no-op until it
    /// is linked with [`init_pair`].
    fn default() -> Self {
        Self { channel: None }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            let mut state = channel.state.lock();
            if state.linked {
                state.linked = false;
                state.waker.take().fire();
            }
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("detached", &self.channel.is_none())
            .finish()
    }
}

/// Receives the value sent by the paired [`Sender`].
pub struct Receiver<T> {
    channel: Option<Arc<Channel<T>>>,
}

impl<T> Receiver<T> {
    /// Polls for the transferred value.
    ///
    /// Returns `Ready(Ok(value))` once the sender has delivered,
    /// `Ready(Err(Cancelled))` if the sender was dropped without delivering,
    /// and `Pending` otherwise. Intended to be called by the dispatcher each
    /// time the receiving task is scheduled; `Pending` is only ever followed
    /// by one wake of the pair's waker.
    ///
    /// The value is moved out by the poll that returns it. Polling again
    /// afterwards observes an empty slot with the link already down and
    /// therefore reports `Ready(Err(Cancelled))`.
    pub fn poll(&mut self) -> Poll<Result<T, Cancelled>> {
        let Some(channel) = &self.channel else {
            return Poll::Ready(Err(Cancelled(())));
        };
        let mut state = channel.state.lock();
        if let Some(value) = state.value.take() {
            Poll::Ready(Ok(value))
        } else if state.linked {
            Poll::Pending
        } else {
            Poll::Ready(Err(Cancelled(())))
        }
    }
}

impl<T> Default for Receiver<T> {
    /// Creates a detached receiver. It polls `Ready(Err(Cancelled))` until it
    /// is linked with [`init_pair`].
    fn default() -> Self {
        Self { channel: None }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            let mut state = channel.state.lock();
            // Subsequent sender operations become no-ops. The sender is not
            // notified; an undelivered value and the unfired waker go down
            // with the receiver.
            state.linked = false;
            state.value = None;
            let _ = state.waker.take();
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("detached", &self.channel.is_none())
            .finish()
    }
}
