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

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

//! # Handoff - one-shot value hand-off primitives
//!
//! `handoff` delivers a single value, or a single in-place mutation of a
//! caller-owned buffer, from a producer to a consumer running under a
//! cooperative polling dispatcher. It is runtime-agnostic: the only
//! integration point with the surrounding executor is an opaque one-shot
//! [`Waker`] installed when a pair is created and fired exactly once when the
//! transfer completes or is cancelled.
//!
//! ## Features
//!
//! * [`value::pair`]: a one-shot by-value channel. The sender produces a `T`,
//!   the receiver polls for `Poll<Result<T, Cancelled>>`.
//! * [`by_ref::pair`]: a one-shot by-reference channel. The sender mutates a
//!   caller-owned buffer in place, the receiver polls for completion. Useful
//!   when the payload is large and should not be copied.
//! * [`waker::Waker`]: the one-shot wake handle connecting both channels to
//!   the dispatcher that polls the receiving task.
//!
//! Senders never suspend: [`value::Sender::send`], [`by_ref::Sender::set`]
//! and friends complete synchronously and may be called from any thread.
//! Polling the paired receiver is the only suspension point.
//!
//! ## Cancellation
//!
//! Dropping a sender before it completes the transfer cancels the pair and
//! fires the waker; the receiver then observes [`Cancelled`]. Dropping a
//! receiver silently abandons the transfer: every subsequent sender operation
//! becomes a no-op. There is no explicit cancel operation and no timeout;
//! compose with a dispatcher-provided timer if one is needed.
//!
//! ## Example
//!
//! ```
//! use std::task::Poll;
//!
//! use handoff::value;
//! use handoff::waker::Waker;
//!
//! let (mut tx, mut rx) = value::pair::<i32>(Waker::empty());
//! assert!(rx.poll().is_pending());
//!
//! tx.send(42);
//! assert_eq!(rx.poll(), Poll::Ready(Ok(42)));
//! ```
//!
//! [`Waker`]: waker::Waker

use std::fmt;

pub(crate) mod internal;

pub mod by_ref;
pub mod value;
pub mod waker;

#[cfg(test)]
pub(crate) mod tests_util;

/// The error observed by a receiver whose sender was dropped before
/// completing the transfer.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Cancelled(());

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "transfer cancelled before completion".fmt(f)
    }
}

impl std::error::Error for Cancelled {}

#[cfg(test)]
mod tests {
    use crate::Cancelled;
    use crate::by_ref;
    use crate::value;
    use crate::waker::Waker;

    #[test]
    fn assert_send_and_sync() {
        fn do_assert_send_and_sync<T: Send + Sync>() {}
        do_assert_send_and_sync::<Cancelled>();
        do_assert_send_and_sync::<Waker>();
        do_assert_send_and_sync::<value::Sender<i64>>();
        do_assert_send_and_sync::<value::Receiver<i64>>();
        do_assert_send_and_sync::<by_ref::Sender<'static, i64>>();
        do_assert_send_and_sync::<by_ref::Receiver<'static, i64>>();
    }

    #[test]
    fn assert_unpin() {
        fn do_assert_unpin<T: Unpin>() {}
        do_assert_unpin::<Cancelled>();
        do_assert_unpin::<Waker>();
        do_assert_unpin::<value::Sender<i64>>();
        do_assert_unpin::<value::Receiver<i64>>();
        do_assert_unpin::<by_ref::Sender<'static, i64>>();
        do_assert_unpin::<by_ref::Receiver<'static, i64>>();
    }

    #[test]
    fn assert_default_endpoints_detached() {
        let mut tx = value::Sender::<i64>::default();
        let mut rx = value::Receiver::<i64>::default();
        tx.send(1);
        assert!(rx.poll().is_ready());
    }
}
