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

//! Shared test scaffolding: an instrumented waker that counts every vtable
//! call, a drop-tracking payload, and a park-based mini dispatcher.

use std::mem;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::task;
use std::task::RawWaker;
use std::task::RawWakerVTable;
use std::task::Wake;
use std::thread::Thread;

use crate::waker::Waker;

#[derive(Default)]
pub(crate) struct WakerHandle {
    clone_count: AtomicU32,
    drop_count: AtomicU32,
    wake_count: AtomicU32,
}

impl WakerHandle {
    pub(crate) fn clone_count(&self) -> u32 {
        self.clone_count.load(Ordering::Relaxed)
    }

    pub(crate) fn drop_count(&self) -> u32 {
        self.drop_count.load(Ordering::Relaxed)
    }

    pub(crate) fn wake_count(&self) -> u32 {
        self.wake_count.load(Ordering::Relaxed)
    }
}

/// Returns a channel waker whose underlying task waker reports every clone,
/// wake, and drop through the paired handle.
pub(crate) fn counting_waker() -> (Waker, Arc<WakerHandle>) {
    let waker_handle = Arc::new(WakerHandle::default());
    let waker_handle_ptr = Arc::into_raw(waker_handle.clone());
    let raw_waker = RawWaker::new(waker_handle_ptr as *const _, waker_vtable());
    let task_waker = unsafe { task::Waker::from_raw(raw_waker) };
    (Waker::from(task_waker), waker_handle)
}

fn waker_vtable() -> &'static RawWakerVTable {
    &RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw)
}

unsafe fn clone_raw(data: *const ()) -> RawWaker {
    unsafe {
        let handle: Arc<WakerHandle> = Arc::from_raw(data as *const _);
        handle.clone_count.fetch_add(1, Ordering::Relaxed);
        mem::forget(handle.clone());
        mem::forget(handle);
        RawWaker::new(data, waker_vtable())
    }
}

unsafe fn wake_raw(data: *const ()) {
    unsafe {
        let handle: Arc<WakerHandle> = Arc::from_raw(data as *const _);
        handle.wake_count.fetch_add(1, Ordering::Relaxed);
        handle.drop_count.fetch_add(1, Ordering::Relaxed);
    }
}

unsafe fn wake_by_ref_raw(data: *const ()) {
    unsafe {
        let handle: Arc<WakerHandle> = Arc::from_raw(data as *const _);
        handle.wake_count.fetch_add(1, Ordering::Relaxed);
        mem::forget(handle)
    }
}

unsafe fn drop_raw(data: *const ()) {
    unsafe {
        let handle: Arc<WakerHandle> = Arc::from_raw(data as *const _);
        handle.drop_count.fetch_add(1, Ordering::Relaxed);
        drop(handle)
    }
}

pub(crate) struct DropCounterHandle(Arc<AtomicUsize>);

impl DropCounterHandle {
    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) struct DropCounter<T> {
    drop_count: Arc<AtomicUsize>,
    value: Option<T>,
}

impl<T> DropCounter<T> {
    pub(crate) fn new(value: T) -> (Self, DropCounterHandle) {
        let drop_count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                drop_count: drop_count.clone(),
                value: Some(value),
            },
            DropCounterHandle(drop_count),
        )
    }

    pub(crate) fn value(&self) -> &T {
        self.value.as_ref().unwrap()
    }
}

impl<T> Drop for DropCounter<T> {
    fn drop(&mut self) {
        self.drop_count.fetch_add(1, Ordering::SeqCst);
    }
}

struct Unparker(Thread);

impl Wake for Unparker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Returns a waker that unparks the calling thread, turning `thread::park`
/// into a minimal single-task dispatcher.
pub(crate) fn unpark_waker() -> Waker {
    let unparker = Arc::new(Unparker(std::thread::current()));
    Waker::from(task::Waker::from(unparker))
}
