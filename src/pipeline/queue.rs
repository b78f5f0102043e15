//! Bounded drop-oldest queue feeding captured frames to the worker pool.
//! Backpressure policy: when full, the oldest pending frame is evicted to
//! make room for the newest capture, and the eviction is reported so the
//! delivery stage can skip past the missing sequence number instead of
//! stalling on it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::capture::RawFrame;

pub(crate) struct FrameQueue {
    inner: Mutex<VecDeque<RawFrame>>,
    cond: Condvar,
    capacity: usize,
    dropped_total: AtomicU64,
}

impl FrameQueue {
    pub(crate) fn new(capacity: usize) -> FrameQueue {
        FrameQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            cond: Condvar::new(),
            capacity: capacity.max(1),
            dropped_total: AtomicU64::new(0),
        }
    }

    /// Pushes a frame, evicting and returning the oldest pending frame if
    /// the queue was already at capacity.
    pub(crate) fn push(&self, frame: RawFrame) -> Option<RawFrame> {
        let mut queue = self.inner.lock().unwrap();
        let evicted = if queue.len() >= self.capacity {
            self.dropped_total.fetch_add(1, Ordering::Relaxed);
            queue.pop_front()
        } else {
            None
        };
        queue.push_back(frame);
        self.cond.notify_one();
        evicted
    }

    /// Blocks until a frame is available or `stop` is set, polling `stop`
    /// periodically so shutdown doesn't have to wake every worker with a
    /// dedicated signal.
    pub(crate) fn pop_blocking(&self, stop: &AtomicBool) -> Option<RawFrame> {
        let mut queue = self.inner.lock().unwrap();
        loop {
            if let Some(frame) = queue.pop_front() {
                return Some(frame);
            }
            if stop.load(Ordering::Relaxed) {
                return None;
            }
            let (guard, _timeout) = self
                .cond
                .wait_timeout(queue, Duration::from_millis(25))
                .unwrap();
            queue = guard;
        }
    }

    pub(crate) fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    pub(crate) fn wake_all(&self) {
        self.cond.notify_all();
    }
}
