//! Bounded history buffers for the sampler and its readers.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// Fixed-capacity FIFO ring. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct TimeSeries<T> {
    items: VecDeque<T>,
    cap: usize,
}

impl<T: Clone> TimeSeries<T> {
    /// A capacity of zero is treated as one.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            items: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, v: T) {
        push_capped(&mut self.items, v, self.cap);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Copy of the most recent `k` entries, oldest first.
    pub fn recent(&self, k: usize) -> Vec<T> {
        let start = self.items.len().saturating_sub(k);
        self.items.iter().skip(start).cloned().collect()
    }
}

/// A [`TimeSeries`] shared between one writer and any number of readers.
///
/// Appends and snapshots hold the same lock, so a reader never sees a half-written entry;
/// readers get owned copies and never block the writer for longer than a clone.
#[derive(Debug)]
pub struct SharedSeries<T> {
    inner: Mutex<TimeSeries<T>>,
}

impl<T: Clone> SharedSeries<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(TimeSeries::new(cap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimeSeries<T>> {
        // A panic mid-push cannot leave the deque torn, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, v: T) {
        self.lock().push(v);
    }

    pub fn snapshot(&self, k: usize) -> Vec<T> {
        self.lock().recent(k)
    }

    pub fn snapshot_all(&self) -> Vec<T> {
        let g = self.lock();
        g.recent(g.len())
    }

    pub fn latest(&self) -> Option<T> {
        self.lock().latest().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}
