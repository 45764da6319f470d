//! One-slot frame buffer between the acquisition thread and the UI.
//!
//! The producer never waits: publishing replaces whatever frame is still
//! waiting and counts it as dropped. The consumer never waits either:
//! `take` returns `None` when nothing new has arrived.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::frame::Frame;

#[derive(Debug, Default)]
pub struct FrameSlot {
    slot: Mutex<Option<Frame>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        // A panicking producer cannot leave a half-written Option behind
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `frame`, evicting any unconsumed one. Returns true if a frame was evicted.
    pub fn publish(&self, frame: Frame) -> bool {
        let evicted = self.lock().replace(frame).is_some();
        self.published.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Removes and returns the waiting frame, if any.
    pub fn take(&self) -> Option<Frame> {
        self.lock().take()
    }

    /// Discards the waiting frame without counting it as dropped.
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Frames published since creation or the last reset.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames overwritten before the consumer got to them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
    }
}
