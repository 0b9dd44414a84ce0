use crate::types::{Eye, GazeSample, Snapshot};
use std::sync::{Mutex, MutexGuard};

/// Latest known gaze state, written by the SDK callback thread and read by
/// the poll thread.
///
/// A single mutex covers every field so a reader never observes a mix of
/// two producer invocations. The lock is held only to copy values in or
/// out. Newer publishes overwrite older ones; there is no history.
#[derive(Debug, Default)]
pub struct SharedGazeState {
    inner: Mutex<Snapshot>,
}

impl SharedGazeState {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded value is plain `Copy` data and every write replaces whole
    // fields, so a poisoned lock still holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Overwrite one eye's slot and the shared blink flag.
    pub fn publish(&self, eye: Eye, sample: GazeSample, blinking: bool) {
        let mut state = self.lock();
        match eye {
            Eye::Left => state.left = sample,
            Eye::Right => state.right = sample,
        }
        state.blinking = blinking;
    }

    /// Apply one callback invocation atomically. `None` leaves that eye's
    /// previously published sample in place.
    pub fn publish_frame(&self, left: Option<GazeSample>, right: Option<GazeSample>, blinking: bool) {
        let mut state = self.lock();
        if let Some(left) = left {
            state.left = left;
        }
        if let Some(right) = right {
            state.right = right;
        }
        state.blinking = blinking;
    }

    /// Copy of both eyes and the blink flag as of a single instant.
    pub fn snapshot(&self) -> Snapshot {
        *self.lock()
    }
}
