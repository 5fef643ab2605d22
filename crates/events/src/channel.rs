//! Shared event slot plus wake condition.
//!
//! [`EventChannel`] is the hand-off point between a detector and the
//! monitor worker. The detector stores a non-zero event id under the write
//! lock and then signals; the worker waits for the signal and takes the id.
//!
//! The wake side is a [`tokio::sync::Notify`]: a signal sent while nobody
//! is waiting is kept as a single permit, so a raise that races ahead of the
//! worker's next wait is never lost. Several raises before the worker runs
//! collapse into one wake and the last id written wins.

use std::num::NonZeroU32;
use std::sync::{PoisonError, RwLock};

use loadwatch_core::EventKind;
use tokio::sync::Notify;

/// Lock-guarded event id (`0` = none) and the wake condition paired with it.
#[derive(Debug, Default)]
pub struct EventChannel {
    event_id: RwLock<u32>,
    wake: Notify,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector side: publish `event_id` and wake the worker.
    ///
    /// The id is written under the write lock and the lock is released
    /// before signalling. Raising `0` only wakes the worker, which then
    /// finds nothing to do.
    pub fn raise(&self, event_id: u32) {
        {
            let mut slot = self.event_id.write().unwrap_or_else(PoisonError::into_inner);
            *slot = event_id;
        }
        match EventKind::from_id(event_id) {
            Some(kind) => tracing::debug!(event_id, %kind, "Event raised"),
            None => tracing::debug!("Wake raised without an event id"),
        }
        self.wake.notify_one();
    }

    /// Signal the wake condition without touching the event slot.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Wait until the wake condition is signalled.
    ///
    /// Cancel safe: dropping the future before it completes does not
    /// consume a pending signal.
    pub async fn wait(&self) {
        self.wake.notified().await;
    }

    /// Worker side: take the current event id, leaving `0` behind.
    ///
    /// Returns `None` when no event is pending (a spurious wake).
    pub fn take(&self) -> Option<NonZeroU32> {
        let mut slot = self.event_id.write().unwrap_or_else(PoisonError::into_inner);
        NonZeroU32::new(std::mem::take(&mut *slot))
    }

    /// Current event id without clearing it.
    pub fn pending(&self) -> u32 {
        *self.event_id.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
