//! Worker state and dispatch counters.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dispatcher::DispatchOutcome;

/// Lifecycle state of the event worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum WorkerState {
    /// Blocked on the wake condition.
    Waiting = 0,
    /// Launching the handler for a taken event.
    Dispatching = 1,
    /// Exited; no further dispatches.
    Terminated = 2,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Waiting,
            1 => Self::Dispatching,
            _ => Self::Terminated,
        }
    }
}

/// Shared, lock-free view of what the worker is doing and has done.
#[derive(Debug)]
pub struct WorkerStatus {
    state: AtomicU8,
    dispatched: AtomicU64,
    skipped: AtomicU64,
    launch_failures: AtomicU64,
    spurious_wakes: AtomicU64,
    last_event_id: AtomicU32,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Waiting as u8),
            dispatched: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            launch_failures: AtomicU64::new(0),
            spurious_wakes: AtomicU64::new(0),
            last_event_id: AtomicU32::new(0),
        }
    }
}

impl WorkerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn record_spurious_wake(&self) {
        self.spurious_wakes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self, event_id: NonZeroU32, outcome: DispatchOutcome) {
        self.last_event_id.store(event_id.get(), Ordering::Relaxed);
        let counter = match outcome {
            DispatchOutcome::Launched { .. } => &self.dispatched,
            DispatchOutcome::Skipped => &self.skipped,
            DispatchOutcome::Failed => &self.launch_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn launch_failures(&self) -> u64 {
        self.launch_failures.load(Ordering::Relaxed)
    }

    pub fn spurious_wakes(&self) -> u64 {
        self.spurious_wakes.load(Ordering::Relaxed)
    }

    /// Events taken by the worker, whatever the dispatch outcome.
    pub fn events_handled(&self) -> u64 {
        self.dispatched() + self.skipped() + self.launch_failures()
    }

    pub fn snapshot(&self, started_at: DateTime<Utc>) -> MonitorStats {
        MonitorStats {
            started_at,
            state: self.state(),
            dispatched: self.dispatched(),
            skipped: self.skipped(),
            launch_failures: self.launch_failures(),
            spurious_wakes: self.spurious_wakes(),
            last_event_id: NonZeroU32::new(self.last_event_id.load(Ordering::Relaxed))
                .map(NonZeroU32::get),
        }
    }
}

/// Serializable summary of a monitor's activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub started_at: DateTime<Utc>,
    pub state: WorkerState,
    /// Handler processes started.
    pub dispatched: u64,
    /// Events dropped because no handler was configured.
    pub skipped: u64,
    pub launch_failures: u64,
    pub spurious_wakes: u64,
    pub last_event_id: Option<u32>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero id")
    }

    #[test]
    fn starts_waiting_with_zero_counters() {
        let status = WorkerStatus::new();
        assert_eq!(status.state(), WorkerState::Waiting);
        assert_eq!(status.events_handled(), 0);
        assert_eq!(status.spurious_wakes(), 0);
    }

    #[test]
    fn outcomes_land_in_their_own_counters() {
        let status = WorkerStatus::new();
        status.record_dispatch(id(1), DispatchOutcome::Launched { pid: None });
        status.record_dispatch(id(2), DispatchOutcome::Skipped);
        status.record_dispatch(id(2), DispatchOutcome::Failed);
        status.record_spurious_wake();

        assert_eq!(status.dispatched(), 1);
        assert_eq!(status.skipped(), 1);
        assert_eq!(status.launch_failures(), 1);
        assert_eq!(status.spurious_wakes(), 1);
        assert_eq!(status.events_handled(), 3);
    }

    #[test]
    fn snapshot_serializes() {
        let status = WorkerStatus::new();
        status.record_dispatch(id(2), DispatchOutcome::Launched { pid: Some(10) });
        status.set_state(WorkerState::Terminated);

        let stats = status.snapshot(Utc::now());
        assert_eq!(stats.last_event_id, Some(2));

        let json = serde_json::to_value(&stats).expect("stats serialize");
        assert_eq!(json["state"], "terminated");
        assert_eq!(json["dispatched"], 1);
        assert!(json["started_at"].is_string());
    }

    #[test]
    fn no_event_yet_serializes_as_null() {
        let stats = WorkerStatus::new().snapshot(Utc::now());
        let json = serde_json::to_value(&stats).expect("stats serialize");
        assert!(json["last_event_id"].is_null());
    }
}
