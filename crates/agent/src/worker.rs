//! The event wait/dispatch loop.
//!
//! [`EventWorker::run`] blocks on the [`EventChannel`](loadwatch_events::EventChannel)
//! wake condition. On every wake it first checks for cancellation, then takes
//! the pending event id. A zero id is a spurious wake and sends the worker
//! straight back to waiting; otherwise the handler is dispatched with the
//! channel lock already released.
//!
//! ```text
//! Waiting --wake, id != 0--> Dispatching --dispatch returns--> Waiting
//! Waiting --wake, id == 0--> Waiting
//! Waiting --cancel---------> Terminated
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::context::MonitorContext;
use crate::dispatcher::NotificationDispatcher;
use crate::stats::{WorkerState, WorkerStatus};

/// The single long-lived consumer of an event channel.
#[derive(Debug)]
pub struct EventWorker {
    context: MonitorContext,
    dispatcher: NotificationDispatcher,
    status: Arc<WorkerStatus>,
    cancel: CancellationToken,
}

impl EventWorker {
    pub fn new(
        context: MonitorContext,
        dispatcher: NotificationDispatcher,
        status: Arc<WorkerStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            context,
            dispatcher,
            status,
            cancel,
        }
    }

    /// Run until `cancel` is triggered.
    ///
    /// Dispatch failures never end the loop. Cancellation wakes a blocked
    /// worker immediately; an event taken before cancellation was observed
    /// is still dispatched.
    pub async fn run(self) {
        tracing::info!("Event worker started");

        loop {
            self.status.set_state(WorkerState::Waiting);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.context.channel.wait() => {}
            }

            if self.cancel.is_cancelled() {
                break;
            }

            let Some(event_id) = self.context.channel.take() else {
                tracing::debug!("Spurious wake, no event pending");
                self.status.record_spurious_wake();
                continue;
            };

            self.status.set_state(WorkerState::Dispatching);
            let handler_name = self.context.config.handler_name();
            let outcome = self.dispatcher.dispatch(event_id, &handler_name);
            self.status.record_dispatch(event_id, outcome);
        }

        self.status.set_state(WorkerState::Terminated);
        tracing::info!(
            dispatched = self.status.dispatched(),
            launch_failures = self.status.launch_failures(),
            "Event worker stopped"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
