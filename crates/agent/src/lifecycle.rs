//! Monitor start/stop.
//!
//! [`Monitor::start`] publishes the three threshold endpoints on a
//! [`SettingsRegistry`] and spawns the [`EventWorker`]. [`Monitor::stop`]
//! cancels the worker, waits for it to exit and withdraws the endpoints.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loadwatch_core::ThresholdConfig;
use loadwatch_events::EventChannel;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::context::MonitorContext;
use crate::dispatcher::{Launcher, NotificationDispatcher, ProcessLauncher};
use crate::settings::{RegistryError, SettingsRegistry, ThresholdField, ThresholdSetting};
use crate::stats::{MonitorStats, WorkerState, WorkerStatus};
use crate::worker::EventWorker;

/// Errors from starting or stopping a [`Monitor`].
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to register settings: {0}")]
    Registration(#[source] RegistryError),

    #[error("Failed to unregister {} setting(s)", .0.len())]
    Unregistration(Vec<RegistryError>),

    #[error("Event worker panicked: {0}")]
    WorkerPanicked(String),
}

/// A running monitor: registered endpoints plus the event worker.
///
/// Dropping a `Monitor` without calling [`stop`](Monitor::stop) still
/// cancels the worker, but leaves the endpoints registered.
pub struct Monitor {
    context: MonitorContext,
    registry: Arc<dyn SettingsRegistry>,
    registered: Vec<&'static str>,
    cancel: DropGuard,
    worker: JoinHandle<()>,
    status: Arc<WorkerStatus>,
    started_at: DateTime<Utc>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("registered", &self.registered)
            .field("state", &self.status.state())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Start a monitor that launches handlers as real processes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(registry: Arc<dyn SettingsRegistry>) -> Result<Self, MonitorError> {
        Self::start_with_launcher(registry, Arc::new(ProcessLauncher))
    }

    /// Start a monitor with a custom [`Launcher`].
    ///
    /// Thresholds start at 0 and the handler empty. If any endpoint fails to
    /// register, the ones already registered are withdrawn again and no
    /// worker is spawned.
    pub fn start_with_launcher(
        registry: Arc<dyn SettingsRegistry>,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self, MonitorError> {
        let context = MonitorContext::new();
        let registered = register_endpoints(registry.as_ref(), &context.config)?;

        let status = Arc::new(WorkerStatus::new());
        let cancel = CancellationToken::new();
        let worker = EventWorker::new(
            context.clone(),
            NotificationDispatcher::new(launcher),
            Arc::clone(&status),
            cancel.clone(),
        );
        let worker = tokio::spawn(worker.run());

        tracing::info!(settings = ?registered, "Monitor started");

        Ok(Self {
            context,
            registry,
            registered,
            cancel: cancel.drop_guard(),
            worker,
            status,
            started_at: Utc::now(),
        })
    }

    pub fn context(&self) -> &MonitorContext {
        &self.context
    }

    /// The channel a detector raises events on.
    pub fn channel(&self) -> &Arc<EventChannel> {
        &self.context.channel
    }

    pub fn config(&self) -> &Arc<ThresholdConfig> {
        &self.context.config
    }

    pub fn worker_state(&self) -> WorkerState {
        self.status.state()
    }

    pub fn stats(&self) -> MonitorStats {
        self.status.snapshot(self.started_at)
    }

    /// Drive `session` to completion, then [`stop`](Monitor::stop) the
    /// monitor whatever the session returned.
    ///
    /// A session error takes precedence over a stop error; the monitor is
    /// stopped either way.
    pub async fn run_session<E>(
        self,
        session: impl Future<Output = Result<(), E>>,
    ) -> Result<MonitorStats, E>
    where
        E: From<MonitorError>,
    {
        let outcome = session.await;
        let stopped = self.stop().await;
        outcome?;
        stopped.map_err(E::from)
    }

    /// Stop the worker and withdraw every endpoint.
    ///
    /// Waits for the worker to reach `Terminated`. All endpoints are
    /// unregistered even if some fail; the failures are returned together.
    pub async fn stop(self) -> Result<MonitorStats, MonitorError> {
        let Self {
            registry,
            registered,
            cancel,
            worker,
            status,
            started_at,
            ..
        } = self;

        cancel.disarm().cancel();
        let joined = worker.await;

        let mut failures = Vec::new();
        for name in registered.iter().rev() {
            if let Err(e) = registry.unregister(name) {
                tracing::error!(setting = name, error = %e, "Failed to unregister setting");
                failures.push(e);
            }
        }

        let stats = status.snapshot(started_at);
        tracing::info!(
            dispatched = stats.dispatched,
            skipped = stats.skipped,
            launch_failures = stats.launch_failures,
            "Monitor stopped"
        );

        if let Err(e) = joined {
            return Err(MonitorError::WorkerPanicked(e.to_string()));
        }
        if !failures.is_empty() {
            return Err(MonitorError::Unregistration(failures));
        }
        Ok(stats)
    }
}

/// Register one endpoint per [`ThresholdField`], rolling back on failure.
fn register_endpoints(
    registry: &dyn SettingsRegistry,
    config: &Arc<ThresholdConfig>,
) -> Result<Vec<&'static str>, MonitorError> {
    let mut registered: Vec<&'static str> = Vec::with_capacity(ThresholdField::ALL.len());

    for field in ThresholdField::ALL {
        let setting = Arc::new(ThresholdSetting::new(Arc::clone(config), field));
        if let Err(e) = registry.register(field.name(), setting) {
            tracing::warn!(
                setting = field.name(),
                error = %e,
                rolled_back = registered.len(),
                "Setting registration failed, rolling back"
            );
            for name in registered.iter().rev() {
                if let Err(undo) = registry.unregister(name) {
                    tracing::error!(setting = name, error = %undo, "Rollback failed to unregister setting");
                }
            }
            return Err(MonitorError::Registration(e));
        }
        registered.push(field.name());
    }

    Ok(registered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
