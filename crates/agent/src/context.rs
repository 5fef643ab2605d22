//! State shared between the worker, the dispatcher and the settings
//! endpoints.

use std::sync::Arc;

use loadwatch_core::ThresholdConfig;
use loadwatch_events::EventChannel;

/// Explicit replacement for process-wide globals: built once per monitor
/// and cloned into every component that needs it.
#[derive(Debug, Clone, Default)]
pub struct MonitorContext {
    pub config: Arc<ThresholdConfig>,
    pub channel: Arc<EventChannel>,
}

impl MonitorContext {
    /// Fresh context with zeroed thresholds, no handler and no event.
    pub fn new() -> Self {
        Self::default()
    }
}
