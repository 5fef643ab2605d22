//! `loadwatch-agent` library crate.
//!
//! The threshold monitor: setting endpoints, the event worker and the
//! handler dispatcher. The daemon entrypoint lives in `main.rs`; the
//! reference handler in `bin/alert.rs`.

pub mod alert;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod lifecycle;
pub mod settings;
pub mod stats;
pub mod worker;

pub use context::MonitorContext;
pub use dispatcher::{DispatchOutcome, Launcher, NotificationDispatcher, ProcessLauncher};
pub use lifecycle::{Monitor, MonitorError};
pub use settings::{RegistryError, Setting, SettingsRegistry, SettingsTable};
pub use stats::{MonitorStats, WorkerState};
