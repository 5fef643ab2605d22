//! The reference notification handler.
//!
//! `loadwatch-alert` is launched by the dispatcher with the event id in
//! `TROUBLED_DS`. For the two built-in event kinds it drops a one-line alert
//! file into the alert directory.

use std::path::{Path, PathBuf};

use loadwatch_core::EventKind;

/// Default directory for alert files: the handler's `HOME`.
pub const DEFAULT_ALERT_DIR: &str = loadwatch_core::event::HANDLER_HOME;

/// Handler configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    /// Directory alert files are written to (`LOADWATCH_ALERT_DIR`, default `/`).
    pub alert_dir: PathBuf,
}

impl AlertConfig {
    pub fn from_env() -> Self {
        let alert_dir = std::env::var("LOADWATCH_ALERT_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ALERT_DIR.into());
        Self {
            alert_dir: PathBuf::from(alert_dir),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("No alert defined for event id {0}")]
    UnknownEvent(u32),

    #[error("Failed to write alert file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name and message for an event kind, if it has a built-in alert.
pub fn alert_for(kind: EventKind) -> Option<(&'static str, &'static str)> {
    match kind {
        EventKind::ProcessCount => Some(("proc_alert", "Number of processes is high!")),
        EventKind::MemoryUsage => Some(("mem_alert", "Memory usage is high!")),
        EventKind::Other(_) => None,
    }
}

/// Write the alert file for `kind` into `dir`, replacing any previous one.
pub fn write_alert(dir: &Path, kind: EventKind) -> Result<PathBuf, AlertError> {
    let (file_name, message) = alert_for(kind).ok_or(AlertError::UnknownEvent(kind.id()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, format!("{message}\n")).map_err(|source| AlertError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
