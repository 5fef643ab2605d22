//! Event identifiers and the handler environment contract.
//!
//! Detectors raise a non-zero event id; the dispatcher forwards it to the
//! external handler in the [`ENV_EVENT_ID`] environment variable. Handlers
//! decode it back with [`parse_event_id`] and branch on [`EventKind`].

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

/// Environment variable carrying the decimal event id to the handler.
pub const ENV_EVENT_ID: &str = "TROUBLED_DS";

/// `HOME` seen by the handler.
pub const HANDLER_HOME: &str = "/";

/// Fixed `PATH` seen by the handler.
pub const HANDLER_PATH: &str = "/sbin:/usr/sbin:/bin:/usr/bin";

/// Event id raised when the process count limit is exceeded.
pub const EVENT_PROC_LIMIT: u32 = 1;

/// Event id raised when the memory usage limit is exceeded.
pub const EVENT_MEM_LIMIT: u32 = 2;

/// Which threshold condition an event id stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Too many processes.
    ProcessCount,
    /// Memory usage above the configured percentage.
    MemoryUsage,
    /// Any other detector-defined id.
    Other(u32),
}

impl EventKind {
    /// Classify a raw event id. `0` means "no event" and yields `None`.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => None,
            EVENT_PROC_LIMIT => Some(Self::ProcessCount),
            EVENT_MEM_LIMIT => Some(Self::MemoryUsage),
            other => Some(Self::Other(other)),
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Self::ProcessCount => EVENT_PROC_LIMIT,
            Self::MemoryUsage => EVENT_MEM_LIMIT,
            Self::Other(id) => id,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessCount => f.write_str("process_count"),
            Self::MemoryUsage => f.write_str("memory_usage"),
            Self::Other(id) => write!(f, "other({id})"),
        }
    }
}

/// Decode the value of [`ENV_EVENT_ID`] as received by a handler.
///
/// The whole (trimmed) value must be a non-zero decimal number.
pub fn parse_event_id(raw: &str) -> Result<EventKind, CoreError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .and_then(EventKind::from_id)
        .ok_or_else(|| CoreError::InvalidEventId(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn zero_is_not_an_event() {
        assert_eq!(EventKind::from_id(0), None);
    }

    #[test]
    fn known_ids_map_to_kinds() {
        assert_eq!(EventKind::from_id(1), Some(EventKind::ProcessCount));
        assert_eq!(EventKind::from_id(2), Some(EventKind::MemoryUsage));
        assert_eq!(EventKind::from_id(9), Some(EventKind::Other(9)));
        assert_eq!(EventKind::Other(9).id(), 9);
        assert_eq!(EventKind::MemoryUsage.id(), EVENT_MEM_LIMIT);
    }

    #[test]
    fn parse_event_id_reads_the_value() {
        assert_eq!(parse_event_id("1"), Ok(EventKind::ProcessCount));
        assert_eq!(parse_event_id(" 2\n"), Ok(EventKind::MemoryUsage));
    }

    #[test]
    fn parse_event_id_rejects_garbage() {
        assert_matches!(parse_event_id(""), Err(CoreError::InvalidEventId(_)));
        assert_matches!(parse_event_id("0"), Err(CoreError::InvalidEventId(_)));
        assert_matches!(parse_event_id("1x"), Err(CoreError::InvalidEventId(_)));
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(EventKind::ProcessCount.to_string(), "process_count");
        assert_eq!(EventKind::Other(7).to_string(), "other(7)");
    }
}
