//! Runtime-tunable monitor thresholds.
//!
//! [`ThresholdConfig`] holds the two numeric limits and the name of the
//! external handler. It is shared (`Arc<ThresholdConfig>`) between the
//! settings endpoints and the dispatch path. Each field is synchronized on
//! its own; readers never see a torn value but there is no cross-field
//! snapshot guarantee.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::parse::parse_leading_decimal;

/// Maximum stored length of the handler name, in bytes.
pub const HANDLER_NAME_MAX_BYTES: usize = 255;

/// Thresholds and handler identifier consulted by the monitor.
///
/// All values start at zero / empty. An empty handler name disables
/// dispatching.
#[derive(Debug, Default)]
pub struct ThresholdConfig {
    max_proc: AtomicU32,
    max_mem_percent: AtomicU32,
    handler_name: RwLock<String>,
}

/// Point-in-time copy of a [`ThresholdConfig`], for logging and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdSnapshot {
    pub max_proc: u32,
    pub max_mem_percent: u32,
    pub handler_name: String,
}

impl ThresholdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_max_proc(&self) -> u32 {
        self.max_proc.load(Ordering::Acquire)
    }

    /// Store the leading decimal value of `text`; no digits stores `0`.
    ///
    /// Returns `false` when `text` had no leading digits.
    pub fn write_max_proc(&self, text: impl AsRef<[u8]>) -> bool {
        let value = parse_leading_decimal(text.as_ref()).ok();
        self.set_max_proc(value.unwrap_or(0));
        value.is_some()
    }

    pub fn set_max_proc(&self, value: u32) {
        self.max_proc.store(value, Ordering::Release);
    }

    pub fn read_max_mem_percent(&self) -> u32 {
        self.max_mem_percent.load(Ordering::Acquire)
    }

    /// Same rules as [`write_max_proc`](Self::write_max_proc).
    pub fn write_max_mem_percent(&self, text: impl AsRef<[u8]>) -> bool {
        let value = parse_leading_decimal(text.as_ref()).ok();
        self.set_max_mem_percent(value.unwrap_or(0));
        value.is_some()
    }

    pub fn set_max_mem_percent(&self, value: u32) {
        self.max_mem_percent.store(value, Ordering::Release);
    }

    /// Current handler name. Empty means dispatching is disabled.
    pub fn handler_name(&self) -> String {
        self.handler_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the handler name, truncated to [`HANDLER_NAME_MAX_BYTES`].
    ///
    /// Returns `true` if the value had to be truncated.
    pub fn set_handler_name(&self, name: &str) -> bool {
        let clamped = clamp_to_bytes(name, HANDLER_NAME_MAX_BYTES);
        let truncated = clamped.len() < name.len();

        let mut guard = self
            .handler_name
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clear();
        guard.push_str(clamped);
        truncated
    }

    pub fn snapshot(&self) -> ThresholdSnapshot {
        ThresholdSnapshot {
            max_proc: self.read_max_proc(),
            max_mem_percent: self.read_max_mem_percent(),
            handler_name: self.handler_name(),
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// UTF-8 sequence.
pub fn clamp_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero_and_empty() {
        let cfg = ThresholdConfig::new();
        assert_eq!(cfg.read_max_proc(), 0);
        assert_eq!(cfg.read_max_mem_percent(), 0);
        assert!(cfg.handler_name().is_empty());
    }

    #[test]
    fn numeric_writes_use_leading_digits() {
        let cfg = ThresholdConfig::new();
        assert!(cfg.write_max_proc("150abc"));
        assert_eq!(cfg.read_max_proc(), 150);

        assert!(!cfg.write_max_mem_percent("xyz"));
        assert_eq!(cfg.read_max_mem_percent(), 0);
    }

    #[test]
    fn last_write_wins() {
        let cfg = ThresholdConfig::new();
        for (input, expected) in [("10", 10), ("20\n", 20), ("bogus", 0), ("35", 35)] {
            cfg.write_max_proc(input);
            assert_eq!(cfg.read_max_proc(), expected, "after writing {input:?}");
        }
    }

    #[test]
    fn unparseable_write_resets_a_previous_value() {
        let cfg = ThresholdConfig::new();
        cfg.write_max_mem_percent("90");
        cfg.write_max_mem_percent("");
        assert_eq!(cfg.read_max_mem_percent(), 0);
    }

    #[test]
    fn handler_name_round_trips() {
        let cfg = ThresholdConfig::new();
        assert!(!cfg.set_handler_name("notifyd"));
        assert_eq!(cfg.handler_name(), "notifyd");

        let exact = "h".repeat(HANDLER_NAME_MAX_BYTES);
        assert!(!cfg.set_handler_name(&exact));
        assert_eq!(cfg.handler_name(), exact);
    }

    #[test]
    fn long_handler_name_is_truncated() {
        let cfg = ThresholdConfig::new();
        let long = "a".repeat(300);
        assert!(cfg.set_handler_name(&long));
        assert_eq!(cfg.handler_name(), "a".repeat(HANDLER_NAME_MAX_BYTES));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 254 ASCII bytes followed by a two-byte character: the character
        // would straddle the limit and is dropped whole.
        let name = format!("{}é", "a".repeat(254));
        assert_eq!(clamp_to_bytes(&name, HANDLER_NAME_MAX_BYTES), "a".repeat(254));
    }

    #[test]
    fn snapshot_reflects_all_fields() {
        let cfg = ThresholdConfig::new();
        cfg.set_max_proc(300);
        cfg.set_max_mem_percent(85);
        cfg.set_handler_name("/usr/local/bin/alert");

        let snap = cfg.snapshot();
        assert_eq!(
            snap,
            ThresholdSnapshot {
                max_proc: 300,
                max_mem_percent: 85,
                handler_name: "/usr/local/bin/alert".to_string(),
            }
        );

        let json = serde_json::to_value(&snap).expect("snapshot serializes");
        assert_eq!(json["max_mem_percent"], 85);
    }
}
