//! Key/value setting endpoints and their registry.
//!
//! Each tunable in [`ThresholdConfig`] is exposed as a [`Setting`]: a text
//! read and a byte-oriented write, in the style of proc/sysctl files. A
//! [`SettingsRegistry`] is whatever transport publishes those endpoints;
//! [`SettingsTable`] is the in-process implementation used by the daemon.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use loadwatch_core::{ThresholdConfig, HANDLER_NAME_MAX_BYTES};

/// A readable/writable configuration endpoint.
pub trait Setting: Send + Sync {
    /// Current value rendered as text, newline-terminated.
    fn read(&self) -> String;

    /// Apply `input`. Returns the number of bytes consumed, which is always
    /// the full input length.
    fn write(&self, input: &[u8]) -> usize;
}

/// The three fields of [`ThresholdConfig`] that are exposed as settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdField {
    MaxProc,
    MaxMemPercent,
    HandlerName,
}

impl ThresholdField {
    /// Registration order.
    pub const ALL: [ThresholdField; 3] = [Self::MaxProc, Self::MaxMemPercent, Self::HandlerName];

    /// Endpoint name the field is registered under.
    pub fn name(self) -> &'static str {
        match self {
            Self::MaxProc => "max_proc",
            Self::MaxMemPercent => "max_mem_percent",
            Self::HandlerName => "handler_name",
        }
    }
}

/// Endpoint bound to one field of a shared [`ThresholdConfig`].
#[derive(Debug, Clone)]
pub struct ThresholdSetting {
    config: Arc<ThresholdConfig>,
    field: ThresholdField,
}

impl ThresholdSetting {
    pub fn new(config: Arc<ThresholdConfig>, field: ThresholdField) -> Self {
        Self { config, field }
    }

    pub fn field(&self) -> ThresholdField {
        self.field
    }

    fn log_no_digits(&self, parsed: bool) {
        if !parsed {
            tracing::debug!(setting = self.field.name(), "Numeric write without digits, storing 0");
        }
    }
}

/// Handler name carried by a raw write: up to the first newline or NUL,
/// at most [`HANDLER_NAME_MAX_BYTES`] bytes, and only the valid UTF-8
/// prefix of those. Returns the name and whether anything was cut.
fn handler_name_from_bytes(input: &[u8]) -> (&str, bool) {
    let end = input
        .iter()
        .position(|&b| b == b'\n' || b == 0)
        .unwrap_or(input.len());
    let raw = &input[..end.min(HANDLER_NAME_MAX_BYTES)];
    match std::str::from_utf8(raw) {
        Ok(name) => (name, end > raw.len()),
        Err(e) => {
            // Valid by construction.
            let name = std::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or_default();
            (name, true)
        }
    }
}

impl Setting for ThresholdSetting {
    fn read(&self) -> String {
        match self.field {
            ThresholdField::MaxProc => format!("{}\n", self.config.read_max_proc()),
            ThresholdField::MaxMemPercent => format!("{}\n", self.config.read_max_mem_percent()),
            ThresholdField::HandlerName => format!("{}\n", self.config.handler_name()),
        }
    }

    fn write(&self, input: &[u8]) -> usize {
        match self.field {
            ThresholdField::MaxProc => self.log_no_digits(self.config.write_max_proc(input)),
            ThresholdField::MaxMemPercent => {
                self.log_no_digits(self.config.write_max_mem_percent(input))
            }
            ThresholdField::HandlerName => {
                let (name, cut) = handler_name_from_bytes(input);
                self.config.set_handler_name(name);
                if cut {
                    tracing::warn!(
                        stored = name.len(),
                        max = HANDLER_NAME_MAX_BYTES,
                        "Handler name truncated"
                    );
                }
            }
        }
        input.len()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Errors from registering or unregistering setting endpoints.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Setting '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Setting '{0}' is not registered")]
    NotRegistered(String),

    #[error("Registry rejected setting '{name}': {reason}")]
    Rejected { name: String, reason: String },
}

/// Transport that publishes setting endpoints under a name.
pub trait SettingsRegistry: Send + Sync {
    fn register(&self, name: &str, setting: Arc<dyn Setting>) -> Result<(), RegistryError>;

    fn unregister(&self, name: &str) -> Result<(), RegistryError>;
}

/// In-process registry: a name → endpoint table.
#[derive(Default)]
pub struct SettingsTable {
    entries: RwLock<BTreeMap<String, Arc<dyn Setting>>>,
}

impl fmt::Debug for SettingsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsTable")
            .field("names", &self.names())
            .finish()
    }
}

impl SettingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, name: &str) -> Result<Arc<dyn Setting>, RegistryError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    /// Read the endpoint registered as `name`.
    pub fn read(&self, name: &str) -> Result<String, RegistryError> {
        Ok(self.get(name)?.read())
    }

    /// Write `input` to the endpoint registered as `name`.
    pub fn write(&self, name: &str, input: &[u8]) -> Result<usize, RegistryError> {
        // Release the table lock before running the endpoint.
        let setting = self.get(name)?;
        Ok(setting.write(input))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl SettingsRegistry for SettingsTable {
    fn register(&self, name: &str, setting: Arc<dyn Setting>) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        entries.insert(name.to_string(), setting);
        Ok(())
    }

    fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
