//! Pure domain logic for the loadwatch threshold monitor.
//!
//! Nothing in this crate performs I/O or logging, so it can be tested in
//! isolation and shared by the daemon and the reference handler.

pub mod error;
pub mod event;
pub mod parse;
pub mod thresholds;

pub use error::CoreError;
pub use event::EventKind;
pub use thresholds::{ThresholdConfig, ThresholdSnapshot, HANDLER_NAME_MAX_BYTES};
