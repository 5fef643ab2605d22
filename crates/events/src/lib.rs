//! Event hand-off between threshold detectors and the monitor worker.
//!
//! - [`EventChannel`]: lock-guarded event id paired with a wake condition.

pub mod channel;

pub use channel::EventChannel;
