//! Voice activity monitoring
//!
//! Classifies the live stream as speaking or silent on a fixed poll cadence
//! and tells the controller once a listening window has gone quiet for the
//! configured duration.

mod meter;
mod monitor;

pub use meter::{byte_level, EnergyWindow, LEVEL_CEILING_DB, LEVEL_FLOOR_DB};
pub use monitor::{SilenceTracker, VadConfig, VoiceActivityMonitor};
