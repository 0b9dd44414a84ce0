//! # gazesync - binocular gaze acquisition for wearable eye trackers
//!
//! Moves gaze samples from a vendor callback thread to a host poll loop.
//! Provides:
//! - Device session lifecycle (create, subscribe, bounded wait, teardown)
//! - Lock-protected latest gaze state with consistent snapshots
//! - Poll-tick controller with blink edge detection
//! - One-shot hardware detection with ownership hand-off to the host
//! - A simulated SDK backend for running without hardware
//!
//! ## Quick Start
//! ```no_run
//! use gazesync::{Config, DeviceSession, ReportSink, TrackerController};
//! use gazesync::sim::SimulatedSdk;
//! use gazesync::types::{BlinkReport, GazeReport};
//!
//! struct Print;
//! impl ReportSink for Print {
//!     fn send_descriptor(&mut self, _: &str) {}
//!     fn report_gaze(&mut self, r: GazeReport) { println!("{:?}", r); }
//!     fn report_blink(&mut self, r: BlinkReport) { println!("{:?}", r); }
//! }
//!
//! let mut controller = TrackerController::new(|| {
//!     DeviceSession::new(SimulatedSdk::new(), Config::from_env())
//! });
//! for _ in 0..100 {
//!     controller.update(&mut Print);
//! }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod convert;
pub mod state;
pub mod sdk;
pub mod sim;
pub mod tracker;
pub mod session;
pub mod controller;
pub mod detection;

#[cfg(test)]
mod testlog;

pub use config::Config;
pub use controller::{ReportSink, TickOutcome, TrackerController};
pub use detection::{DetectionGate, HostRegistry};
pub use error::{GazeError, SdkError};
pub use session::{DeviceSession, SessionState};
pub use state::SharedGazeState;
pub use tracker::{EyeTracker, NullTracker};
pub use types::*;

/// Result type alias for gazesync operations.
pub type Result<T> = std::result::Result<T, GazeError>;
