// Calibration module - baseline threshold learning and storage
//
// This module provides:
// 1. CalibrationController: owns the threshold, runs timed calibration
//    windows, persists through an injected PreferenceStore
// 2. CalibrationProcedure: sum/count accumulation for one window
// 3. CalibrationState: the persisted threshold and its band layout version
// 4. Clock: injected time source so windows can be simulated
//
// The calibration workflow:
// 1. Score frames for the configured duration, one per sample period
// 2. threshold = mean score * factor
// 3. Persist, then publish the new threshold

pub mod clock;
pub mod controller;
pub mod procedure;
pub mod progress;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{spawn_calibration, CalibrationController, CalibrationHandle};
pub use procedure::{CalibrationParams, CalibrationProcedure};
pub use progress::{CalibrationPhase, CalibrationProgress};
pub use state::{CalibrationState, LoadSource};
