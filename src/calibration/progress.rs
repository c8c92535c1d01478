// Progress tracking for the calibration window
//
// Phases follow Idle -> Collecting -> Computing -> Idle on success and
// Collecting -> Failed -> Idle when the window produced nothing.

use serde::{Deserialize, Serialize};

/// Where the controller is in a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    #[default]
    Idle,
    /// Scoring frames and accumulating the sum
    Collecting,
    /// Window closed; deriving and persisting the threshold
    Computing,
    /// Window closed without usable samples
    Failed,
}

impl CalibrationPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, CalibrationPhase::Collecting | CalibrationPhase::Computing)
    }
}

/// Progress update broadcast while calibrating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub phase: CalibrationPhase,
    /// Elapsed share of the window, 0.0..=1.0
    pub fraction: f32,
    /// Frames scored so far
    pub samples: u32,
    pub elapsed_ms: u64,
    /// Smoothed score of the most recent frame
    pub latest_score: Option<f32>,
}

impl CalibrationProgress {
    pub fn idle() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            fraction: 0.0,
            samples: 0,
            elapsed_ms: 0,
            latest_score: None,
        }
    }

    /// Progress as a whole percentage (0-100)
    pub fn percentage(&self) -> u8 {
        (self.fraction.clamp(0.0, 1.0) * 100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.phase == CalibrationPhase::Computing && self.fraction >= 1.0
    }
}
