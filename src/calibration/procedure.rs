// CalibrationProcedure - accumulation for one calibration window
//
// The procedure holds no clock and no frame source: the controller feeds it
// scores and elapsed time. It owns the running sum and count, and turns
// them into `mean * factor` once the window closes.

use std::time::Duration;

use crate::calibration::progress::{CalibrationPhase, CalibrationProgress};
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;

/// Validated timing and scaling for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    pub duration: Duration,
    pub sample_period: Duration,
    /// Multiplier applied to the mean score
    pub factor: f32,
}

impl CalibrationParams {
    pub fn new(
        duration: Duration,
        sample_period: Duration,
        factor: f32,
    ) -> Result<Self, CalibrationError> {
        if duration.is_zero() {
            return Err(CalibrationError::InvalidParameters {
                reason: "duration must be positive".to_string(),
            });
        }
        if sample_period.is_zero() {
            return Err(CalibrationError::InvalidParameters {
                reason: "sample period must be positive".to_string(),
            });
        }
        if !(factor.is_finite() && factor > 0.0) {
            return Err(CalibrationError::InvalidParameters {
                reason: format!("factor must be positive, got {}", factor),
            });
        }
        Ok(Self {
            duration,
            sample_period,
            factor,
        })
    }

    pub fn from_config(config: &CalibrationConfig) -> Result<Self, CalibrationError> {
        Self::new(config.duration(), config.sample_period(), config.factor)
    }
}

/// Running state of a calibration window
#[derive(Debug, Clone)]
pub struct CalibrationProcedure {
    params: CalibrationParams,
    phase: CalibrationPhase,
    sum: f64,
    count: u32,
    latest_score: Option<f32>,
}

impl CalibrationProcedure {
    pub fn new(params: CalibrationParams) -> Self {
        Self {
            params,
            phase: CalibrationPhase::Collecting,
            sum: 0.0,
            count: 0,
            latest_score: None,
        }
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn samples(&self) -> u32 {
        self.count
    }

    /// Mean of the recorded scores, if any
    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / self.count as f64) as f32)
    }

    /// Whether `elapsed` still falls inside the window
    pub fn window_open(&self, elapsed: Duration) -> bool {
        elapsed < self.params.duration
    }

    /// Add one score; ignored once the window has been finalized
    pub fn record(&mut self, score: f32) {
        if self.phase != CalibrationPhase::Collecting {
            log::warn!(
                "[Calibration] Ignoring score recorded in phase {:?}",
                self.phase
            );
            return;
        }
        self.sum += score as f64;
        self.count += 1;
        self.latest_score = Some(score);
    }

    pub fn progress(&self, elapsed: Duration) -> CalibrationProgress {
        let fraction = elapsed.as_secs_f64() / self.params.duration.as_secs_f64();
        CalibrationProgress {
            phase: self.phase,
            fraction: fraction.clamp(0.0, 1.0) as f32,
            samples: self.count,
            elapsed_ms: elapsed.as_millis() as u64,
            latest_score: self.latest_score,
        }
    }

    /// Close the window and derive the threshold
    ///
    /// Moves to `Computing` and returns `mean * factor`, or moves to
    /// `Failed` when nothing was recorded.
    pub fn finalize(&mut self) -> Result<f32, CalibrationError> {
        match self.mean() {
            Some(mean) => {
                self.phase = CalibrationPhase::Computing;
                Ok(mean * self.params.factor)
            }
            None => {
                self.phase = CalibrationPhase::Failed;
                Err(CalibrationError::ZeroCalibrationSamples)
            }
        }
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
