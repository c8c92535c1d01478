// Calibration error types and constants

use crate::error::{ErrorCode, SignalError, StoreError};
use log::error;
use std::fmt;

/// Stable numeric codes for `CalibrationError` (2001-2007)
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration window produced no samples
    pub const ZERO_CALIBRATION_SAMPLES: i32 = 2001;

    /// Persistence collaborator failed
    pub const PERSISTENCE_UNAVAILABLE: i32 = 2002;

    /// Calibration already in progress
    pub const ALREADY_IN_PROGRESS: i32 = 2003;

    /// Calibration cancelled before completion
    pub const CANCELLED: i32 = 2004;

    /// Calibration state lock was poisoned
    pub const STATE_POISONED: i32 = 2005;

    /// Frame source delivered an unusable frame
    pub const SOURCE: i32 = 2006;

    /// Calibration parameters rejected
    pub const INVALID_PARAMETERS: i32 = 2007;
}

/// Log `err` at error level, tagged with its code and the failing operation
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationController, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Failures of a calibration run, threshold persistence or controller state
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// No frames were scored before the deadline
    ZeroCalibrationSamples,

    /// Persistence collaborator could not complete an operation
    PersistenceUnavailable { operation: String, reason: String },

    /// Calibration already in progress
    AlreadyInProgress,

    /// Calibration was cancelled; accumulated samples were discarded
    Cancelled,

    /// Calibration state lock was poisoned
    StatePoisoned,

    /// Frame source produced a frame the pipeline rejected
    Source { reason: String },

    /// Duration, sample period or factor rejected
    InvalidParameters { reason: String },
}

impl CalibrationError {
    pub(crate) fn persistence(operation: &str, err: &StoreError) -> Self {
        CalibrationError::PersistenceUnavailable {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::ZeroCalibrationSamples => {
                CalibrationErrorCodes::ZERO_CALIBRATION_SAMPLES
            }
            CalibrationError::PersistenceUnavailable { .. } => {
                CalibrationErrorCodes::PERSISTENCE_UNAVAILABLE
            }
            CalibrationError::AlreadyInProgress => CalibrationErrorCodes::ALREADY_IN_PROGRESS,
            CalibrationError::Cancelled => CalibrationErrorCodes::CANCELLED,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
            CalibrationError::Source { .. } => CalibrationErrorCodes::SOURCE,
            CalibrationError::InvalidParameters { .. } => {
                CalibrationErrorCodes::INVALID_PARAMETERS
            }
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::ZeroCalibrationSamples => {
                "Calibration window produced no samples".to_string()
            }
            CalibrationError::PersistenceUnavailable { operation, reason } => {
                format!("Persistence unavailable during {}: {}", operation, reason)
            }
            CalibrationError::AlreadyInProgress => "Calibration already in progress".to_string(),
            CalibrationError::Cancelled => "Calibration cancelled".to_string(),
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
            CalibrationError::Source { reason } => format!("Frame source error: {}", reason),
            CalibrationError::InvalidParameters { reason } => {
                format!("Invalid calibration parameters: {}", reason)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

impl From<SignalError> for CalibrationError {
    fn from(err: SignalError) -> Self {
        CalibrationError::Source {
            reason: err.message(),
        }
    }
}
