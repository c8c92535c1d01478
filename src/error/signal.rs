// Signal processing error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Signal error code constants
///
/// Error code range: 1001-1005
pub struct SignalErrorCodes {}

impl SignalErrorCodes {
    /// Channel index outside the configured range
    pub const INVALID_CHANNEL: i32 = 1001;

    /// Process or measurement noise was not strictly positive
    pub const DEGENERATE_NOISE: i32 = 1002;

    /// Sample frame shorter than the configured frame length
    pub const INSUFFICIENT_SAMPLES: i32 = 1003;

    /// Band definition violates ordering or Nyquist constraints
    pub const INVALID_BAND: i32 = 1004;

    /// Initial error covariance was negative or not a number
    pub const DEGENERATE_COVARIANCE: i32 = 1005;
}

/// Log a signal error with structured context
///
/// Mirrors `log_calibration_error`: code, component and message are emitted
/// on a single line so they can be grepped from device logs.
pub fn log_signal_error(err: &SignalError, context: &str) {
    error!(
        "Signal error in {}: code={}, component=SignalPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Signal processing errors
///
/// Raised for caller and configuration mistakes only. Numeric edge cases
/// (all-zero frames, empty bands) are absorbed by the epsilon-guarded
/// formulas and never surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalError {
    /// Channel index is not in `[0, channels)`
    InvalidChannel { channel: usize, channels: usize },

    /// Noise parameters must both be > 0
    DegenerateNoise {
        process_noise: f32,
        measurement_noise: f32,
    },

    /// Frame is shorter than the analyzer's frame length
    InsufficientSamples { required: usize, provided: usize },

    /// Band configuration is invalid
    InvalidBand { name: String, reason: String },

    /// Initial error covariance must be >= 0
    DegenerateCovariance { initial_covariance: f32 },
}

impl ErrorCode for SignalError {
    fn code(&self) -> i32 {
        match self {
            SignalError::InvalidChannel { .. } => SignalErrorCodes::INVALID_CHANNEL,
            SignalError::DegenerateNoise { .. } => SignalErrorCodes::DEGENERATE_NOISE,
            SignalError::InsufficientSamples { .. } => SignalErrorCodes::INSUFFICIENT_SAMPLES,
            SignalError::InvalidBand { .. } => SignalErrorCodes::INVALID_BAND,
            SignalError::DegenerateCovariance { .. } => SignalErrorCodes::DEGENERATE_COVARIANCE,
        }
    }

    fn message(&self) -> String {
        match self {
            SignalError::InvalidChannel { channel, channels } => {
                format!(
                    "Invalid channel {} (configured channels: 0..{})",
                    channel, channels
                )
            }
            SignalError::DegenerateNoise {
                process_noise,
                measurement_noise,
            } => {
                format!(
                    "Noise parameters must be > 0 (process={}, measurement={})",
                    process_noise, measurement_noise
                )
            }
            SignalError::InsufficientSamples { required, provided } => {
                format!(
                    "Insufficient samples: need {}, got {}",
                    required, provided
                )
            }
            SignalError::InvalidBand { name, reason } => {
                format!("Invalid band '{}': {}", name, reason)
            }
            SignalError::DegenerateCovariance { initial_covariance } => {
                format!(
                    "Initial covariance must be >= 0 (got {})",
                    initial_covariance
                )
            }
        }
    }
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignalError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SignalError {}
