// Error types for the attention monitor
//
// This module defines custom error types for signal processing and calibration
// operations, providing structured error handling with stable numeric codes.

mod calibration;
mod signal;
mod store;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use signal::{log_signal_error, SignalError, SignalErrorCodes};
pub use store::StoreError;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
