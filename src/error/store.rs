// Persistence collaborator errors

use std::fmt;

/// Failure reported by a [`PreferenceStore`](crate::store::PreferenceStore)
///
/// Stores know nothing about calibration; the controller decides whether a
/// given failure is recoverable (reads) or surfaced (writes).
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backing medium could not be opened or reached
    Unavailable { reason: String },

    /// Stored payload could not be decoded or encoded
    Corrupt { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable { reason } => write!(f, "store unavailable: {}", reason),
            StoreError::Corrupt { reason } => write!(f, "store corrupt: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt {
            reason: err.to_string(),
        }
    }
}
