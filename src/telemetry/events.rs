//! Telemetry event types exposed to the CLI and any in-process observer.

use serde::{Deserialize, Serialize};

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    FixtureLoad,
    InvalidFrame,
    Persistence,
    Calibration,
    Unknown,
}

/// Metric events covering scoring, calibration, persistence and notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    FrameScored {
        sequence: u64,
        raw_score: f32,
        score: f32,
        /// Mean smoothed score over the hub's rolling window
        window_avg: f32,
    },
    CalibrationCompleted {
        threshold: f32,
        samples: u32,
        elapsed_ms: u64,
    },
    PersistenceFallback {
        operation: String,
        default_value: f32,
    },
    NotificationSent {
        score: f32,
        threshold: f32,
        delivered: bool,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
