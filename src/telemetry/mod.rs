//! Process-wide telemetry for scoring, calibration and persistence.
//!
//! The collector multiplexes scoring, calibration, persistence and
//! notification events into a bounded history plus a broadcast stream.
//! Publishing never blocks the frame path: a missing subscriber or a
//! poisoned history lock only costs the event its history slot.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::analysis::ScoreSnapshot;

pub mod events;

pub use events::{DiagnosticError, MetricEvent};

/// Hub every component publishes into.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Point-in-time copy of the retained events and counters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub published: u64,
    pub evicted: u64,
}

/// Fan-out of metric events with a bounded replay buffer.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    retained: Mutex<VecDeque<MetricEvent>>,
    retain_limit: usize,
    published: AtomicU64,
    evicted: AtomicU64,
}

impl TelemetryCollector {
    /// `channel_capacity` bounds lagging subscribers, `retain_limit` the
    /// replay buffer (0 disables it)
    pub fn new(channel_capacity: usize, retain_limit: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            tx,
            retained: Mutex::new(VecDeque::with_capacity(retain_limit)),
            retain_limit,
            published: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        if self.retain_limit > 0 {
            let mut retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
            while retained.len() >= self.retain_limit {
                retained.pop_front();
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
            retained.push_back(event.clone());
        }

        // No subscribers is not an error
        self.tx.send(event).ok();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
        TelemetrySnapshot {
            recent: Vec::from_iter(retained.iter().cloned()),
            published: self.published.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Rolling window over recent smoothed scores.
struct ScoreWindow {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl ScoreWindow {
    fn with_len(len: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(len),
            max_samples: len.max(1),
        }
    }

    fn observe(&mut self, value: f32) -> f32 {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }
}

/// Collector plus the rolling score gauge fed by `record_frame`.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    scores: Mutex<ScoreWindow>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, retain_limit: usize, score_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, retain_limit),
            scores: Mutex::new(ScoreWindow::with_len(score_window)),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_frame(&self, snapshot: &ScoreSnapshot) {
        let window_avg = self
            .scores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(snapshot.smoothed);

        self.collector.publish(MetricEvent::FrameScored {
            sequence: snapshot.sequence,
            raw_score: snapshot.raw,
            score: snapshot.smoothed,
            window_avg,
        });
    }

    pub fn record_calibration(&self, threshold: f32, samples: u32, elapsed_ms: u64) {
        self.collector.publish(MetricEvent::CalibrationCompleted {
            threshold,
            samples,
            elapsed_ms,
        });
    }

    pub fn record_persistence_fallback(&self, operation: impl Into<String>, default_value: f32) {
        self.collector.publish(MetricEvent::PersistenceFallback {
            operation: operation.into(),
            default_value,
        });
    }

    pub fn record_notification(&self, score: f32, threshold: f32, delivered: bool) {
        self.collector.publish(MetricEvent::NotificationSent {
            score,
            threshold,
            delivered,
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}
