// Pipeline module - one frame in, one attention score out
//
// AttentionPipeline owns the processing chain for a single stream:
//   frame -> RecursiveFilter channel (optional) -> SpectralAnalyzer
//         -> AttentionScorer -> FrameReport
//
// Every report is stored as the latest snapshot and broadcast to
// subscribers. Observers on other threads read a cloned copy through
// LatestReport, never the scorer's live history.

mod worker;

pub use worker::spawn_pipeline_thread;

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::acquisition::FrameSource;
use crate::analysis::{
    AttentionScorer, BandPowerSet, ChannelId, RecursiveFilter, SpectralAnalyzer,
};
use crate::config::AppConfig;
use crate::error::{log_signal_error, SignalError};
use crate::telemetry::{self, DiagnosticError};

/// Capacity of the report broadcast channel
pub const REPORT_CHANNEL_CAPACITY: usize = 64;

/// Result of scoring one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// 1-based index of the frame within this pipeline's lifetime
    pub sequence: u64,
    pub band_powers: BandPowerSet,
    /// Clamped score of this frame alone
    pub raw_score: f32,
    /// Moving average over the scorer history
    pub score: f32,
}

/// Shared read handle on the most recent report
#[derive(Clone, Default)]
pub struct LatestReport {
    inner: Arc<RwLock<Option<FrameReport>>>,
}

impl LatestReport {
    /// Copy of the most recent report, if any frame was scored
    pub fn get(&self) -> Option<FrameReport> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, report: FrameReport) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(report);
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Anything that turns a frame into a smoothed attention score
///
/// Calibration drives this seam; the live pipeline is the production
/// implementation.
pub trait FrameScorer {
    fn score_frame(&mut self, frame: &[f32]) -> Result<f32, SignalError>;
}

struct Conditioner {
    filter: RecursiveFilter,
    channel: ChannelId,
}

/// Filter, analyzer and scorer for a single stream of frames
pub struct AttentionPipeline {
    conditioner: Option<Conditioner>,
    analyzer: SpectralAnalyzer,
    scorer: AttentionScorer,
    reports_tx: broadcast::Sender<FrameReport>,
    latest: LatestReport,
    scratch: Vec<f32>,
}

impl AttentionPipeline {
    pub fn new(analyzer: SpectralAnalyzer, scorer: AttentionScorer) -> Self {
        let (reports_tx, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        let frame_len = analyzer.frame_len();
        Self {
            conditioner: None,
            analyzer,
            scorer,
            reports_tx,
            latest: LatestReport::default(),
            scratch: Vec::with_capacity(frame_len),
        }
    }

    /// Build the chain described by `config` after validating it
    pub fn from_config(config: &AppConfig) -> Result<Self, SignalError> {
        config.validate()?;
        let bands = config.spectral.band_config()?;
        let scorer = AttentionScorer::for_bands(&bands, config.scoring.clone())?;
        let analyzer = SpectralAnalyzer::new(config.spectral.frame_len, bands);
        let mut pipeline = Self::new(analyzer, scorer);

        if let Some(index) = config.filter.condition_channel {
            let filter = RecursiveFilter::new(&config.filter)?;
            let channel = filter.channel(index)?;
            pipeline = pipeline.with_filter(filter, channel);
        }

        log::info!(
            "[Pipeline] Ready: frame_len={}, bands={}, conditioning={:?}",
            config.spectral.frame_len,
            config.spectral.bands.len(),
            config.filter.condition_channel
        );
        Ok(pipeline)
    }

    /// Run every frame through `channel` of `filter` before analysis
    pub fn with_filter(mut self, filter: RecursiveFilter, channel: ChannelId) -> Self {
        self.conditioner = Some(Conditioner { filter, channel });
        self
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn scorer(&self) -> &AttentionScorer {
        &self.scorer
    }

    pub fn frame_len(&self) -> usize {
        self.analyzer.frame_len()
    }

    /// Score one frame and publish the report
    ///
    /// A rejected frame leaves the filter state, history and sequence
    /// untouched.
    pub fn process_frame(&mut self, frame: &[f32]) -> Result<FrameReport, SignalError> {
        let frame_len = self.analyzer.frame_len();
        if frame.len() < frame_len {
            let err = SignalError::InsufficientSamples {
                required: frame_len,
                provided: frame.len(),
            };
            log_signal_error(&err, "process_frame");
            telemetry::hub().record_error(DiagnosticError::InvalidFrame, err.to_string());
            return Err(err);
        }

        let powers = match self.conditioner.as_mut() {
            Some(conditioner) => {
                self.scratch.clear();
                self.scratch.extend_from_slice(&frame[..frame_len]);
                conditioner
                    .filter
                    .filter_frame(&mut self.scratch, conditioner.channel)?;
                self.analyzer.analyze(&self.scratch)?
            }
            None => self.analyzer.analyze(frame)?,
        };

        let raw_score = self.scorer.raw_score(&powers);
        let score = self.scorer.push(raw_score);
        let snapshot = self.scorer.snapshot();

        let report = FrameReport {
            sequence: snapshot.sequence,
            band_powers: powers,
            raw_score,
            score,
        };

        self.latest.store(report.clone());
        // No subscribers is not an error
        let _ = self.reports_tx.send(report.clone());
        telemetry::hub().record_frame(&snapshot);

        Ok(report)
    }

    /// Drain `source`, scoring up to `max_frames` frames
    ///
    /// Rejected frames are logged and skipped. Returns how many frames were
    /// scored.
    pub fn run(&mut self, source: &mut dyn FrameSource, max_frames: Option<usize>) -> usize {
        let mut scored = 0;
        while max_frames.map_or(true, |max| scored < max) {
            let Some(frame) = source.next_frame() else {
                break;
            };
            match self.process_frame(&frame) {
                Ok(_) => scored += 1,
                Err(err) => log::warn!("[Pipeline] Skipping frame: {}", err),
            }
        }
        scored
    }

    /// Receiver for every report published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FrameReport> {
        self.reports_tx.subscribe()
    }

    /// Async stream over published reports; lagging consumers see
    /// `Err(Lagged)` items instead of blocking the producer
    pub fn report_stream(&self) -> BroadcastStream<FrameReport> {
        BroadcastStream::new(self.reports_tx.subscribe())
    }

    /// Copy of the most recent report
    pub fn latest(&self) -> Option<FrameReport> {
        self.latest.get()
    }

    /// Handle other threads can poll for the latest report
    pub fn latest_handle(&self) -> LatestReport {
        self.latest.clone()
    }

    /// Clear filter state, scorer history and the latest report
    pub fn reset(&mut self) {
        if let Some(conditioner) = self.conditioner.as_mut() {
            conditioner.filter.reset();
        }
        self.scorer.reset();
        self.latest.clear();
    }
}

impl FrameScorer for AttentionPipeline {
    fn score_frame(&mut self, frame: &[f32]) -> Result<f32, SignalError> {
        self.process_frame(frame).map(|report| report.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{SyntheticSource, VecSource};
    use futures::StreamExt;

    fn pipeline() -> AttentionPipeline {
        AttentionPipeline::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn test_focused_signal_outscores_relaxed_signal() {
        let mut focused = pipeline();
        let mut relaxed = pipeline();

        assert_eq!(focused.run(&mut SyntheticSource::focused(1), Some(20)), 20);
        assert_eq!(relaxed.run(&mut SyntheticSource::relaxed(1), Some(20)), 20);

        let focused_score = focused.latest().unwrap().score;
        let relaxed_score = relaxed.latest().unwrap().score;
        assert!(
            focused_score > relaxed_score + 20.0,
            "focused {} vs relaxed {}",
            focused_score,
            relaxed_score
        );
    }

    #[test]
    fn test_reports_are_broadcast_in_order() {
        let mut pipeline = pipeline();
        let mut rx = pipeline.subscribe();

        pipeline.run(&mut SyntheticSource::focused(2), Some(3));

        for expected in 1..=3 {
            let report = rx.try_recv().unwrap();
            assert_eq!(report.sequence, expected);
            assert_eq!(report.band_powers.len(), 4);
            assert!((0.0..=100.0).contains(&report.score));
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_short_frame_leaves_state_untouched() {
        let mut pipeline = pipeline();
        pipeline.run(&mut SyntheticSource::focused(3), Some(2));
        let before = pipeline.latest().unwrap();

        let err = pipeline.process_frame(&[0.0; 64]).unwrap_err();
        assert_eq!(
            err,
            SignalError::InsufficientSamples {
                required: 128,
                provided: 64
            }
        );
        assert_eq!(pipeline.latest().unwrap(), before);
        assert_eq!(pipeline.scorer().snapshot().sequence, 2);
    }

    #[test]
    fn test_run_skips_bad_frames() {
        let mut pipeline = pipeline();
        let mut source = VecSource::new(vec![vec![0.0; 128], vec![0.0; 3], vec![0.0; 128]]);
        assert_eq!(pipeline.run(&mut source, None), 2);
        assert_eq!(pipeline.latest().unwrap().sequence, 2);
    }

    #[test]
    fn test_conditioning_smooths_input() {
        let mut config = AppConfig::default();
        config.filter.condition_channel = Some(1);
        let mut conditioned = AttentionPipeline::from_config(&config).unwrap();
        let mut plain = pipeline();

        let frame = SyntheticSource::focused(4).next_frame().unwrap();
        let a = conditioned.process_frame(&frame).unwrap();
        let b = plain.process_frame(&frame).unwrap();
        assert_ne!(a.band_powers, b.band_powers);
    }

    #[test]
    fn test_reset_clears_latest() {
        let mut pipeline = pipeline();
        pipeline.run(&mut SyntheticSource::relaxed(5), Some(1));
        let handle = pipeline.latest_handle();
        assert!(handle.get().is_some());

        pipeline.reset();
        assert!(handle.get().is_none());
        assert_eq!(pipeline.scorer().history(), &[0.0; 10]);
    }

    #[tokio::test]
    async fn test_report_stream_yields_reports() {
        let mut pipeline = pipeline();
        let mut stream = pipeline.report_stream();

        pipeline.run(&mut SyntheticSource::focused(6), Some(2));

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!((first.sequence, second.sequence), (1, 2));
    }
}
