//! Integration tests for the attention scoring pipeline
//!
//! These tests exercise the public API end to end:
//! - Configuration file → pipeline construction
//! - Recorded WAV → frame source → pipeline → reports
//! - Frame queue → pipeline worker thread
//! - Threshold notifications over a scored session

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use attention_monitor::acquisition::{FrameQueue, FrameSource, SyntheticSource};
use attention_monitor::config::{AppConfig, NotificationConfig};
use attention_monitor::fixtures::{write_wav, WavFrameSource};
use attention_monitor::notify::{CrossingOutcome, Notifier, ThresholdMonitor};
use attention_monitor::pipeline::{spawn_pipeline_thread, AttentionPipeline};

fn temp_path(name: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "attention_integration_{}_{}.{}",
        name,
        std::process::id(),
        ext
    ))
}

fn synthetic_samples(mut source: SyntheticSource, frames: usize) -> Vec<f32> {
    let mut samples = Vec::new();
    for _ in 0..frames {
        samples.extend(source.next_frame().unwrap());
    }
    samples
}

#[derive(Default)]
struct CountingNotifier {
    sent: AtomicUsize,
}

impl Notifier for CountingNotifier {
    fn send_notification(&self, _message: &str) -> bool {
        self.sent.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Test: config written to disk drives the pipeline layout
#[test]
fn test_config_file_builds_pipeline() {
    let path = temp_path("config", "json");
    let mut config = AppConfig::default();
    config.spectral.frame_len = 256;
    config.scoring.history_len = 4;
    config.filter.condition_channel = Some(0);
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = AppConfig::load_from_file(&path);
    assert_eq!(loaded.spectral.frame_len, 256);
    assert_eq!(loaded.filter.condition_channel, Some(0));
    loaded.validate().unwrap();

    let pipeline = AttentionPipeline::from_config(&loaded).unwrap();
    assert_eq!(pipeline.frame_len(), 256);
    assert_eq!(pipeline.scorer().config().history_len, 4);

    std::fs::remove_file(&path).unwrap();
}

/// Test: a broken config file falls back to defaults
#[test]
fn test_corrupt_config_uses_defaults() {
    let path = temp_path("corrupt_config", "json");
    std::fs::write(&path, "{ not json").unwrap();

    let loaded = AppConfig::load_from_file(&path);
    assert_eq!(loaded.spectral.frame_len, 128);
    assert_eq!(loaded.calibration.duration_secs, 30);

    std::fs::remove_file(&path).unwrap();
}

/// Test: recording on disk scores the same as the live signal it came from
#[test]
fn test_wav_recording_matches_live_scoring() {
    let path = temp_path("recording", "wav");
    let samples = synthetic_samples(SyntheticSource::focused(11), 20);
    write_wav(&path, &samples, 512).unwrap();

    let config = AppConfig::default();
    let mut live = AttentionPipeline::from_config(&config).unwrap();
    let live_count = live.run(&mut SyntheticSource::focused(11).with_limit(20), None);

    let mut replay = AttentionPipeline::from_config(&config).unwrap();
    let mut source = WavFrameSource::open(&path, config.spectral.frame_len).unwrap();
    let replay_count = replay.run(&mut source, None);

    assert_eq!(live_count, 20);
    assert_eq!(replay_count, 20);
    let live_report = live.latest().unwrap();
    let replay_report = replay.latest().unwrap();
    assert_eq!(replay_report.sequence, live_report.sequence);
    assert!((replay_report.score - live_report.score).abs() < 1e-3);

    std::fs::remove_file(&path).unwrap();
}

/// Test: frames published by an acquisition thread reach the worker
#[test]
fn test_queue_feeds_worker_thread() {
    let config = AppConfig::default();
    let pipeline = AttentionPipeline::from_config(&config).unwrap();
    let mut reports = pipeline.subscribe();
    let (mut acquisition, processing) = FrameQueue::new(4, config.spectral.frame_len);
    let running = Arc::new(AtomicBool::new(true));

    let worker = spawn_pipeline_thread(pipeline, processing, Arc::clone(&running));

    let producer = std::thread::spawn(move || {
        let mut source = SyntheticSource::relaxed(2).with_limit(12);
        let mut published = 0;
        while let Some(frame) = source.next_frame() {
            while !acquisition.publish(&frame) {
                std::thread::sleep(Duration::from_millis(1));
            }
            published += 1;
        }
        published
    });

    assert_eq!(producer.join().unwrap(), 12);
    let pipeline = worker.join().unwrap();

    assert_eq!(pipeline.latest().unwrap().sequence, 12);
    let mut received = 0;
    while reports.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 12);
}

/// Test: a session rising from relaxed to focused notifies once
#[test]
fn test_session_notifies_on_rising_edge() {
    let config = AppConfig::default();
    let mut pipeline = AttentionPipeline::from_config(&config).unwrap();

    let mut relaxed = SyntheticSource::relaxed(4).with_limit(30);
    pipeline.run(&mut relaxed, None);
    let relaxed_score = pipeline.latest().unwrap().score;

    let mut focused = SyntheticSource::focused(4).with_limit(30);
    pipeline.run(&mut focused, None);
    let focused_score = pipeline.latest().unwrap().score;
    assert!(focused_score > relaxed_score);

    let threshold = (relaxed_score + focused_score) / 2.0;
    let notifier = CountingNotifier::default();
    let mut monitor = ThresholdMonitor::new(&NotificationConfig {
        enabled: true,
        ..NotificationConfig::default()
    });

    let mut delivered = 0;
    for (sequence, score) in [relaxed_score, focused_score, focused_score, relaxed_score]
        .into_iter()
        .enumerate()
    {
        if monitor.observe(score, threshold, sequence as u64, &notifier)
            == CrossingOutcome::Delivered
        {
            delivered += 1;
        }
    }

    assert_eq!(delivered, 1);
    assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
}
