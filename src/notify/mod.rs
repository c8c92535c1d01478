// Notify module - tell someone when attention rises above the threshold
//
// The transport (SMS modem, push service, ...) lives outside this crate and
// is reached through the Notifier trait. ThresholdMonitor decides when to
// call it: on an upward crossing of the calibrated threshold, at most once
// per cooldown window.

use crate::config::NotificationConfig;
use crate::telemetry;

/// External message transport
pub trait Notifier: Send + Sync {
    /// Returns false when the message could not be delivered
    fn send_notification(&self, message: &str) -> bool;
}

/// Notifier that only writes the message to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_notification(&self, message: &str) -> bool {
        log::info!("[Notify] {}", message);
        true
    }
}

/// Outcome of feeding one score to the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingOutcome {
    /// No upward crossing
    Quiet,
    /// Crossed, but inside the cooldown window
    Suppressed,
    Delivered,
    /// Crossed and the notifier reported failure
    Failed,
}

/// Upward crossing detector with a frame-count cooldown
#[derive(Debug)]
pub struct ThresholdMonitor {
    prev_score: Option<f32>,
    last_notified_frame: Option<u64>,
    cooldown_frames: u64,
    template: String,
    failures: u64,
}

impl ThresholdMonitor {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            prev_score: None,
            last_notified_frame: None,
            cooldown_frames: config.cooldown_frames,
            template: config.message_template.clone(),
            failures: 0,
        }
    }

    /// Forget the previous score and cooldown (e.g. after recalibration)
    pub fn reset(&mut self) {
        self.prev_score = None;
        self.last_notified_frame = None;
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Feed the score of frame `sequence`; notify on an upward crossing
    ///
    /// The first score ever seen counts as a crossing when it is already
    /// above the threshold.
    pub fn observe(
        &mut self,
        score: f32,
        threshold: f32,
        sequence: u64,
        notifier: &dyn Notifier,
    ) -> CrossingOutcome {
        let crossed = score > threshold && self.prev_score.map_or(true, |prev| prev <= threshold);
        self.prev_score = Some(score);

        if !crossed {
            return CrossingOutcome::Quiet;
        }

        if let Some(last) = self.last_notified_frame {
            if sequence.saturating_sub(last) < self.cooldown_frames {
                log::debug!(
                    "[Notify] Crossing at frame {} suppressed (cooldown until {})",
                    sequence,
                    last + self.cooldown_frames
                );
                return CrossingOutcome::Suppressed;
            }
        }

        self.last_notified_frame = Some(sequence);
        let message = self.render(score, threshold);
        let delivered = notifier.send_notification(&message);
        telemetry::hub().record_notification(score, threshold, delivered);

        if delivered {
            CrossingOutcome::Delivered
        } else {
            self.failures += 1;
            log::warn!("[Notify] Notifier failed to deliver: {}", message);
            CrossingOutcome::Failed
        }
    }

    fn render(&self, score: f32, threshold: f32) -> String {
        self.template
            .replace("{score}", &format!("{:.1}", score))
            .replace("{threshold}", &format!("{:.1}", threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn send_notification(&self, message: &str) -> bool {
            self.messages.lock().unwrap().push(message.to_string());
            !self.fail
        }
    }

    fn monitor(cooldown_frames: u64) -> ThresholdMonitor {
        ThresholdMonitor::new(&NotificationConfig {
            enabled: true,
            message_template: "score {score} over {threshold}".to_string(),
            cooldown_frames,
        })
    }

    #[test]
    fn test_upward_crossing_notifies_once() {
        let mut monitor = monitor(0);
        let notifier = RecordingNotifier::default();

        assert_eq!(monitor.observe(10.0, 40.0, 1, &notifier), CrossingOutcome::Quiet);
        assert_eq!(monitor.observe(45.0, 40.0, 2, &notifier), CrossingOutcome::Delivered);
        // Staying above is not a new crossing
        assert_eq!(monitor.observe(50.0, 40.0, 3, &notifier), CrossingOutcome::Quiet);

        assert_eq!(
            notifier.messages.lock().unwrap().as_slice(),
            ["score 45.0 over 40.0".to_string()]
        );
    }

    #[test]
    fn test_cooldown_suppresses_recrossing() {
        let mut monitor = monitor(10);
        let notifier = RecordingNotifier::default();

        assert_eq!(monitor.observe(50.0, 40.0, 1, &notifier), CrossingOutcome::Delivered);
        assert_eq!(monitor.observe(30.0, 40.0, 2, &notifier), CrossingOutcome::Quiet);
        assert_eq!(monitor.observe(50.0, 40.0, 3, &notifier), CrossingOutcome::Suppressed);
        assert_eq!(monitor.observe(30.0, 40.0, 10, &notifier), CrossingOutcome::Quiet);
        assert_eq!(monitor.observe(50.0, 40.0, 11, &notifier), CrossingOutcome::Delivered);
        assert_eq!(notifier.messages.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_delivery_is_counted() {
        let mut monitor = monitor(0);
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };

        assert_eq!(monitor.observe(90.0, 40.0, 1, &notifier), CrossingOutcome::Failed);
        assert_eq!(monitor.failures(), 1);
    }

    #[test]
    fn test_reset_rearms_first_crossing() {
        let mut monitor = monitor(100);
        let notifier = LogNotifier;

        assert_eq!(monitor.observe(50.0, 40.0, 1, &notifier), CrossingOutcome::Delivered);
        monitor.reset();
        assert_eq!(monitor.observe(50.0, 40.0, 2, &notifier), CrossingOutcome::Delivered);
    }
}
