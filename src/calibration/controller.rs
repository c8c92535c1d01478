// CalibrationController - owns the threshold and runs calibration windows
//
// One controller per device. The persistence store and the clock are
// injected; frames and scoring come in per run, so a calibration drives
// the same scorer (and smoothing history) as live monitoring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::acquisition::FrameSource;
use crate::calibration::clock::Clock;
use crate::calibration::procedure::{CalibrationParams, CalibrationProcedure};
use crate::calibration::progress::{CalibrationPhase, CalibrationProgress};
use crate::calibration::state::{CalibrationState, LoadSource};
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};
use crate::pipeline::FrameScorer;
use crate::store::PreferenceStore;
use crate::telemetry::{self, DiagnosticError};

/// Capacity of the progress broadcast channel
pub const PROGRESS_CHANNEL_CAPACITY: usize = 32;

/// Cancels the calibration run in progress, or the next one to start
///
/// The request stays pending until a run observes it, so cancelling right
/// after `spawn_calibration` cannot be lost.
#[derive(Debug, Clone)]
pub struct CalibrationHandle {
    cancel: Arc<AtomicBool>,
}

impl CalibrationHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Returns the phase to Idle and consumes any cancel request however a
/// run ends, panics included
struct RunGuard<'a> {
    phase: &'a Mutex<CalibrationPhase>,
    cancel: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancel.store(false, Ordering::SeqCst);
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = CalibrationPhase::Idle;
    }
}

/// Threshold owner and calibration driver
pub struct CalibrationController {
    store: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    config: CalibrationConfig,
    band_config_version: u32,
    state: RwLock<CalibrationState>,
    phase: Mutex<CalibrationPhase>,
    cancel: Arc<AtomicBool>,
    progress_tx: broadcast::Sender<CalibrationProgress>,
}

impl CalibrationController {
    /// Create a controller holding the default threshold
    ///
    /// Call `load_calibration` to pick up a persisted value.
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        clock: Arc<dyn Clock>,
        config: CalibrationConfig,
        band_config_version: u32,
    ) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        let state = CalibrationState::new_default(config.default_threshold, band_config_version);
        Self {
            store,
            clock,
            config,
            band_config_version,
            state: RwLock::new(state),
            phase: Mutex::new(CalibrationPhase::Idle),
            cancel: Arc::new(AtomicBool::new(false)),
            progress_tx,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Current threshold
    pub fn get_threshold(&self) -> f32 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .threshold
    }

    /// Copy of the full calibration state
    pub fn state(&self) -> CalibrationState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `score` is above the current threshold
    pub fn is_attentive(&self, score: f32) -> bool {
        score > self.get_threshold()
    }

    pub fn phase(&self) -> CalibrationPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the threshold and persist it before returning
    ///
    /// On a write failure the previous threshold stays in effect.
    pub fn set_threshold(&self, threshold: f32) -> Result<(), CalibrationError> {
        if !threshold.is_finite() {
            let err = CalibrationError::InvalidParameters {
                reason: format!("threshold must be finite, got {}", threshold),
            };
            log_calibration_error(&err, "set_threshold");
            return Err(err);
        }

        let mut state_guard = self.write_state()?;
        let next = CalibrationState::calibrated(threshold, self.band_config_version);
        self.persist(&next, "set_threshold")?;
        *state_guard = next;

        log::info!("[Calibration] Threshold set to {:.2}", threshold);
        Ok(())
    }

    /// Read the persisted threshold, falling back to the default
    ///
    /// Read failures and a band layout mismatch are not errors; they are
    /// logged and the default threshold is used.
    pub fn load_calibration(&self) -> Result<f32, CalibrationError> {
        let (loaded, source) = CalibrationState::load(
            self.store.as_ref(),
            self.config.default_threshold,
            self.band_config_version,
        );

        match &source {
            LoadSource::Stored => {
                log::info!("[Calibration] Loaded threshold {:.2}", loaded.threshold)
            }
            LoadSource::Default => log::info!(
                "[Calibration] No stored threshold, using default {:.2}",
                loaded.threshold
            ),
            LoadSource::ReadFailed(err) => {
                log::warn!(
                    "[Calibration] Failed to read threshold: {}. Using default {:.2}",
                    err,
                    loaded.threshold
                );
                telemetry::hub().record_persistence_fallback("load_calibration", loaded.threshold);
            }
            LoadSource::VersionMismatch { stored } => {
                log::warn!(
                    "[Calibration] Stored threshold belongs to band layout v{}, expected v{}. Using default {:.2}",
                    stored,
                    self.band_config_version,
                    loaded.threshold
                );
                telemetry::hub().record_persistence_fallback("load_calibration", loaded.threshold);
            }
        }

        *self.write_state().inspect_err(|err| {
            log_calibration_error(err, "load_calibration");
        })? = loaded;
        Ok(loaded.threshold)
    }

    /// Persist the current threshold
    pub fn save_calibration(&self) -> Result<(), CalibrationError> {
        let state = self.state();
        self.persist(&state, "save_calibration")
    }

    /// Receiver for progress of every run started from now on
    pub fn subscribe_progress(&self) -> broadcast::Receiver<CalibrationProgress> {
        self.progress_tx.subscribe()
    }

    pub fn cancel_handle(&self) -> CalibrationHandle {
        CalibrationHandle {
            cancel: Arc::clone(&self.cancel),
        }
    }

    /// Calibrate with the configured duration, sample period and factor
    pub fn calibrate(
        &self,
        scorer: &mut dyn FrameScorer,
        source: &mut dyn FrameSource,
    ) -> Result<f32, CalibrationError> {
        let params = CalibrationParams::from_config(&self.config).inspect_err(|err| {
            log_calibration_error(err, "calibrate");
        })?;
        self.calibrate_with(params, scorer, source)
    }

    /// Score frames for `duration`, pausing `sample_period` between them
    pub fn calibrate_for(
        &self,
        duration: Duration,
        sample_period: Duration,
        scorer: &mut dyn FrameScorer,
        source: &mut dyn FrameSource,
    ) -> Result<f32, CalibrationError> {
        let params = CalibrationParams::new(duration, sample_period, self.config.factor)
            .inspect_err(|err| {
                log_calibration_error(err, "calibrate");
            })?;
        self.calibrate_with(params, scorer, source)
    }

    /// Run one calibration window and persist the derived threshold
    ///
    /// The previous threshold is left in place unless the whole run,
    /// persistence included, succeeds.
    pub fn calibrate_with(
        &self,
        params: CalibrationParams,
        scorer: &mut dyn FrameScorer,
        source: &mut dyn FrameSource,
    ) -> Result<f32, CalibrationError> {
        let _guard = self.begin_run().inspect_err(|err| {
            log_calibration_error(err, "calibrate");
        })?;

        log::info!(
            "[Calibration] Starting: duration={:?}, sample_period={:?}, factor={}",
            params.duration,
            params.sample_period,
            params.factor
        );

        let result = self.run_window(params, scorer, source);
        if let Err(err) = &result {
            log_calibration_error(err, "calibrate");
            if !matches!(err, CalibrationError::Cancelled) {
                telemetry::hub().record_error(DiagnosticError::Calibration, err.to_string());
            }
        }
        result
    }

    fn run_window(
        &self,
        params: CalibrationParams,
        scorer: &mut dyn FrameScorer,
        source: &mut dyn FrameSource,
    ) -> Result<f32, CalibrationError> {
        let mut procedure = CalibrationProcedure::new(params);
        let log_every = self.config.progress_every_n.max(1);
        let start = self.clock.now();

        loop {
            let elapsed = self.clock.now().saturating_duration_since(start);
            if !procedure.window_open(elapsed) {
                break;
            }
            if self.cancel.load(Ordering::SeqCst) {
                log::info!(
                    "[Calibration] Cancelled after {} samples; discarding",
                    procedure.samples()
                );
                return Err(CalibrationError::Cancelled);
            }

            if let Some(frame) = source.next_frame() {
                let score = scorer.score_frame(&frame)?;
                procedure.record(score);

                if u64::from(procedure.samples()) % log_every == 0 {
                    log::debug!(
                        "[Calibration] {} samples, current score {:.2}, running mean {:.2}",
                        procedure.samples(),
                        score,
                        procedure.mean().unwrap_or(0.0)
                    );
                }
            }

            self.publish(procedure.progress(elapsed));
            self.clock.sleep(params.sample_period);
        }

        let elapsed = self.clock.now().saturating_duration_since(start);
        let finalized = procedure.finalize();
        self.set_phase(procedure.phase());
        self.publish(procedure.progress(elapsed));
        let threshold = finalized?;

        let mut state_guard = self.write_state()?;
        let next = CalibrationState::calibrated(threshold, self.band_config_version);
        self.persist(&next, "calibrate")?;
        *state_guard = next;
        drop(state_guard);

        log::info!(
            "[Calibration] Complete: threshold {:.2} from {} samples (mean {:.2})",
            threshold,
            procedure.samples(),
            procedure.mean().unwrap_or(0.0)
        );
        telemetry::hub().record_calibration(
            threshold,
            procedure.samples(),
            elapsed.as_millis() as u64,
        );
        Ok(threshold)
    }

    // ========================================================================
    // HELPER METHODS - Lock management and persistence
    // ========================================================================

    fn begin_run(&self) -> Result<RunGuard<'_>, CalibrationError> {
        let mut phase = self.lock_phase()?;
        if *phase != CalibrationPhase::Idle {
            return Err(CalibrationError::AlreadyInProgress);
        }
        *phase = CalibrationPhase::Collecting;
        Ok(RunGuard {
            phase: &self.phase,
            cancel: &self.cancel,
        })
    }

    fn set_phase(&self, next: CalibrationPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn publish(&self, progress: CalibrationProgress) {
        // No subscribers is not an error
        let _ = self.progress_tx.send(progress);
    }

    fn persist(&self, state: &CalibrationState, operation: &str) -> Result<(), CalibrationError> {
        state.save(self.store.as_ref()).map_err(|store_err| {
            let err = CalibrationError::persistence(operation, &store_err);
            log_calibration_error(&err, operation);
            telemetry::hub().record_error(DiagnosticError::Persistence, err.to_string());
            err
        })
    }

    fn lock_phase(&self) -> Result<MutexGuard<'_, CalibrationPhase>, CalibrationError> {
        self.phase.lock().map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, CalibrationState>, CalibrationError> {
        self.state
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)
    }
}

/// Run a calibration on its own thread
///
/// The scorer and source move onto the worker; the controller stays shared
/// so other threads can cancel, watch progress or read the threshold.
pub fn spawn_calibration<S, F>(
    controller: Arc<CalibrationController>,
    mut scorer: S,
    mut source: F,
) -> JoinHandle<Result<f32, CalibrationError>>
where
    S: FrameScorer + Send + 'static,
    F: FrameSource + 'static,
{
    thread::spawn(move || controller.calibrate(&mut scorer, &mut source))
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
