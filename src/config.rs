//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Filter noise, band
//! layout, scoring weights and calibration timing can all be adjusted
//! via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::bands::{BandConfig, BandDefinition, BandRoles};
use crate::analysis::filter;
use crate::error::SignalError;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub spectral: SpectralConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Recursive filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Number of independent channels
    pub channels: usize,
    /// Process noise (q), must be > 0
    pub process_noise: f32,
    /// Measurement noise (r), must be > 0
    pub measurement_noise: f32,
    /// Error covariance each channel starts from
    pub initial_covariance: f32,
    /// Channel whose filter pre-conditions frames before spectral analysis
    #[serde(default)]
    pub condition_channel: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            channels: 3,
            process_noise: 0.1,
            measurement_noise: 0.1,
            initial_covariance: 1.0,
            condition_channel: None,
        }
    }
}

/// Spectral analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Samples per frame (N)
    pub frame_len: usize,
    /// Sampling rate in Hz
    pub sample_rate_hz: f32,
    /// Ordered band layout
    pub bands: Vec<BandDefinition>,
    /// Bumped whenever `bands` changes; persisted with the threshold
    pub band_config_version: u32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        let bands = BandConfig::default();
        Self {
            frame_len: 128,
            sample_rate_hz: 512.0,
            bands: bands.definitions().to_vec(),
            band_config_version: bands.version(),
        }
    }
}

impl SpectralConfig {
    /// Build a validated band configuration from this section
    pub fn band_config(&self) -> Result<BandConfig, SignalError> {
        BandConfig::new(
            self.bands.clone(),
            self.sample_rate_hz,
            self.band_config_version,
        )
    }
}

/// Attention scoring parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight of the beta / (theta + alpha) engagement ratio
    pub engagement_weight: f32,
    /// Weight of the delta suppression (wakefulness) ratio
    pub wakefulness_weight: f32,
    /// Added to every denominator
    pub epsilon: f32,
    /// Moving-average depth
    pub history_len: usize,
    /// Band name used for each formula role
    #[serde(default)]
    pub roles: BandRoles,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            engagement_weight: 0.6,
            wakefulness_weight: 0.4,
            epsilon: 1e-6,
            history_len: 10,
            roles: BandRoles::default(),
        }
    }
}

/// Calibration procedure configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Length of the baseline recording
    pub duration_secs: u64,
    /// Pause between frames (cooperative sleep)
    pub sample_period_ms: u64,
    /// Multiplier applied to the mean score
    pub factor: f32,
    /// Threshold used when nothing (valid) is persisted
    pub default_threshold: f32,
    /// Log running statistics every N samples
    pub progress_every_n: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            sample_period_ms: 100,
            factor: 0.7,
            default_threshold: 40.0,
            progress_every_n: 10,
        }
    }
}

impl CalibrationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }
}

/// Threshold notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// `{score}` and `{threshold}` are substituted
    pub message_template: String,
    /// Minimum frames between two notifications
    pub cooldown_frames: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            message_template: "Attention {score} above threshold {threshold}".to_string(),
            cooldown_frames: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check every invariant the pipeline relies on
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.filter.channels == 0 {
            return Err(SignalError::InvalidChannel {
                channel: 0,
                channels: 0,
            });
        }
        if let Some(channel) = self.filter.condition_channel {
            if channel >= self.filter.channels {
                return Err(SignalError::InvalidChannel {
                    channel,
                    channels: self.filter.channels,
                });
            }
        }
        filter::validate_params(&self.filter)?;
        if self.spectral.frame_len < 2 {
            return Err(SignalError::InsufficientSamples {
                required: 2,
                provided: self.spectral.frame_len,
            });
        }
        if self.scoring.history_len == 0 {
            return Err(SignalError::InsufficientSamples {
                required: 1,
                provided: 0,
            });
        }
        let bands = self.spectral.band_config()?;
        self.scoring.roles.validate(&bands)?;
        Ok(())
    }
}
