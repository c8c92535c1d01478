// Attention Monitor Core - EEG attention scoring engine
// Frame filtering, spectral band powers, ratio scoring and threshold calibration

// Module declarations
pub mod acquisition;
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod notify;
pub mod pipeline;
pub mod store;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{AttentionScorer, BandConfig, BandPowerSet, RecursiveFilter, SpectralAnalyzer};
pub use calibration::{CalibrationController, CalibrationState};
pub use config::AppConfig;
pub use pipeline::{AttentionPipeline, FrameReport};
pub use store::PreferenceStore;
