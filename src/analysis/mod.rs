// Analysis module - signal processing core
//
// Data flow for one frame:
//   raw samples -> RecursiveFilter (optional, per channel)
//               -> SpectralAnalyzer -> BandPowerSet
//               -> AttentionScorer  -> smoothed score
//
// Nothing in here spawns threads or touches I/O; the pipeline and
// calibration modules drive these components.

pub mod bands;
pub mod fft;
pub mod filter;
pub mod scorer;
pub mod spectral;

pub use bands::{BandConfig, BandDefinition, BandPower, BandPowerSet, BandRole, BandRoles};
pub use filter::{ChannelId, ChannelState, RecursiveFilter};
pub use scorer::{AttentionScorer, ScoreSnapshot, MAX_SCORE};
pub use spectral::{SpectralAnalyzer, DEFAULT_FRAME_LEN};
