// Spectral module - band power extraction from a sample frame
//
// Steps per frame:
// 1. Apply Hamming window
// 2. Forward FFT
// 3. Magnitude for bins [0, N/2)
// 4. For each band: bin = freq * N / sample_rate (truncating), sum the
//    magnitudes over the inclusive bin range clipped to [0, N/2), then
//    divide by (max_bin - min_bin + 1)
//
// The analyzer holds no per-frame state: identical frame and band
// configuration always yield the identical BandPowerSet.

use crate::analysis::bands::{BandConfig, BandDefinition, BandPower, BandPowerSet};
use crate::analysis::fft::FftProcessor;
use crate::error::SignalError;

/// Default frame length (N)
pub const DEFAULT_FRAME_LEN: usize = 128;

/// Converts fixed-length frames into per-band power values
pub struct SpectralAnalyzer {
    fft: FftProcessor,
    bands: BandConfig,
    /// Precomputed (min_bin, max_bin) per band, unclipped
    bin_ranges: Vec<(usize, usize)>,
}

impl SpectralAnalyzer {
    /// Create an analyzer for `frame_len`-sample frames and the given bands
    ///
    /// The sampling rate is taken from the band configuration.
    pub fn new(frame_len: usize, bands: BandConfig) -> Self {
        let sample_rate_hz = bands.sample_rate_hz();
        let bin_ranges = bands
            .definitions()
            .iter()
            .map(|band| bin_range(band, frame_len, sample_rate_hz))
            .collect();

        Self {
            fft: FftProcessor::new(frame_len),
            bands,
            bin_ranges,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.fft.fft_size()
    }

    pub fn bands(&self) -> &BandConfig {
        &self.bands
    }

    /// Compute band powers for one frame
    ///
    /// Frames shorter than the configured length are rejected. Longer
    /// frames are read up to the configured length only.
    pub fn analyze(&self, frame: &[f32]) -> Result<BandPowerSet, SignalError> {
        let spectrum = self.magnitude_spectrum(frame)?;
        Ok(self.band_powers(&spectrum))
    }

    /// Windowed magnitude spectrum for bins `[0, N/2)`
    pub fn magnitude_spectrum(&self, frame: &[f32]) -> Result<Vec<f32>, SignalError> {
        let required = self.frame_len();
        if frame.len() < required {
            return Err(SignalError::InsufficientSamples {
                required,
                provided: frame.len(),
            });
        }
        if frame.len() > required {
            log::debug!(
                "[Spectral] Frame of {} samples truncated to {}",
                frame.len(),
                required
            );
        }

        Ok(self.fft.compute_magnitude_spectrum(&frame[..required]))
    }

    /// Integrate a magnitude spectrum into band powers
    pub fn band_powers(&self, spectrum: &[f32]) -> BandPowerSet {
        let powers = self
            .bands
            .definitions()
            .iter()
            .zip(self.bin_ranges.iter())
            .map(|(band, &(min_bin, max_bin))| BandPower {
                name: band.name.clone(),
                power: integrate(spectrum, min_bin, max_bin),
            })
            .collect();

        BandPowerSet::new(powers)
    }
}

/// Map a band to its (unclipped) inclusive bin range
fn bin_range(band: &BandDefinition, frame_len: usize, sample_rate_hz: f32) -> (usize, usize) {
    let to_bin = |freq: f32| (freq * frame_len as f32 / sample_rate_hz) as usize;
    let min_bin = to_bin(band.min_hz);
    let max_bin = to_bin(band.max_hz).max(min_bin);
    (min_bin, max_bin)
}

/// Mean magnitude over `[min_bin, max_bin]` clipped to the spectrum
///
/// The divisor is the unclipped width and is never below 1.
fn integrate(spectrum: &[f32], min_bin: usize, max_bin: usize) -> f32 {
    let sum: f32 = spectrum
        .iter()
        .take(max_bin.saturating_add(1))
        .skip(min_bin)
        .sum();
    let width = (max_bin - min_bin + 1) as f32;
    sum / width
}

#[cfg(test)]
#[path = "spectral_tests.rs"]
mod tests;
