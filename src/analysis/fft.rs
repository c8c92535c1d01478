// FFT module - Fast Fourier Transform computation
//
// This module handles FFT computation with Hamming windowing to reduce
// spectral leakage. The magnitude spectrum is consumed by band power
// integration in the SpectralAnalyzer.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// FFT processor that computes magnitude spectra from fixed-length frames
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Hamming window (pre-computed)
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - Frame length (128 for the default EEG frame)
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window: hamming_window(fft_size),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Compute magnitude spectrum using FFT
    ///
    /// Applies the Hamming window, performs a forward FFT and returns
    /// `|X[k]|` for bins `[0, fft_size / 2)`.
    ///
    /// Only the first `fft_size` samples are read; callers are expected to
    /// reject short frames before getting here.
    pub fn compute_magnitude_spectrum(&self, frame: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.fft_size / 2].iter().map(|c| c.norm()).collect()
    }
}

/// Hamming window: `0.54 - 0.46 * cos(2*pi*i / (n - 1))`
pub fn hamming_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| 0.54 - 0.46 * ((2.0 * std::f32::consts::PI * i as f32) / denom).cos())
        .collect()
}
