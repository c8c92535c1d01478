// SyntheticSource - seeded sine mixtures standing in for a headset
//
// Each frame is the sum of the configured tones plus uniform noise. Phase is
// carried across frames so consecutive frames form one continuous signal.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::acquisition::FrameSource;

/// One sinusoidal component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub freq_hz: f32,
    pub amplitude: f32,
}

impl ToneSpec {
    pub fn new(freq_hz: f32, amplitude: f32) -> Self {
        Self { freq_hz, amplitude }
    }
}

/// Deterministic generator of EEG-like frames
pub struct SyntheticSource {
    rng: StdRng,
    tones: Vec<ToneSpec>,
    noise_amplitude: f32,
    sample_rate_hz: f32,
    frame_len: usize,
    sample_index: u64,
    /// Frames left to emit; `None` means unlimited
    remaining: Option<usize>,
}

impl SyntheticSource {
    pub fn new(seed: u64, frame_len: usize, sample_rate_hz: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            tones: Vec::new(),
            noise_amplitude: 0.0,
            sample_rate_hz,
            frame_len,
            sample_index: 0,
            remaining: None,
        }
    }

    /// Alert-looking default: strong 20 Hz beta over weaker alpha and delta
    pub fn focused(seed: u64) -> Self {
        Self::new(seed, 128, 512.0)
            .with_tone(ToneSpec::new(20.0, 4.0))
            .with_tone(ToneSpec::new(10.0, 1.0))
            .with_tone(ToneSpec::new(2.0, 0.5))
            .with_noise(0.2)
    }

    /// Drowsy-looking default: dominant delta and theta
    pub fn relaxed(seed: u64) -> Self {
        Self::new(seed, 128, 512.0)
            .with_tone(ToneSpec::new(2.0, 4.0))
            .with_tone(ToneSpec::new(6.0, 2.0))
            .with_tone(ToneSpec::new(20.0, 0.3))
            .with_noise(0.2)
    }

    pub fn with_tone(mut self, tone: ToneSpec) -> Self {
        self.tones.push(tone);
        self
    }

    pub fn with_noise(mut self, amplitude: f32) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    /// Stop after `frames` frames
    pub fn with_limit(mut self, frames: usize) -> Self {
        self.remaining = Some(frames);
        self
    }

    fn sample_at(&mut self, index: u64) -> f32 {
        let t = index as f32 / self.sample_rate_hz;
        let tonal: f32 = self
            .tones
            .iter()
            .map(|tone| tone.amplitude * (2.0 * std::f32::consts::PI * tone.freq_hz * t).sin())
            .sum();
        let noise = if self.noise_amplitude > 0.0 {
            self.rng
                .gen_range(-self.noise_amplitude..=self.noise_amplitude)
        } else {
            0.0
        };
        tonal + noise
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Option<Vec<f32>> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let start = self.sample_index;
        let frame = (0..self.frame_len as u64)
            .map(|offset| self.sample_at(start + offset))
            .collect();
        self.sample_index += self.frame_len as u64;
        Some(frame)
    }
}
