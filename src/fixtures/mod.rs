//! Recorded-signal fixtures for the CLI and integration tests.
//!
//! Recordings are mono WAV files. `WavFrameSource` chunks one into
//! consecutive frames so a recording can stand in for a live headset.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::acquisition::{FrameSource, VecSource};
use crate::telemetry::{self, DiagnosticError};

/// Decoded mono recording
#[derive(Debug, Clone, PartialEq)]
pub struct WavRecording {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Frames read from a mono WAV file
pub struct WavFrameSource {
    frames: VecSource,
    sample_rate: u32,
}

impl WavFrameSource {
    /// Load `path` and split it into `frame_len`-sample frames
    ///
    /// A trailing partial frame is dropped.
    pub fn open<P: AsRef<Path>>(path: P, frame_len: usize) -> Result<Self> {
        let recording = read_wav(path.as_ref()).inspect_err(|err| {
            telemetry::hub().record_error(DiagnosticError::FixtureLoad, err.to_string());
        })?;
        let frames = VecSource::from_samples(&recording.samples, frame_len);
        log::info!(
            "[Fixtures] Loaded {:?}: {} samples at {} Hz, {} frames",
            path.as_ref(),
            recording.samples.len(),
            recording.sample_rate,
            frames.remaining()
        );
        Ok(Self {
            frames,
            sample_rate: recording.sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn remaining(&self) -> usize {
        self.frames.remaining()
    }
}

impl FrameSource for WavFrameSource {
    fn next_frame(&mut self) -> Option<Vec<f32>> {
        self.frames.next_frame()
    }
}

/// Decode a mono WAV file to f32 samples in [-1, 1]
pub fn read_wav(path: &Path) -> Result<WavRecording> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow!(
            "Recording {} must be mono (found {} channels)",
            path.display(),
            spec.channels
        ));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    Ok(WavRecording {
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Write `samples` as a mono 32-bit float WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
