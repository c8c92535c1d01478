// RecursiveFilter - per-channel scalar Kalman smoother
//
// Identity state transition (the true value is assumed constant between
// samples):
//   p' = p + q
//   k  = p' / (p' + r)
//   x  = x + k * (z - x)
//   p  = (1 - k) * p'
//
// Channels never share state, so every channel can be driven from a
// different thread as long as each owns its own ChannelState.

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::error::SignalError;

/// Validated channel index for a specific filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(usize);

impl ChannelId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Estimate and error covariance for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub estimate: f32,
    pub covariance: f32,
    /// Gain applied by the most recent update
    pub gain: f32,
}

impl ChannelState {
    fn new(initial_covariance: f32) -> Self {
        Self {
            estimate: 0.0,
            covariance: initial_covariance,
            gain: 0.0,
        }
    }

    fn update(&mut self, measurement: f32, process_noise: f32, measurement_noise: f32) -> f32 {
        let predicted = self.covariance + process_noise;
        self.gain = predicted / (predicted + measurement_noise);
        self.estimate += self.gain * (measurement - self.estimate);
        self.covariance = (1.0 - self.gain) * predicted;
        self.estimate
    }
}

/// Multi-channel recursive noise filter
#[derive(Debug, Clone)]
pub struct RecursiveFilter {
    channels: Vec<ChannelState>,
    process_noise: f32,
    measurement_noise: f32,
    initial_covariance: f32,
}

impl RecursiveFilter {
    /// Create a filter for `config.channels` independent channels
    ///
    /// # Errors
    /// `DegenerateNoise` if either noise term is not strictly positive,
    /// `DegenerateCovariance` if the initial covariance is negative or NaN
    pub fn new(config: &FilterConfig) -> Result<Self, SignalError> {
        validate_params(config)?;
        Ok(Self {
            channels: vec![ChannelState::new(config.initial_covariance); config.channels],
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            initial_covariance: config.initial_covariance,
        })
    }

    /// Filter with q = r = 0.1 and unit initial covariance
    pub fn with_channels(channels: usize) -> Self {
        Self {
            channels: vec![ChannelState::new(1.0); channels],
            process_noise: 0.1,
            measurement_noise: 0.1,
            initial_covariance: 1.0,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Validate a channel index against this filter
    pub fn channel(&self, index: usize) -> Result<ChannelId, SignalError> {
        if index < self.channels.len() {
            Ok(ChannelId(index))
        } else {
            Err(SignalError::InvalidChannel {
                channel: index,
                channels: self.channels.len(),
            })
        }
    }

    /// Feed one measurement into `channel` and return the new estimate
    pub fn update(&mut self, measurement: f32, channel: usize) -> Result<f32, SignalError> {
        let channels = self.channels.len();
        let (q, r) = (self.process_noise, self.measurement_noise);
        let state = self
            .channels
            .get_mut(channel)
            .ok_or(SignalError::InvalidChannel { channel, channels })?;
        Ok(state.update(measurement, q, r))
    }

    /// Same as [`update`](Self::update) for a pre-validated channel
    pub fn update_channel(&mut self, measurement: f32, channel: ChannelId) -> Result<f32, SignalError> {
        self.update(measurement, channel.index())
    }

    /// Filter one sample per channel: `output[c] = update(input[c], c)`
    ///
    /// Both slices must hold exactly one value per configured channel.
    pub fn filter_eeg(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), SignalError> {
        let channels = self.channels.len();
        if input.len() != channels || output.len() != channels {
            // First index that cannot be paired with a configured channel
            let channel = if input.len() > channels || output.len() > channels {
                channels
            } else {
                input.len().min(output.len())
            };
            return Err(SignalError::InvalidChannel { channel, channels });
        }

        let (q, r) = (self.process_noise, self.measurement_noise);
        for ((state, &measurement), out) in self
            .channels
            .iter_mut()
            .zip(input.iter())
            .zip(output.iter_mut())
        {
            *out = state.update(measurement, q, r);
        }
        Ok(())
    }

    /// Run a whole frame through a single channel in place
    pub fn filter_frame(&mut self, samples: &mut [f32], channel: ChannelId) -> Result<(), SignalError> {
        let channels = self.channels.len();
        let (q, r) = (self.process_noise, self.measurement_noise);
        let state = self
            .channels
            .get_mut(channel.index())
            .ok_or(SignalError::InvalidChannel {
                channel: channel.index(),
                channels,
            })?;

        for sample in samples.iter_mut() {
            *sample = state.update(*sample, q, r);
        }
        Ok(())
    }

    /// Replace both noise terms for every channel
    ///
    /// # Errors
    /// `DegenerateNoise` if either value is not strictly positive; the
    /// previous parameters are kept
    pub fn set_parameters(
        &mut self,
        process_noise: f32,
        measurement_noise: f32,
    ) -> Result<(), SignalError> {
        validate_noise(process_noise, measurement_noise)?;
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
        Ok(())
    }

    pub fn parameters(&self) -> (f32, f32) {
        (self.process_noise, self.measurement_noise)
    }

    pub fn state(&self, channel: usize) -> Result<ChannelState, SignalError> {
        self.channels
            .get(channel)
            .copied()
            .ok_or(SignalError::InvalidChannel {
                channel,
                channels: self.channels.len(),
            })
    }

    pub fn estimate(&self, channel: usize) -> Result<f32, SignalError> {
        self.state(channel).map(|state| state.estimate)
    }

    pub fn covariance(&self, channel: usize) -> Result<f32, SignalError> {
        self.state(channel).map(|state| state.covariance)
    }

    /// Gain used by the last update on `channel` (0 before any update)
    pub fn gain(&self, channel: usize) -> Result<f32, SignalError> {
        self.state(channel).map(|state| state.gain)
    }

    /// Restore every channel to estimate 0 and the initial covariance
    pub fn reset(&mut self) {
        let initial = ChannelState::new(self.initial_covariance);
        self.channels.iter_mut().for_each(|state| *state = initial);
    }
}

/// Noise and initial covariance checks shared with `AppConfig::validate`
pub(crate) fn validate_params(config: &FilterConfig) -> Result<(), SignalError> {
    validate_noise(config.process_noise, config.measurement_noise)?;
    // A negative covariance would push the first gain below 0
    if !(config.initial_covariance >= 0.0) {
        return Err(SignalError::DegenerateCovariance {
            initial_covariance: config.initial_covariance,
        });
    }
    Ok(())
}

fn validate_noise(process_noise: f32, measurement_noise: f32) -> Result<(), SignalError> {
    // Written as negated comparisons so NaN is rejected too
    if !(process_noise > 0.0) || !(measurement_noise > 0.0) {
        return Err(SignalError::DegenerateNoise {
            process_noise,
            measurement_noise,
        });
    }
    Ok(())
}
