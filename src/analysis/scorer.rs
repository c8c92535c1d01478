// AttentionScorer - band power ratios combined into a smoothed 0-100 score
//
// raw = clamp((w1 * beta / (theta + alpha + eps)
//            + w2 * (1 - delta / (theta + alpha + beta + eps))) * 100, 0, 100)
//
// The raw score is pushed into a fixed-depth round-robin history that starts
// zeroed; the returned score is the plain mean of every slot, so a step in
// the input takes `history_len` calls to fully show.

use serde::{Deserialize, Serialize};

use crate::analysis::bands::{BandConfig, BandPowerSet, BandRole};
use crate::config::ScoringConfig;
use crate::error::SignalError;

/// Upper bound of the attention scale
pub const MAX_SCORE: f32 = 100.0;

/// Copy of the scorer's most recent output
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    /// Frames scored so far (1-based sequence of this snapshot)
    pub sequence: u64,
    /// Clamped instantaneous score
    pub raw: f32,
    /// Moving average over the history
    pub smoothed: f32,
}

/// Ratio-based attention scorer with fixed-depth smoothing
#[derive(Debug, Clone)]
pub struct AttentionScorer {
    config: ScoringConfig,
    history: Vec<f32>,
    next_slot: usize,
    last: ScoreSnapshot,
}

impl AttentionScorer {
    /// Create a scorer; `history_len` of 0 is treated as 1
    pub fn new(config: ScoringConfig) -> Self {
        let depth = config.history_len.max(1);
        Self {
            config,
            history: vec![0.0; depth],
            next_slot: 0,
            last: ScoreSnapshot::default(),
        }
    }

    /// Create a scorer after checking every role maps onto `bands`
    pub fn for_bands(bands: &BandConfig, config: ScoringConfig) -> Result<Self, SignalError> {
        config.roles.validate(bands)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Instantaneous clamped score; does not touch the history
    pub fn raw_score(&self, powers: &BandPowerSet) -> f32 {
        let delta = self.role_power(powers, BandRole::Delta);
        let theta = self.role_power(powers, BandRole::Theta);
        let alpha = self.role_power(powers, BandRole::Alpha);
        let beta = self.role_power(powers, BandRole::Beta);
        let eps = self.config.epsilon;

        let engagement = beta / (theta + alpha + eps);
        let wakefulness = 1.0 - delta / (theta + alpha + beta + eps);
        let combined = (self.config.engagement_weight * engagement
            + self.config.wakefulness_weight * wakefulness)
            * MAX_SCORE;

        if combined.is_nan() {
            return 0.0;
        }
        combined.clamp(0.0, MAX_SCORE)
    }

    /// Score a frame's band powers and return the smoothed value
    pub fn score(&mut self, powers: &BandPowerSet) -> f32 {
        let raw = self.raw_score(powers);
        self.push(raw)
    }

    /// Push an already-clamped score into the history and return the mean
    pub fn push(&mut self, raw: f32) -> f32 {
        self.history[self.next_slot] = raw;
        self.next_slot = (self.next_slot + 1) % self.history.len();

        let smoothed = self.history.iter().sum::<f32>() / self.history.len() as f32;
        self.last = ScoreSnapshot {
            sequence: self.last.sequence + 1,
            raw,
            smoothed,
        };
        smoothed
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        self.last
    }

    pub fn history(&self) -> &[f32] {
        &self.history
    }

    /// Zero the history and restart the sequence
    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|slot| *slot = 0.0);
        self.next_slot = 0;
        self.last = ScoreSnapshot::default();
    }

    fn role_power(&self, powers: &BandPowerSet, role: BandRole) -> f32 {
        let name = self.config.roles.name_for(role);
        match powers.get(name) {
            Some(power) if power.is_finite() && power >= 0.0 => power,
            Some(power) => {
                log::debug!("[Scorer] Ignoring non-finite power {} for {}", power, name);
                0.0
            }
            None => {
                log::debug!("[Scorer] Band {} missing from power set", name);
                0.0
            }
        }
    }
}

impl Default for AttentionScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
#[path = "scorer_tests.rs"]
mod tests;
