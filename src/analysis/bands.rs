// Band layout and per-frame band power containers
//
// A BandConfig is the ordered, validated list of frequency bands the
// SpectralAnalyzer integrates over. The scoring formula addresses bands by
// semantic role (Delta/Theta/Alpha/Beta); BandRoles maps each role to a
// configured band name so alternative layouts can reuse the same formula.

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Named frequency range in Hz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub name: String,
    pub min_hz: f32,
    pub max_hz: f32,
}

impl BandDefinition {
    pub fn new(name: impl Into<String>, min_hz: f32, max_hz: f32) -> Self {
        Self {
            name: name.into(),
            min_hz,
            max_hz,
        }
    }
}

/// Version of the built-in Delta/Theta/Alpha/Beta layout
pub const DEFAULT_BAND_CONFIG_VERSION: u32 = 1;

/// Default sampling rate the built-in layout is validated against
pub const DEFAULT_SAMPLE_RATE_HZ: f32 = 512.0;

/// Validated, immutable band layout
#[derive(Debug, Clone, PartialEq)]
pub struct BandConfig {
    bands: Vec<BandDefinition>,
    sample_rate_hz: f32,
    version: u32,
}

impl BandConfig {
    /// Validate and build a band layout
    ///
    /// Every band needs `0 <= min_hz < max_hz <= sample_rate_hz / 2` and a
    /// unique, non-empty name.
    pub fn new(
        bands: Vec<BandDefinition>,
        sample_rate_hz: f32,
        version: u32,
    ) -> Result<Self, SignalError> {
        if bands.is_empty() {
            return Err(SignalError::InvalidBand {
                name: String::new(),
                reason: "band configuration is empty".to_string(),
            });
        }
        if !(sample_rate_hz > 0.0) {
            return Err(SignalError::InvalidBand {
                name: String::new(),
                reason: format!("sample rate {} Hz must be > 0", sample_rate_hz),
            });
        }

        let nyquist = sample_rate_hz / 2.0;
        for (i, band) in bands.iter().enumerate() {
            let invalid = |reason: String| SignalError::InvalidBand {
                name: band.name.clone(),
                reason,
            };

            if band.name.is_empty() {
                return Err(invalid(format!("band {} has no name", i)));
            }
            if bands[..i].iter().any(|other| other.name == band.name) {
                return Err(invalid("duplicate band name".to_string()));
            }
            if !(band.min_hz >= 0.0) || !(band.min_hz < band.max_hz) {
                return Err(invalid(format!(
                    "range {}..{} Hz must satisfy 0 <= min < max",
                    band.min_hz, band.max_hz
                )));
            }
            if band.max_hz > nyquist {
                return Err(invalid(format!(
                    "max {} Hz exceeds Nyquist {} Hz",
                    band.max_hz, nyquist
                )));
            }
        }

        Ok(Self {
            bands,
            sample_rate_hz,
            version,
        })
    }

    pub fn definitions(&self) -> &[BandDefinition] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.iter().any(|band| band.name == name)
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            bands: vec![
                BandDefinition::new("Delta", 0.5, 4.0),
                BandDefinition::new("Theta", 4.0, 8.0),
                BandDefinition::new("Alpha", 8.0, 13.0),
                BandDefinition::new("Beta", 13.0, 30.0),
            ],
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            version: DEFAULT_BAND_CONFIG_VERSION,
        }
    }
}

/// Semantic role a band plays in the attention formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandRole {
    Delta,
    Theta,
    Alpha,
    Beta,
}

impl BandRole {
    pub const ALL: [BandRole; 4] = [
        BandRole::Delta,
        BandRole::Theta,
        BandRole::Alpha,
        BandRole::Beta,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            BandRole::Delta => "Delta",
            BandRole::Theta => "Theta",
            BandRole::Alpha => "Alpha",
            BandRole::Beta => "Beta",
        }
    }
}

/// Which configured band fills each formula role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRoles {
    pub delta: String,
    pub theta: String,
    pub alpha: String,
    pub beta: String,
}

impl BandRoles {
    pub fn name_for(&self, role: BandRole) -> &str {
        match role {
            BandRole::Delta => &self.delta,
            BandRole::Theta => &self.theta,
            BandRole::Alpha => &self.alpha,
            BandRole::Beta => &self.beta,
        }
    }

    /// Check every role resolves to a band in `config`
    pub fn validate(&self, config: &BandConfig) -> Result<(), SignalError> {
        for role in BandRole::ALL {
            let name = self.name_for(role);
            if !config.contains(name) {
                return Err(SignalError::InvalidBand {
                    name: name.to_string(),
                    reason: format!("no configured band for role {:?}", role),
                });
            }
        }
        Ok(())
    }
}

impl Default for BandRoles {
    fn default() -> Self {
        Self {
            delta: BandRole::Delta.canonical_name().to_string(),
            theta: BandRole::Theta.canonical_name().to_string(),
            alpha: BandRole::Alpha.canonical_name().to_string(),
            beta: BandRole::Beta.canonical_name().to_string(),
        }
    }
}

/// Power of a single band for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPower {
    pub name: String,
    pub power: f32,
}

/// Per-frame band powers, one entry per configured band, in config order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BandPowerSet {
    powers: Vec<BandPower>,
}

impl BandPowerSet {
    pub fn new(powers: Vec<BandPower>) -> Self {
        Self { powers }
    }

    /// Build from `(name, power)` pairs
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        Self {
            powers: pairs
                .into_iter()
                .map(|(name, power)| BandPower {
                    name: name.to_string(),
                    power,
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.powers
            .iter()
            .find(|band| band.name == name)
            .map(|band| band.power)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandPower> {
        self.powers.iter()
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn total(&self) -> f32 {
        self.powers.iter().map(|band| band.power).sum()
    }

    /// Each band as a percentage of the total power
    ///
    /// All zeros when the total is zero.
    pub fn relative(&self) -> BandPowerSet {
        let total = self.total();
        BandPowerSet {
            powers: self
                .powers
                .iter()
                .map(|band| BandPower {
                    name: band.name.clone(),
                    power: if total > 0.0 {
                        band.power / total * 100.0
                    } else {
                        0.0
                    },
                })
                .collect(),
        }
    }
}
