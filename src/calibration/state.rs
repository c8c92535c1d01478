// CalibrationState - the persisted attention threshold
//
// The threshold is stored under "attention"/"threshold" next to the band
// layout version it was computed with. A threshold written before the
// version key existed is read as the default layout, which is the layout
// that produced it.

use serde::{Deserialize, Serialize};

use crate::analysis::bands::DEFAULT_BAND_CONFIG_VERSION;
use crate::error::StoreError;
use crate::store::{PreferenceStore, ATTENTION_NAMESPACE, BAND_VERSION_KEY, THRESHOLD_KEY};

/// Threshold separating attentive from baseline scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub threshold: f32,
    /// Band layout version the threshold belongs to
    pub band_config_version: u32,
    /// False while running on the default threshold
    pub is_calibrated: bool,
}

/// Where a loaded threshold came from
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    Stored,
    /// Nothing persisted yet
    Default,
    /// Store could not be read
    ReadFailed(StoreError),
    /// Stored threshold belongs to another band layout
    VersionMismatch { stored: u32 },
}

impl CalibrationState {
    pub fn new_default(default_threshold: f32, band_config_version: u32) -> Self {
        Self {
            threshold: default_threshold,
            band_config_version,
            is_calibrated: false,
        }
    }

    pub fn calibrated(threshold: f32, band_config_version: u32) -> Self {
        Self {
            threshold,
            band_config_version,
            is_calibrated: true,
        }
    }

    /// Read the persisted threshold for `expected_version`
    ///
    /// Never fails: read errors, a missing value and a version mismatch
    /// all yield the default state, with the reason in `LoadSource`.
    pub fn load(
        store: &dyn PreferenceStore,
        default_threshold: f32,
        expected_version: u32,
    ) -> (Self, LoadSource) {
        let fallback = Self::new_default(default_threshold, expected_version);

        let threshold = match store.get_float(ATTENTION_NAMESPACE, THRESHOLD_KEY, f32::NAN) {
            Ok(value) if value.is_finite() => value,
            Ok(_) => return (fallback, LoadSource::Default),
            Err(err) => return (fallback, LoadSource::ReadFailed(err)),
        };

        let stored_version = match store.get_float(
            ATTENTION_NAMESPACE,
            BAND_VERSION_KEY,
            DEFAULT_BAND_CONFIG_VERSION as f32,
        ) {
            Ok(value) if value.is_finite() && value >= 0.0 => value as u32,
            Ok(_) => DEFAULT_BAND_CONFIG_VERSION,
            Err(err) => return (fallback, LoadSource::ReadFailed(err)),
        };

        if stored_version != expected_version {
            return (
                fallback,
                LoadSource::VersionMismatch {
                    stored: stored_version,
                },
            );
        }

        (Self::calibrated(threshold, expected_version), LoadSource::Stored)
    }

    /// Write version then threshold; returns once both are stored
    ///
    /// The threshold is the last write, so a failure never leaves a new
    /// threshold behind. If the threshold write fails after the version
    /// changed, the previous version is written back.
    pub fn save(&self, store: &dyn PreferenceStore) -> Result<(), StoreError> {
        let version = self.band_config_version as f32;
        let previous_version = store
            .get_float(
                ATTENTION_NAMESPACE,
                BAND_VERSION_KEY,
                DEFAULT_BAND_CONFIG_VERSION as f32,
            )
            .ok();

        store.put_float(ATTENTION_NAMESPACE, BAND_VERSION_KEY, version)?;
        store
            .put_float(ATTENTION_NAMESPACE, THRESHOLD_KEY, self.threshold)
            .inspect_err(|_| match previous_version {
                Some(previous) if previous != version => {
                    if let Err(err) = store.put_float(ATTENTION_NAMESPACE, BAND_VERSION_KEY, previous) {
                        log::warn!(
                            "[Calibration] Could not restore band layout version {}: {}",
                            previous,
                            err
                        );
                    }
                }
                _ => {}
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_empty_store_yields_default() {
        let store = MemoryStore::new();
        let (state, source) = CalibrationState::load(&store, 40.0, 1);
        assert_eq!(state, CalibrationState::new_default(40.0, 1));
        assert_eq!(source, LoadSource::Default);
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        CalibrationState::calibrated(28.5, 1).save(&store).unwrap();

        let (state, source) = CalibrationState::load(&store, 40.0, 1);
        assert_eq!(source, LoadSource::Stored);
        assert_eq!(state.threshold, 28.5);
        assert!(state.is_calibrated);
    }

    #[test]
    fn test_unversioned_threshold_counts_as_default_layout() {
        let store = MemoryStore::new();
        store
            .put_float(ATTENTION_NAMESPACE, THRESHOLD_KEY, 33.0)
            .unwrap();

        let (state, source) = CalibrationState::load(&store, 40.0, DEFAULT_BAND_CONFIG_VERSION);
        assert_eq!(source, LoadSource::Stored);
        assert_eq!(state.threshold, 33.0);
    }

    #[test]
    fn test_version_mismatch_discards_threshold() {
        let store = MemoryStore::new();
        CalibrationState::calibrated(28.5, 1).save(&store).unwrap();

        let (state, source) = CalibrationState::load(&store, 40.0, 2);
        assert_eq!(source, LoadSource::VersionMismatch { stored: 1 });
        assert_eq!(state, CalibrationState::new_default(40.0, 2));
    }

    #[test]
    fn test_read_failure_yields_default() {
        let store = MemoryStore::new();
        CalibrationState::calibrated(28.5, 1).save(&store).unwrap();
        store.set_fail_reads(true);

        let (state, source) = CalibrationState::load(&store, 40.0, 1);
        assert!(matches!(source, LoadSource::ReadFailed(_)));
        assert_eq!(state.threshold, 40.0);
    }

    #[test]
    fn test_save_reports_write_failure() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(CalibrationState::calibrated(1.0, 1).save(&store).is_err());
    }

    #[test]
    fn test_failed_threshold_write_keeps_stored_threshold() {
        let store = MemoryStore::new();
        CalibrationState::calibrated(28.5, 1).save(&store).unwrap();

        // Version write goes through, threshold write fails
        store.fail_writes_after(1);
        assert!(CalibrationState::calibrated(12.0, 1).save(&store).is_err());

        store.fail_writes_after(u64::MAX);
        let (state, source) = CalibrationState::load(&store, 40.0, 1);
        assert_eq!(source, LoadSource::Stored);
        assert_eq!(state.threshold, 28.5);
    }

    /// Accepts every write except the threshold itself
    struct RefusesThreshold(MemoryStore);

    impl PreferenceStore for RefusesThreshold {
        fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StoreError> {
            self.0.get_float(namespace, key, default)
        }

        fn put_float(&self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError> {
            if key == THRESHOLD_KEY {
                return Err(StoreError::Unavailable {
                    reason: "threshold key refused".to_string(),
                });
            }
            self.0.put_float(namespace, key, value)
        }
    }

    #[test]
    fn test_failed_threshold_write_restores_version() {
        let inner = MemoryStore::new();
        CalibrationState::calibrated(28.5, 1).save(&inner).unwrap();
        let store = RefusesThreshold(inner);

        assert!(CalibrationState::calibrated(12.0, 2).save(&store).is_err());

        assert_eq!(store.0.peek(ATTENTION_NAMESPACE, BAND_VERSION_KEY), Some(1.0));
        let (state, source) = CalibrationState::load(&store, 40.0, 1);
        assert_eq!(source, LoadSource::Stored);
        assert_eq!(state.threshold, 28.5);
    }
}
