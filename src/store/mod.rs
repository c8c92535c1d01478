// Store module - namespaced key/value persistence for calibration data
//
// The calibration controller receives a PreferenceStore at construction
// instead of reaching for a process-wide handle. Two implementations ship:
// - MemoryStore: in-process map with failure injection for tests
// - JsonFileStore: namespaced map serialized to a JSON file

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

/// Namespace holding calibration values
pub const ATTENTION_NAMESPACE: &str = "attention";

/// Key of the persisted threshold
pub const THRESHOLD_KEY: &str = "threshold";

/// Key of the band layout version the threshold was computed with
pub const BAND_VERSION_KEY: &str = "band_config_version";

/// Namespaced float storage
///
/// Reads return `default` when the key is absent; an `Err` means the store
/// itself could not be read. Writes are synchronous: when `put_float`
/// returns `Ok` the value is durable as far as the store is concerned.
pub trait PreferenceStore: Send + Sync {
    fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StoreError>;

    fn put_float(&self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError>;
}
