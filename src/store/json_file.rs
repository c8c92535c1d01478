use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

use super::PreferenceStore;

type Namespaces = BTreeMap<String, BTreeMap<String, f32>>;

/// File-backed store: `{ "namespace": { "key": value } }`
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename so a crash never leaves a half-written document behind.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Namespaces, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Namespaces::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Namespaces::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, namespaces: &Namespaces) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(namespaces)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StoreError> {
        let namespaces = self.read_all()?;
        Ok(namespaces
            .get(namespace)
            .and_then(|values| values.get(key))
            .copied()
            .unwrap_or(default))
    }

    fn put_float(&self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Unavailable {
            reason: "json store lock poisoned".to_string(),
        })?;

        let mut namespaces = self.read_all()?;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.write_all(&namespaces)?;

        log::debug!(
            "[Store] Wrote {}/{} = {} to {:?}",
            namespace,
            key,
            value,
            self.path
        );
        Ok(())
    }
}
