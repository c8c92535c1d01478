use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;

use super::PreferenceStore;

/// In-memory store with switchable read/write failures
pub struct MemoryStore {
    values: Mutex<HashMap<(String, String), f32>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU64,
    /// Writes still allowed to succeed; `u64::MAX` means unlimited
    write_budget: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicU64::new(0),
            write_budget: AtomicU64::new(u64::MAX),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `writes` writes succeed and fail every one after that
    pub fn fail_writes_after(&self, writes: u64) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    /// Make every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw lookup that bypasses failure injection
    pub fn peek(&self, namespace: &str, key: &str) -> Option<f32> {
        self.values
            .lock()
            .ok()?
            .get(&(namespace.to_string(), key.to_string()))
            .copied()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), f32>>, StoreError> {
        self.values.lock().map_err(|_| StoreError::Unavailable {
            reason: "memory store lock poisoned".to_string(),
        })
    }
}

impl PreferenceStore for MemoryStore {
    fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "injected read failure".to_string(),
            });
        }
        Ok(self
            .lock()?
            .get(&(namespace.to_string(), key.to_string()))
            .copied()
            .unwrap_or(default))
    }

    fn put_float(&self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError> {
        let within_budget = self
            .write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u64::MAX => Some(u64::MAX),
                left => Some(left - 1),
            })
            .is_ok();
        if self.fail_writes.load(Ordering::SeqCst) || !within_budget {
            return Err(StoreError::Unavailable {
                reason: "injected write failure".to_string(),
            });
        }
        self.lock()?
            .insert((namespace.to_string(), key.to_string()), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
