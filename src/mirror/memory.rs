//! In-process mirror

use super::LocalMirror;
use crate::error::{TierError, TierResult};
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Map-backed mirror; can be flipped read-only to simulate a full device
#[derive(Debug, Default)]
pub struct MemoryMirror {
    entries: Mutex<BTreeMap<String, String>>,
    read_only: AtomicBool,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject all writes while set
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_writable(&self, key: &str) -> TierResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(TierError::mirror_write(
                key,
                io::Error::new(io::ErrorKind::PermissionDenied, "mirror is read-only"),
            ));
        }
        Ok(())
    }
}

impl LocalMirror for MemoryMirror {
    fn get(&self, key: &str) -> TierResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TierResult<()> {
        self.check_writable(key)?;
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> TierResult<()> {
        self.check_writable(key)?;
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> TierResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}
