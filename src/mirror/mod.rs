//! Local mirror store
//!
//! Durable key-value store on the device. Access is synchronous: a mirror
//! read never suspends, which is what lets a cached lesson come back without
//! any network round-trip.
//!
//! # Backends
//!
//! | Backend | Medium | Use |
//! |---------|--------|-----|
//! | [`FileMirror`] | one file per key | default, survives restarts |
//! | [`MemoryMirror`] | in-process map | embedding, tests |

pub mod file;
pub mod memory;

pub use file::FileMirror;
pub use memory::MemoryMirror;

use crate::error::TierResult;

/// Synchronous durable key-value store
pub trait LocalMirror: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> TierResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> TierResult<()>;

    /// Remove a value if present
    fn remove(&self, key: &str) -> TierResult<()>;

    /// List every stored key
    fn keys(&self) -> TierResult<Vec<String>>;

    /// Remove everything, returning how many entries went
    fn clear(&self) -> TierResult<usize> {
        self.remove_prefix("")
    }

    /// Remove every key starting with `prefix`, returning how many went
    fn remove_prefix(&self, prefix: &str) -> TierResult<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            if key.starts_with(prefix) {
                self.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Decode a JSON value from any mirror, treating garbage as absent
pub fn read_json<T: serde::de::DeserializeOwned>(
    mirror: &dyn LocalMirror,
    key: &str,
) -> TierResult<Option<T>> {
    Ok(mirror
        .get(key)?
        .and_then(|raw| serde_json::from_str(&raw).ok()))
}

/// Encode and write a JSON value to any mirror
pub fn write_json<T: serde::Serialize + ?Sized>(
    mirror: &dyn LocalMirror,
    key: &str,
    value: &T,
) -> TierResult<()> {
    let raw = serde_json::to_string(value)?;
    mirror.set(key, &raw)
}
