//! File-backed local mirror
//!
//! Each key lives in its own file named after the SHA-256 of the key, so
//! arbitrary keys (slashes, spaces, unicode) map to safe file names. The
//! file holds a small JSON envelope carrying the original key, which is how
//! `keys()` recovers them.

use super::LocalMirror;
use crate::error::{TierError, TierResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    value: String,
}

/// Directory of JSON envelopes, one per key
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    /// Open (creating if needed) a mirror rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> TierResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| TierError::io(format!("creating mirror dir {}", dir.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&dir, perms)
                .map_err(|e| TierError::io("setting mirror dir permissions", e))?;
        }

        Ok(Self { dir })
    }

    /// Directory backing this mirror
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn replace_file(tmp: &Path, path: &Path, content: &str) -> std::io::Result<()> {
        fs::write(tmp, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(tmp, path)
    }

    fn read_envelope(path: &Path) -> Option<Envelope> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!("Ignoring unreadable mirror file {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl LocalMirror for FileMirror {
    fn get(&self, key: &str) -> TierResult<Option<String>> {
        let path = self.entry_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TierError::io(
                    format!("reading mirror file {}", path.display()),
                    e,
                ))
            }
        };

        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Mirror entry {} is corrupt, treating as absent: {}", key, e);
                return Ok(None);
            }
        };

        // Hash collision or hand-edited file
        if envelope.key != key {
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    fn set(&self, key: &str, value: &str) -> TierResult<()> {
        let path = self.entry_path(key);
        let content = serde_json::to_string(&Envelope {
            key: key.to_string(),
            value: value.to_string(),
        })?;

        // Write-then-rename so readers never observe a torn entry
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = Self::replace_file(&tmp, &path, &content) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", tmp.display(), cleanup);
                }
            }
            return Err(TierError::mirror_write(key, e));
        }

        debug!("Mirrored {} to {}", key, path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> TierResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TierError::io(
                format!("removing mirror file {}", path.display()),
                e,
            )),
        }
    }

    fn keys(&self) -> TierResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| TierError::io("reading mirror directory", e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TierError::io("reading mirror entry", e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(envelope) = Self::read_envelope(&path) {
                    keys.push(envelope.key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_mirror() -> (FileMirror, TempDir) {
        let temp = TempDir::new().unwrap();
        let mirror = FileMirror::open(temp.path().join("mirror")).unwrap();
        (mirror, temp)
    }

    #[test]
    fn set_and_get() {
        let (mirror, _temp) = test_mirror();
        mirror.set("content_cache/LESSON-42", "<script text>").unwrap();
        assert_eq!(
            mirror.get("content_cache/LESSON-42").unwrap().as_deref(),
            Some("<script text>")
        );
    }

    #[test]
    fn missing_returns_none() {
        let (mirror, _temp) = test_mirror();
        assert!(mirror.get("nope").unwrap().is_none());
    }

    #[test]
    fn survives_reopen() {
        let (mirror, _temp) = test_mirror();
        mirror.set("profile", "{\"points\":10}").unwrap();

        let reopened = FileMirror::open(mirror.dir().to_path_buf()).unwrap();
        assert_eq!(
            reopened.get("profile").unwrap().as_deref(),
            Some("{\"points\":10}")
        );
    }

    #[test]
    fn overwrite_replaces_value() {
        let (mirror, _temp) = test_mirror();
        mirror.set("k", "one").unwrap();
        mirror.set("k", "two").unwrap();
        assert_eq!(mirror.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(mirror.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let (mirror, _temp) = test_mirror();
        mirror.set("k", "v").unwrap();
        fs::write(mirror.entry_path("k"), "{torn").unwrap();
        assert!(mirror.get("k").unwrap().is_none());
    }

    #[test]
    fn remove_prefix_only_touches_matching_keys() {
        let (mirror, _temp) = test_mirror();
        mirror.set("content_cache/a", "1").unwrap();
        mirror.set("content_cache/b", "2").unwrap();
        mirror.set("profile", "3").unwrap();

        assert_eq!(mirror.remove_prefix("content_cache/").unwrap(), 2);
        assert_eq!(mirror.keys().unwrap(), vec!["profile".to_string()]);
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let (mirror, _temp) = test_mirror();
        let target = mirror.entry_path("blocked");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupant"), "x").unwrap();

        assert!(matches!(
            mirror.set("blocked", "v"),
            Err(TierError::LocalMirrorWrite { .. })
        ));
        assert!(!target.with_extension("json.tmp").exists());
        let leftovers: Vec<_> = fs::read_dir(mirror.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn remove_missing_is_ok() {
        let (mirror, _temp) = test_mirror();
        mirror.remove("never-written").unwrap();
    }
}
