// ── Persisted document store ──
//
// The file on disk is the source of truth across restarts. Saves go to a
// temp file in the target directory and are renamed into place, so a crash
// mid-write leaves either the old document or the new one, never half.

use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use routekeeper_api::CaddyConfig;

use crate::error::CoreError;

/// Load/save seam for the persisted document.
pub trait ConfigStore: Send + Sync {
    /// Read the document at `path`. `Ok(None)` when no file exists.
    fn load(&self, path: &Path) -> Result<Option<CaddyConfig>, CoreError>;

    /// Atomically replace the document at `path`.
    fn save(&self, path: &Path, config: &CaddyConfig) -> Result<(), CoreError>;
}

/// JSON file store.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl ConfigStore for FileStore {
    fn load(&self, path: &Path) -> Result<Option<CaddyConfig>, CoreError> {
        debug!(path = %path.display(), "loading config document");

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::io(path, e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CoreError::Parse {
                path: path.to_owned(),
                message: e.to_string(),
            })
    }

    fn save(&self, path: &Path, config: &CaddyConfig) -> Result<(), CoreError> {
        debug!(path = %path.display(), "saving config document");

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CoreError::io(dir, e))?;
        serde_json::to_writer_pretty(&mut tmp, config)
            .map_err(|e| CoreError::io(tmp.path(), e.into()))?;
        tmp.write_all(b"\n")
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CoreError::io(tmp.path(), e))?;

        tmp.persist(path)
            .map_err(|e| CoreError::io(path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn sample() -> CaddyConfig {
        serde_json::from_value(json!({
            "admin": { "listen": "localhost:2019" },
            "apps": {
                "http": {
                    "servers": {
                        "srv0": {
                            "listen": [":443"],
                            "routes": [{
                                "match": [{ "host": ["cname.bytesites.ai"] }],
                                "handle": [{
                                    "handler": "reverse_proxy",
                                    "upstreams": [{ "dial": "localhost:3001" }]
                                }],
                                "terminal": true
                            }]
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn missing_file_is_absent_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = FileStore.load(&dir.path().join("caddy.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domains").join("caddy.json");

        FileStore.save(&path, &sample()).unwrap();
        let loaded = FileStore.load(&path).unwrap().unwrap();

        assert_eq!(loaded, sample());
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caddy.json");

        FileStore.save(&path, &CaddyConfig::default()).unwrap();
        FileStore.save(&path, &sample()).unwrap();

        assert_eq!(FileStore.load(&path).unwrap().unwrap(), sample());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "stray files left behind: {entries:?}");
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caddy.json");
        std::fs::write(&path, "{ \"apps\": ").unwrap();

        let err = FileStore.load(&path).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }), "got: {err:?}");
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let err = FileStore.load(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }), "got: {err:?}");
    }
}
