//! Persistence façade: the local state blob, snapshot export/import,
//! and the bundled repository data file.
//!
//! The local blob is read with the lenient policy (anything wrong
//! yields the empty state) and written unconditionally on every state
//! change. Export/import use the strict policy: a malformed snapshot
//! surfaces an error and leaves the current state untouched.

mod autosave;
mod linked_file;

pub use autosave::AutoSaver;
pub use linked_file::{FileLinkProvider, FileLinkSupport, PermissionError, LINK_STORE_NAME};

use crate::state::{lenient_state, strict_state, AppState, ImportError};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// File name of the local state blob inside the data directory.
pub const STATE_BLOB_NAME: &str = "mfst_v1.json";

/// Default location of the repository data file used by `load-remote`.
pub const REPO_DATA_PATH: &str = "data/mfst-data.json";

/// Suggested file name for exported snapshots.
pub const EXPORT_FILE_NAME: &str = "melodifestivalen-data.json";

#[derive(Debug, Error)]
pub enum RemoteLoadError {
    #[error("Repository data file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Repository data file is malformed: {0}")]
    Malformed(String),
}

/// Load/save/clear of the local state blob.
pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> StateStore {
        StateStore {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn blob_path(&self) -> PathBuf {
        self.data_dir.join(STATE_BLOB_NAME)
    }

    /// Lenient load: a missing, unreadable or malformed blob yields
    /// the empty state. Never errors.
    pub fn load(&self) -> AppState {
        let raw = match std::fs::read_to_string(self.blob_path()) {
            Ok(raw) => raw,
            Err(_) => return AppState::empty(),
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => lenient_state(&value),
            Err(err) => {
                warn!("State blob is not valid JSON, starting empty: {}", err);
                AppState::empty()
            }
        }
    }

    pub fn save(&self, state: &AppState) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        std::fs::write(self.blob_path(), export_state(state))
            .with_context(|| format!("Failed to write {}", self.blob_path().display()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(self.blob_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("Failed to remove state blob"),
        }
    }
}

/// Human-formatted snapshot of the state, the shape shared by the
/// blob, exports and the repository data file.
pub fn export_state(state: &AppState) -> String {
    serde_json::to_string_pretty(state).expect("state snapshot is always serializable")
}

/// Strict import of a snapshot string.
pub fn import_state(json: &str) -> Result<AppState, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    strict_state(&value)
}

/// Load the bundled repository data file. Missing or malformed files
/// fail visibly; the caller confirms before replacing local state.
pub fn load_remote_state(path: &Path) -> Result<AppState, RemoteLoadError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| RemoteLoadError::Missing(path.to_path_buf()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|err| RemoteLoadError::Malformed(err.to_string()))?;
    strict_state(&value).map_err(|err| RemoteLoadError::Malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Point, Round, Song};
    use tempfile::TempDir;

    fn sample_state() -> AppState {
        AppState {
            version: 1,
            songs: vec![Song {
                uri: "spotify:track:abc".to_string(),
                rounds: vec![Round::Heat1, Round::Final],
            }],
            points: vec![Point {
                date: "2026-02-03".to_string(),
                uri: "spotify:track:abc".to_string(),
                rank: 1,
                streams: 1234567,
                artist: "Artist A".to_string(),
                track: "Track A".to_string(),
            }],
        }
    }

    #[test]
    fn test_save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let state = sample_state();

        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_load_missing_blob_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        assert_eq!(store.load(), AppState::empty());
    }

    #[test]
    fn test_load_garbage_blob_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        std::fs::write(store.blob_path(), "definitely not json").unwrap();
        assert_eq!(store.load(), AppState::empty());
    }

    #[test]
    fn test_load_unsupported_version_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        std::fs::write(store.blob_path(), r#"{"version":2,"songs":[],"points":[]}"#).unwrap();
        assert_eq!(store.load(), AppState::empty());
    }

    #[test]
    fn test_clear_removes_blob_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        store.clear().unwrap();
        assert!(!store.blob_path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_import_of_export_reproduces_the_state() {
        let state = sample_state();
        let imported = import_state(&export_state(&state)).unwrap();
        assert_eq!(imported, state);
    }

    #[test]
    fn test_import_is_strict_about_version_and_shape() {
        let err = import_state(r#"{"version":2,"songs":[],"points":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported version.");

        let err = import_state("[1,2,3]").unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON structure.");

        assert!(import_state("{not json").is_err());
    }

    #[test]
    fn test_remote_load_missing_and_malformed() {
        let dir = TempDir::new().unwrap();

        let absent = dir.path().join("data/mfst-data.json");
        assert!(matches!(
            load_remote_state(&absent),
            Err(RemoteLoadError::Missing(_))
        ));

        let malformed = dir.path().join("mfst-data.json");
        std::fs::write(&malformed, r#"{"version":3}"#).unwrap();
        assert!(matches!(
            load_remote_state(&malformed),
            Err(RemoteLoadError::Malformed(_))
        ));
    }

    #[test]
    fn test_remote_load_reads_a_good_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mfst-data.json");
        std::fs::write(&path, export_state(&sample_state())).unwrap();
        assert_eq!(load_remote_state(&path).unwrap(), sample_state());
    }
}
