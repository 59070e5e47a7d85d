//! Common test infrastructure
//!
//! Fixtures for end-to-end tests: a dashboard service over a
//! temporary data directory plus helpers for writing daily chart CSV
//! files and snapshot documents.
#![allow(dead_code)]

use mfst_trends::admin::AdminService;
use mfst_trends::persistence::{AutoSaver, FileLinkSupport, StateStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SONG_A: &str = "spotify:track:0a1b2c3d4e5f6g7h8i9j0k";
pub const SONG_B: &str = "spotify:track:9z8y7x6w5v4u3t2s1r0q9p";

/// A dashboard service over a fresh temporary data directory.
pub fn create_test_admin(dir: &TempDir) -> AdminService {
    AdminService::new(
        StateStore::new(dir.path()),
        FileLinkSupport::detect(dir.path()),
        None,
    )
}

/// Same, with the serialized auto-save worker attached.
pub fn create_test_admin_with_autosave(dir: &TempDir) -> AdminService {
    AdminService::new(
        StateStore::new(dir.path()),
        FileLinkSupport::detect(dir.path()),
        Some(AutoSaver::spawn()),
    )
}

/// Write a daily chart CSV with the standard header. Rows are
/// (uri, rank, streams, artist, track); `streams` is raw text so
/// tests can exercise quoted thousands separators.
pub fn write_chart_csv(
    dir: &Path,
    name: &str,
    rows: &[(&str, i64, &str, &str, &str)],
) -> PathBuf {
    let mut content = String::from("uri,rank,streams,artist_names,track_name\n");
    for (uri, rank, streams, artist, track) in rows {
        content.push_str(&format!(
            "{},{},{},{},{}\n",
            uri, rank, streams, artist, track
        ));
    }
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
