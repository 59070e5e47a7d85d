//! Linked external file target.
//!
//! The dashboard can mirror its state to one user-chosen file outside
//! the data directory (typically a data file inside a git checkout).
//! Whether linking is available at all is decided once at startup by
//! [`FileLinkSupport::detect`]; when it is not, only export/import
//! remain on offer. Every write is preceded by an explicit
//! write-permission probe.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the linked-target handle store inside the data dir.
pub const LINK_STORE_NAME: &str = "linked_file.json";

#[derive(Debug, Error)]
#[error("Write permission denied.")]
pub struct PermissionError;

#[derive(Serialize, Deserialize, Default)]
struct LinkDump {
    linked_path: Option<PathBuf>,
}

/// Persists the linked-target handle and performs permission-checked
/// snapshot writes.
pub struct FileLinkProvider {
    store_path: PathBuf,
}

impl FileLinkProvider {
    pub fn new(store_path: PathBuf) -> FileLinkProvider {
        FileLinkProvider { store_path }
    }

    fn load_dump(&self) -> LinkDump {
        let mut content = String::new();
        match File::open(&self.store_path) {
            Ok(mut file) => {
                if file.read_to_string(&mut content).is_err() {
                    return LinkDump::default();
                }
            }
            Err(_) => return LinkDump::default(),
        }
        serde_json::from_str(&content).unwrap_or_default()
    }

    fn save_dump(&self, dump: &LinkDump) -> Result<()> {
        let json = serde_json::to_string_pretty(dump)?;
        let mut file = File::create(&self.store_path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// The currently linked target, if any.
    pub fn linked(&self) -> Option<PathBuf> {
        self.load_dump().linked_path
    }

    pub fn link(&self, target: &Path) -> Result<()> {
        self.save_dump(&LinkDump {
            linked_path: Some(target.to_path_buf()),
        })
    }

    pub fn unlink(&self) -> Result<()> {
        self.save_dump(&LinkDump::default())
    }

    /// Probe write access to the target before a write. A missing
    /// target is fine (the write will create it); only an actual
    /// permission denial is reported.
    pub fn ensure_write_permission(target: &Path) -> Result<(), PermissionError> {
        match OpenOptions::new().append(true).open(target) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => Err(PermissionError),
            Err(_) => Ok(()),
        }
    }

    /// Permission-checked snapshot write to the target.
    pub fn write_snapshot(target: &Path, content: &str) -> Result<()> {
        Self::ensure_write_permission(target)?;
        std::fs::write(target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(())
    }
}

/// Host capability for the file-linking flow, selected once at
/// startup rather than branched on throughout the admin actions.
pub enum FileLinkSupport {
    /// Linking is available: link/unlink/permission/write operations.
    Supported(FileLinkProvider),
    /// Linking is unavailable; only export/import are offered.
    Unsupported,
}

impl FileLinkSupport {
    /// Linking needs a writable data directory for the handle store.
    pub fn detect(data_dir: &Path) -> FileLinkSupport {
        if std::fs::create_dir_all(data_dir).is_err() {
            return FileLinkSupport::Unsupported;
        }
        FileLinkSupport::Supported(FileLinkProvider::new(data_dir.join(LINK_STORE_NAME)))
    }

    pub fn provider(&self) -> Option<&FileLinkProvider> {
        match self {
            FileLinkSupport::Supported(provider) => Some(provider),
            FileLinkSupport::Unsupported => None,
        }
    }

    pub fn linked_target(&self) -> Option<PathBuf> {
        self.provider().and_then(|provider| provider.linked())
    }
}
