//! Administrative actions over the dashboard state.
//!
//! The service owns the single [`AppState`] aggregate. Every action
//! runs to completion, returns exactly one [`Status`], and persists
//! the new state after each mutation: always to the local blob, and
//! to the linked repository file through the auto-save queue when one
//! is linked. State transitions replace whole collections rather than
//! mutating songs or points in place.

use crate::ingest::parse_csv_file;
use crate::persistence::{
    export_state, import_state, load_remote_state, AutoSaver, FileLinkProvider, FileLinkSupport,
    StateStore,
};
use crate::state::{replace_points_for_date, AppState, Round, Song};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Info,
}

/// The one user-visible outcome of an administrative action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn success(message: impl Into<String>) -> Status {
        Status {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Status {
        Status {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Status {
        Status {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

pub struct AdminService {
    state: AppState,
    store: StateStore,
    link: FileLinkSupport,
    autosaver: Option<AutoSaver>,
}

impl AdminService {
    /// Load the persisted state (leniently) and wire up persistence.
    pub fn new(
        store: StateStore,
        link: FileLinkSupport,
        autosaver: Option<AutoSaver>,
    ) -> AdminService {
        let state = store.load();
        AdminService {
            state,
            store,
            link,
            autosaver,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn linked_target(&self) -> Option<PathBuf> {
        self.link.linked_target()
    }

    /// Persist after a mutation. Local save failures are reported but
    /// never roll back the in-memory state; the linked mirror goes
    /// through the serialized auto-save queue.
    fn persist(&self) {
        if let Err(err) = self.store.save(&self.state) {
            warn!("Failed to persist state: {:#}", err);
        }
        if let (Some(saver), Some(target)) = (&self.autosaver, self.link.linked_target()) {
            saver.enqueue(target, export_state(&self.state));
        }
    }

    pub fn add_song(&mut self, uri: &str, rounds: &[Round]) -> Status {
        let uri = uri.trim();
        if uri.is_empty() || rounds.is_empty() {
            return Status::error("Provide a uri and select at least one round.");
        }
        if self.state.songs.iter().any(|song| song.uri == uri) {
            return Status::error("Song already exists.");
        }

        let mut songs = self.state.songs.clone();
        songs.push(Song {
            uri: uri.to_string(),
            rounds: rounds.to_vec(),
        });
        self.state.songs = songs;
        self.persist();
        Status::success("Song added.")
    }

    /// Remove a song and every point referencing it.
    pub fn remove_song(&mut self, uri: &str) -> Status {
        if !self.state.songs.iter().any(|song| song.uri == uri) {
            return Status::error("Song not found.");
        }
        self.state.songs = self
            .state
            .songs
            .iter()
            .filter(|song| song.uri != uri)
            .cloned()
            .collect();
        self.state.points = self
            .state
            .points
            .iter()
            .filter(|point| point.uri != uri)
            .cloned()
            .collect();
        self.persist();
        Status::success("Song removed.")
    }

    pub fn toggle_round(&mut self, uri: &str, round: Round) -> Status {
        if !self.state.songs.iter().any(|song| song.uri == uri) {
            return Status::error("Song not found.");
        }
        self.state.songs = self
            .state
            .songs
            .iter()
            .map(|song| {
                if song.uri != uri {
                    return song.clone();
                }
                let rounds = if song.rounds.contains(&round) {
                    song.rounds
                        .iter()
                        .copied()
                        .filter(|r| *r != round)
                        .collect()
                } else {
                    let mut rounds = song.rounds.clone();
                    rounds.push(round);
                    rounds
                };
                Song {
                    uri: song.uri.clone(),
                    rounds,
                }
            })
            .collect();
        self.persist();
        Status::success(format!("Updated rounds for {}.", uri))
    }

    /// Import a batch of daily chart files. Files are parsed
    /// sequentially; a failing file never blocks the others. Batches
    /// merge in order, so a later file sharing a date replaces the
    /// earlier file's contribution for that date.
    pub fn import_csv_files(&mut self, paths: &[PathBuf]) -> Status {
        if self.state.songs.is_empty() {
            return Status::error("Add songs before uploading CSV files.");
        }

        let allowed: HashSet<String> = self
            .state
            .songs
            .iter()
            .map(|song| song.uri.clone())
            .collect();

        let mut batches = Vec::new();
        let mut errors = Vec::new();
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            match parse_csv_file(path, &allowed) {
                Ok(batch) => batches.push(batch),
                Err(err) => errors.push(format!("{}: {}", name, err)),
            }
        }

        if !batches.is_empty() {
            let mut points = self.state.points.clone();
            for batch in &batches {
                points = replace_points_for_date(&points, &batch.date, batch.points.clone());
            }
            self.state.points = points;
            self.persist();
        }

        let report = batches
            .iter()
            .map(|batch| {
                format!(
                    "Imported {} rows for {} (skipped {}).",
                    batch.points.len(),
                    batch.date,
                    batch.skipped
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        let error_report = if errors.is_empty() {
            String::new()
        } else {
            format!(" Errors: {}", errors.join(" | "))
        };
        let message = format!("{}{}", report, error_report).trim().to_string();

        if message.is_empty() {
            return Status::info("Nothing to import.");
        }
        if errors.is_empty() {
            Status::success(message)
        } else {
            Status::error(message)
        }
    }

    /// Strict snapshot import: success replaces the whole state,
    /// failure leaves it untouched.
    pub fn import_json(&mut self, json: &str) -> Status {
        match import_state(json) {
            Ok(imported) => {
                self.state = imported;
                self.persist();
                Status::success("JSON imported successfully.")
            }
            Err(err) => Status::error(err.to_string()),
        }
    }

    pub fn export_json(&self) -> String {
        export_state(&self.state)
    }

    pub fn export_to(&self, path: &Path) -> Status {
        match std::fs::write(path, self.export_json()) {
            Ok(()) => Status::success(format!("Exported to {}.", path.display())),
            Err(err) => Status::error(format!("Failed to export: {}", err)),
        }
    }

    pub fn clear_all(&mut self) -> Status {
        if let Err(err) = self.store.clear() {
            warn!("Failed to clear state blob: {:#}", err);
        }
        self.state = AppState::empty();
        self.persist();
        Status::info("All data cleared.")
    }

    /// Link a repository file: the handle is stored first, then the
    /// write permission is probed and the current snapshot written.
    /// A denied probe keeps the link in place so the user can fix
    /// permissions and save again.
    pub fn link_file(&mut self, target: &Path) -> Status {
        let provider = match self.link.provider() {
            Some(provider) => provider,
            None => return Status::error("File linking is not available. Use export instead."),
        };
        if let Err(err) = provider.link(target) {
            return Status::error(format!("Failed to link file: {}", err));
        }
        if FileLinkProvider::ensure_write_permission(target).is_err() {
            return Status::error("Write permission was denied. Please re-link the file.");
        }
        if let Err(err) = FileLinkProvider::write_snapshot(target, &self.export_json()) {
            return Status::error(format!("{}", err));
        }
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| target.display().to_string());
        Status::success(format!(
            "Linked {}. Auto-save enabled. Commit and push after updates.",
            name
        ))
    }

    pub fn unlink_file(&mut self) -> Status {
        let provider = match self.link.provider() {
            Some(provider) => provider,
            None => return Status::error("File linking is not available. Use export instead."),
        };
        if let Err(err) = provider.unlink() {
            return Status::error(format!("Failed to unlink file: {}", err));
        }
        Status::info("Repo file unlinked. Auto-save disabled.")
    }

    /// Immediate, settled write to the linked file.
    pub fn save_now(&self) -> Status {
        let target = match self.link.linked_target() {
            Some(target) => target,
            None => return Status::error("No repo file linked."),
        };
        if FileLinkProvider::ensure_write_permission(&target).is_err() {
            return Status::error("Write permission denied.");
        }
        match FileLinkProvider::write_snapshot(&target, &self.export_json()) {
            Ok(()) => Status::success("Saved to linked file."),
            Err(err) => Status::error(format!("{}", err)),
        }
    }

    /// Replace local data with the repository data file. The caller
    /// confirms before invoking; failures are surfaced verbatim.
    pub fn load_remote(&mut self, path: &Path) -> Status {
        match load_remote_state(path) {
            Ok(remote) => {
                self.state = remote;
                self.persist();
                Status::success("Repository data loaded.")
            }
            Err(err) => Status::error(err.to_string()),
        }
    }

    /// Drain pending auto-save writes and stop the worker.
    pub async fn shutdown(self) {
        if let Some(autosaver) = self.autosaver {
            autosaver.shutdown().await;
        }
    }
}
