//! Serialized auto-save of state snapshots to the linked target.

use super::linked_file::FileLinkProvider;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

struct Job {
    target: PathBuf,
    payload: String,
}

/// Mirrors state snapshots to the linked file through a single worker
/// task. Each write settles (success or failure) before the next one
/// starts, so two rapid mutations can never race the target out of
/// order, and a queued backlog collapses to its newest snapshot so the
/// latest state always wins. Failures are reported as warnings and
/// dropped; the in-memory state is the source of truth.
pub struct AutoSaver {
    sender: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl AutoSaver {
    pub fn spawn() -> AutoSaver {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(mut job) = receiver.recv().await {
                // Collapse the backlog: only the newest snapshot matters.
                while let Ok(newer) = receiver.try_recv() {
                    job = newer;
                }
                let settled = tokio::task::spawn_blocking(move || {
                    FileLinkProvider::write_snapshot(&job.target, &job.payload)
                })
                .await;
                match settled {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!("Auto-save failed: {:#}", err),
                    Err(err) => warn!("Auto-save write task failed: {}", err),
                }
            }
        });
        AutoSaver { sender, worker }
    }

    /// Queue a snapshot write. Never blocks the mutation path.
    pub fn enqueue(&self, target: PathBuf, payload: String) {
        if self.sender.send(Job { target, payload }).is_err() {
            warn!("Auto-save worker is gone, dropping snapshot.");
        }
    }

    /// Drain pending writes and stop the worker.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.worker.await;
    }
}
