//! Configuration resolution for the CLI.

use crate::persistence::REPO_DATA_PATH;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// CLI arguments that feed config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub remote_data_path: Option<PathBuf>,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the state blob and the linked-file handle.
    pub data_dir: PathBuf,
    /// Repository data file consumed by `load-remote`.
    pub remote_data_path: PathBuf,
}

impl AppConfig {
    /// Resolve from CLI arguments, the `MFST_DATA_DIR` environment
    /// override, and the platform data directory, in that order.
    pub fn resolve(cli: &CliConfig) -> Result<AppConfig> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        if data_dir.exists() && !data_dir.is_dir() {
            bail!("Data dir is not a directory: {}", data_dir.display());
        }

        let remote_data_path = cli
            .remote_data_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(REPO_DATA_PATH));

        Ok(AppConfig {
            data_dir,
            remote_data_path,
        })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    if let Ok(env_dir) = std::env::var("MFST_DATA_DIR") {
        return Ok(PathBuf::from(env_dir));
    }
    let proj_dirs = ProjectDirs::from("se", "mfst", "mfst-trends")
        .context("Could not determine a home directory")?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
