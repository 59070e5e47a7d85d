//! Melodifestivalen Streaming Trends
//!
//! Tracks daily Spotify chart performance (rank and streams) for a
//! curated set of competition songs. The library holds the whole
//! pipeline: schema sanitization of untrusted data, CSV batch
//! ingestion, full-day merge reconciliation, chart-series derivation,
//! and persistence of the single state aggregate.

pub mod admin;
pub mod charts;
pub mod config;
pub mod ingest;
pub mod persistence;
pub mod state;

// Re-export commonly used types for convenience
pub use admin::{AdminService, Status, StatusKind};
pub use state::{AppState, Point, Round, Song};
