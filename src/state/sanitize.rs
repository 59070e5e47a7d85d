//! Schema checking and sanitization of untrusted state documents.
//!
//! One checker, two policies: the lenient policy (local blob load)
//! falls back to the empty state on any top-level defect, the strict
//! policy (explicit user import) surfaces the defect as an
//! [`ImportError`]. Field-level sanitization is always lenient:
//! individual songs and points that fail their constraints are
//! dropped, never escalated.

use super::models::{AppState, Point, Round, Song};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Strict-import failure: the document as a whole is unusable.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid JSON structure.")]
    Structure,

    #[error("Unsupported version.")]
    Version,
}

/// Top-level defects found by the schema checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateDefect {
    NotAnObject,
    UnsupportedVersion,
}

/// The schema checker: validates the top-level shape and sanitizes
/// the collections. Both policies are layered over this one pass.
pub fn check_state(raw: &Value) -> Result<AppState, StateDefect> {
    let object = raw.as_object().ok_or(StateDefect::NotAnObject)?;

    match object.get("version").and_then(Value::as_u64) {
        Some(version) if version == AppState::VERSION as u64 => {}
        _ => return Err(StateDefect::UnsupportedVersion),
    }

    let songs = sanitize_songs(object.get("songs"));

    // Referential pass: points must reference a surviving song. This
    // runs only at state construction; stale points encountered at
    // runtime are simply never matched by the derivation engine.
    let allowed: HashSet<&str> = songs.iter().map(|song| song.uri.as_str()).collect();
    let points = sanitize_points(object.get("points"))
        .into_iter()
        .filter(|point| allowed.contains(point.uri.as_str()))
        .collect();

    Ok(AppState {
        version: AppState::VERSION,
        songs,
        points,
    })
}

/// Lenient policy: any top-level defect yields the empty state.
pub fn lenient_state(raw: &Value) -> AppState {
    check_state(raw).unwrap_or_else(|_| AppState::empty())
}

/// Strict policy: top-level defects become [`ImportError`]s; nothing
/// is partially applied.
pub fn strict_state(raw: &Value) -> Result<AppState, ImportError> {
    check_state(raw).map_err(|defect| match defect {
        StateDefect::NotAnObject => ImportError::Structure,
        StateDefect::UnsupportedVersion => ImportError::Version,
    })
}

/// Sanitize a purported song list. Entries that are not objects, or
/// whose `uri` trims to empty, are dropped. Unknown round strings are
/// filtered out without rejecting the song.
fn sanitize_songs(input: Option<&Value>) -> Vec<Song> {
    let entries = match input.and_then(Value::as_array) {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let object = entry.as_object()?;
            let uri = object.get("uri").and_then(Value::as_str).unwrap_or("").trim();
            if uri.is_empty() {
                return None;
            }
            let rounds = match object.get("rounds").and_then(Value::as_array) {
                Some(rounds) => rounds
                    .iter()
                    .filter_map(|round| round.as_str().and_then(Round::from_name))
                    .collect(),
                None => Vec::new(),
            };
            Some(Song {
                uri: uri.to_string(),
                rounds,
            })
        })
        .collect()
}

/// Sanitize a purported point list. A point survives only with string
/// `date`/`uri`, finite numeric `rank`/`streams`, and `artist`/`track`
/// that are non-empty after trimming.
fn sanitize_points(input: Option<&Value>) -> Vec<Point> {
    let entries = match input.and_then(Value::as_array) {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let object = entry.as_object()?;
            let date = object.get("date").and_then(Value::as_str)?;
            let uri = object.get("uri").and_then(Value::as_str)?;
            let rank = finite_number(object.get("rank"))?;
            let streams = finite_number(object.get("streams"))?;
            let artist = object
                .get("artist")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim();
            let track = object
                .get("track")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim();
            if artist.is_empty() || track.is_empty() {
                return None;
            }
            Some(Point {
                date: date.to_string(),
                uri: uri.to_string(),
                rank,
                streams,
                artist: artist.to_string(),
                track: track.to_string(),
            })
        })
        .collect()
}

fn finite_number(value: Option<&Value>) -> Option<i64> {
    let number = value?.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    Some(number as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_good_state_passes_unchanged() {
        let raw = json!({
            "version": 1,
            "songs": [{"uri": "spotify:track:abc", "rounds": ["Heat 1", "Final"]}],
            "points": [{
                "date": "2026-02-03",
                "uri": "spotify:track:abc",
                "rank": 1,
                "streams": 1234567,
                "artist": "Artist A",
                "track": "Track A"
            }]
        });
        let state = check_state(&raw).unwrap();
        assert_eq!(state.songs.len(), 1);
        assert_eq!(state.songs[0].uri, "spotify:track:abc");
        assert_eq!(state.songs[0].rounds, vec![Round::Heat1, Round::Final]);
        assert_eq!(state.points.len(), 1);
        assert_eq!(state.points[0].streams, 1234567);
    }

    #[test]
    fn test_non_object_is_a_top_level_defect() {
        assert_eq!(check_state(&json!([1, 2])), Err(StateDefect::NotAnObject));
        assert_eq!(check_state(&json!(null)), Err(StateDefect::NotAnObject));
        assert_eq!(check_state(&json!("x")), Err(StateDefect::NotAnObject));
    }

    #[test]
    fn test_wrong_version_is_a_top_level_defect() {
        let raw = json!({"version": 2, "songs": [], "points": []});
        assert_eq!(check_state(&raw), Err(StateDefect::UnsupportedVersion));
        let raw = json!({"songs": [], "points": []});
        assert_eq!(check_state(&raw), Err(StateDefect::UnsupportedVersion));
    }

    #[test]
    fn test_lenient_policy_falls_back_to_empty_state() {
        let raw = json!({"version": 2, "songs": [], "points": []});
        assert_eq!(lenient_state(&raw), AppState::empty());
        assert_eq!(lenient_state(&json!(42)), AppState::empty());
    }

    #[test]
    fn test_strict_policy_surfaces_defects() {
        let raw = json!({"version": 2});
        let err = strict_state(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported version.");

        let err = strict_state(&json!("nope")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON structure.");
    }

    #[test]
    fn test_song_uri_is_trimmed_and_bogus_rounds_dropped() {
        let raw = json!({
            "version": 1,
            "songs": [{"uri": "  x  ", "rounds": ["Heat 1", "Bogus"]}],
            "points": []
        });
        let state = check_state(&raw).unwrap();
        assert_eq!(state.songs.len(), 1);
        assert_eq!(state.songs[0].uri, "x");
        assert_eq!(state.songs[0].rounds, vec![Round::Heat1]);
    }

    #[test]
    fn test_song_with_blank_uri_is_dropped() {
        let raw = json!({
            "version": 1,
            "songs": [
                {"uri": "   ", "rounds": ["Heat 1"]},
                {"uri": 42, "rounds": ["Heat 1"]},
                "not-an-object",
                {"uri": "keep", "rounds": []}
            ],
            "points": []
        });
        let state = check_state(&raw).unwrap();
        assert_eq!(state.songs.len(), 1);
        assert_eq!(state.songs[0].uri, "keep");
    }

    #[test]
    fn test_song_with_non_array_rounds_keeps_empty_rounds() {
        let raw = json!({
            "version": 1,
            "songs": [{"uri": "x", "rounds": "Heat 1"}],
            "points": []
        });
        let state = check_state(&raw).unwrap();
        assert_eq!(state.songs[0].rounds, Vec::<Round>::new());
    }

    #[test]
    fn test_bad_points_are_dropped_individually() {
        let raw = json!({
            "version": 1,
            "songs": [{"uri": "u", "rounds": ["Final"]}],
            "points": [
                {"date": "2026-02-03", "uri": "u", "rank": 1, "streams": 10, "artist": "A", "track": "T"},
                {"date": 20260203, "uri": "u", "rank": 1, "streams": 10, "artist": "A", "track": "T"},
                {"date": "2026-02-04", "uri": "u", "rank": "first", "streams": 10, "artist": "A", "track": "T"},
                {"date": "2026-02-05", "uri": "u", "rank": 1, "streams": 10, "artist": "  ", "track": "T"},
                {"date": "2026-02-06", "uri": "u", "rank": 2, "streams": 20, "artist": " A ", "track": " T "}
            ]
        });
        let state = check_state(&raw).unwrap();
        assert_eq!(state.points.len(), 2);
        assert_eq!(state.points[1].artist, "A");
        assert_eq!(state.points[1].track, "T");
    }

    #[test]
    fn test_points_for_unknown_songs_are_pruned() {
        let raw = json!({
            "version": 1,
            "songs": [{"uri": "known", "rounds": ["Heat 2"]}],
            "points": [
                {"date": "2026-02-03", "uri": "known", "rank": 1, "streams": 10, "artist": "A", "track": "T"},
                {"date": "2026-02-03", "uri": "unknown", "rank": 2, "streams": 20, "artist": "B", "track": "U"}
            ]
        });
        let state = check_state(&raw).unwrap();
        assert_eq!(state.points.len(), 1);
        assert_eq!(state.points[0].uri, "known");
    }

    #[test]
    fn test_sanitizing_a_good_state_is_idempotent() {
        let raw = json!({
            "version": 1,
            "songs": [{"uri": "u", "rounds": ["Heat 5"]}],
            "points": [{"date": "2026-02-03", "uri": "u", "rank": 3, "streams": 30, "artist": "A", "track": "T"}]
        });
        let once = check_state(&raw).unwrap();
        let twice = check_state(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }
}
