//! Core data shapes: competition rounds, tracked songs, daily chart
//! points, and the persisted application state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stage of the competition a song can be associated with.
///
/// Closed set: the five heats, the second-chance qualifier and the
/// final. Serialized with the exact display strings used in the data
/// files ("Heat 1", ..., "Finalkval", "Final").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    #[serde(rename = "Heat 1")]
    Heat1,
    #[serde(rename = "Heat 2")]
    Heat2,
    #[serde(rename = "Heat 3")]
    Heat3,
    #[serde(rename = "Heat 4")]
    Heat4,
    #[serde(rename = "Heat 5")]
    Heat5,
    #[serde(rename = "Finalkval")]
    Finalkval,
    #[serde(rename = "Final")]
    Final,
}

impl Round {
    /// All rounds in competition order.
    pub const ALL: [Round; 7] = [
        Round::Heat1,
        Round::Heat2,
        Round::Heat3,
        Round::Heat4,
        Round::Heat5,
        Round::Finalkval,
        Round::Final,
    ];

    /// The display string, which is also the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Round::Heat1 => "Heat 1",
            Round::Heat2 => "Heat 2",
            Round::Heat3 => "Heat 3",
            Round::Heat4 => "Heat 4",
            Round::Heat5 => "Heat 5",
            Round::Finalkval => "Finalkval",
            Round::Final => "Final",
        }
    }

    /// Parse the exact display string. Unknown strings yield `None`;
    /// the sanitizer uses this to drop unrecognized round values
    /// without rejecting the surrounding song.
    pub fn from_name(name: &str) -> Option<Round> {
        Round::ALL.iter().copied().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Round {
    type Err = String;

    /// Accepts the display string plus compact CLI forms:
    /// "Heat 1", "heat1", "heat-1", "finalkval", "final", ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(round) = Round::from_name(s) {
            return Ok(round);
        }
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        Round::ALL
            .iter()
            .copied()
            .find(|r| {
                r.as_str()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase()
                    == compact
            })
            .ok_or_else(|| format!("Unknown round: {}", s))
    }
}

/// A tracked song, identified by its Spotify uri.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub uri: String,
    pub rounds: Vec<Round>,
}

/// One song's observed chart metrics on one calendar day.
///
/// `date` is kept as a `YYYY-MM-DD` string: the fixed-width ISO form
/// makes lexicographic order agree with calendar order, and the
/// derivation engine relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub date: String,
    pub uri: String,
    pub rank: i64,
    pub streams: i64,
    pub artist: String,
    pub track: String,
}

/// The single root aggregate: everything the dashboard knows.
///
/// Mutated only by whole-replacement of the `songs`/`points`
/// collections; persisted after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub version: u32,
    pub songs: Vec<Song>,
    pub points: Vec<Point>,
}

impl AppState {
    /// The only supported schema version.
    pub const VERSION: u32 = 1;

    pub fn empty() -> AppState {
        AppState {
            version: AppState::VERSION,
            songs: Vec::new(),
            points: Vec::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::empty()
    }
}
