//! The derivation engine: turns the raw point set plus the dashboard
//! filters into aligned, renderer-ready chart series.
//!
//! Derivation is a pure function of its inputs and is recomputed on
//! every filter change; nothing here caches or mutates state.

use super::color::color_for_uri;
use super::format::format_display_date;
use crate::state::{Point, Round, Song};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// The two charted metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Streams,
    Rank,
}

/// Dashboard filters.
///
/// An empty `selected_rounds` means "all rounds": an empty checkbox
/// grid shows everything rather than nothing.
#[derive(Debug, Clone, Default)]
pub struct TrendsConfig {
    pub selected_rounds: Vec<Round>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// One song's line in a chart: label, stable color, and one value per
/// display date. `None` is a gap (no observation that day) and must be
/// rendered as a missing segment, never as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub color: String,
    pub data: Vec<Option<i64>>,
}

/// The derived dashboard: filtered songs, the display dates, and one
/// aligned series set per metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendsView {
    pub songs: Vec<Song>,
    pub dates: Vec<String>,
    pub streams: Vec<ChartSeries>,
    pub rank: Vec<ChartSeries>,
}

/// What a line-chart renderer consumes: formatted axis labels plus
/// both series sets.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub labels: Vec<String>,
    pub streams: Vec<ChartSeries>,
    pub rank: Vec<ChartSeries>,
}

impl TrendsView {
    pub fn chart_payload(&self) -> ChartPayload {
        ChartPayload {
            labels: self.dates.iter().map(|d| format_display_date(d)).collect(),
            streams: self.streams.clone(),
            rank: self.rank.clone(),
        }
    }
}

/// Distinct dates in ascending order. Dates are fixed-width ISO
/// strings, so plain lexicographic order is calendar order; keep it
/// that way rather than parsing into date types.
pub fn sort_unique_dates<'a, I>(dates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let unique: BTreeSet<&str> = dates.into_iter().collect();
    unique.into_iter().map(str::to_string).collect()
}

/// Inclusive window check. `None` or an empty string on either bound
/// means unbounded on that side.
pub fn in_date_range(date: &str, from: Option<&str>, to: Option<&str>) -> bool {
    if let Some(from) = from {
        if !from.is_empty() && date < from {
            return false;
        }
    }
    if let Some(to) = to {
        if !to.is_empty() && date > to {
            return false;
        }
    }
    true
}

/// Human label per uri: `"{artist} - {track}"` from the most recent
/// point referencing it, across the entire unfiltered point set.
pub fn build_label_map(points: &[Point]) -> HashMap<String, String> {
    let mut latest: HashMap<&str, &Point> = HashMap::new();
    for point in points {
        match latest.get(point.uri.as_str()) {
            Some(existing) if existing.date >= point.date => {}
            _ => {
                latest.insert(point.uri.as_str(), point);
            }
        }
    }
    latest
        .into_iter()
        .map(|(uri, point)| (uri.to_string(), format!("{} - {}", point.artist, point.track)))
        .collect()
}

/// Derive the dashboard from the current state and filters.
pub fn derive_trends(songs: &[Song], points: &[Point], config: &TrendsConfig) -> TrendsView {
    let active_rounds: &[Round] = if config.selected_rounds.is_empty() {
        &Round::ALL
    } else {
        &config.selected_rounds
    };

    let filtered_songs: Vec<Song> = songs
        .iter()
        .filter(|song| song.rounds.iter().any(|round| active_rounds.contains(round)))
        .cloned()
        .collect();

    let dates: Vec<String> = sort_unique_dates(points.iter().map(|p| p.date.as_str()))
        .into_iter()
        .filter(|date| {
            in_date_range(date, config.date_from.as_deref(), config.date_to.as_deref())
        })
        .collect();

    let labels = build_label_map(points);
    let mut lookup: HashMap<(&str, &str), &Point> = HashMap::new();
    for point in points {
        lookup.insert((point.uri.as_str(), point.date.as_str()), point);
    }

    let streams = build_series(&filtered_songs, &lookup, &dates, &labels, Metric::Streams);
    let rank = build_series(&filtered_songs, &lookup, &dates, &labels, Metric::Rank);

    TrendsView {
        songs: filtered_songs,
        dates,
        streams,
        rank,
    }
}

fn build_series(
    songs: &[Song],
    lookup: &HashMap<(&str, &str), &Point>,
    dates: &[String],
    labels: &HashMap<String, String>,
    metric: Metric,
) -> Vec<ChartSeries> {
    songs
        .iter()
        .map(|song| {
            let label = labels
                .get(&song.uri)
                .cloned()
                .unwrap_or_else(|| song.uri.clone());
            let color = color_for_uri(&song.uri);
            let data = dates
                .iter()
                .map(|date| {
                    lookup
                        .get(&(song.uri.as_str(), date.as_str()))
                        .map(|point| match metric {
                            Metric::Streams => point.streams,
                            Metric::Rank => point.rank,
                        })
                })
                .collect();
            ChartSeries { label, color, data }
        })
        .collect()
}
