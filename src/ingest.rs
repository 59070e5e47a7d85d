//! Daily chart CSV ingestion.
//!
//! One uploaded file becomes one dated batch of validated points.
//! The file name must embed the chart date; rows are matched against
//! the configured song allowlist and defective rows are skipped and
//! counted, never escalated. Only file-level problems (no date in the
//! name, structural CSV errors) abort a file.

use crate::state::Point;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// File-level ingestion failures. Row-level defects are recovered
/// locally and reported through [`CsvBatch::skipped`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Filename must include a date like 2026-02-03.")]
    Filename,

    #[error("{0}")]
    Syntax(String),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),
}

/// The accepted points of one chart file, all stamped with the date
/// taken from the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBatch {
    pub date: String,
    pub points: Vec<Point>,
    pub skipped: usize,
}

/// Column names probed for the song uri, in priority order.
const URI_COLUMNS: [&str; 4] = ["uri", "url", "URL", "URI"];

lazy_static! {
    static ref FILENAME_DATE: Regex =
        Regex::new(r"\d{4}-\d{2}-\d{2}").expect("Invalid regex, this cannot fail at runtime.");
}

/// First `YYYY-MM-DD` substring of a file name, if any.
pub fn extract_date_from_filename(name: &str) -> Option<String> {
    FILENAME_DATE.find(name).map(|m| m.as_str().to_string())
}

/// Parse one daily chart file into a dated batch.
pub fn parse_csv_file(path: &Path, allowed_uris: &HashSet<String>) -> Result<CsvBatch, IngestError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let date = extract_date_from_filename(&name).ok_or(IngestError::Filename)?;
    let text = std::fs::read_to_string(path)?;
    parse_csv_text(&text, &date, allowed_uris)
}

/// Parse chart CSV content for a known date.
pub fn parse_csv_text(
    text: &str,
    date: &str,
    allowed_uris: &HashSet<String>,
) -> Result<CsvBatch, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| IngestError::Syntax(err.to_string()))?
        .clone();

    let uri_columns: Vec<usize> = URI_COLUMNS
        .iter()
        .filter_map(|name| column_index(&headers, name))
        .collect();
    let rank_column = column_index(&headers, "rank");
    let streams_column = column_index(&headers, "streams");
    let artist_column = column_index(&headers, "artist_names");
    let track_column = column_index(&headers, "track_name");

    let mut points = Vec::new();
    let mut skipped = 0;

    for record in reader.records() {
        let record = record.map_err(|err| IngestError::Syntax(err.to_string()))?;

        // First non-empty value among the accepted uri columns.
        let uri = uri_columns
            .iter()
            .filter_map(|&index| record.get(index))
            .find(|value| !value.is_empty())
            .unwrap_or("")
            .trim();
        if uri.is_empty() || !allowed_uris.contains(uri) {
            skipped += 1;
            continue;
        }

        let rank = parse_count(field(&record, rank_column));
        let streams = parse_count(field(&record, streams_column));
        let artist = field(&record, artist_column).trim();
        let track = field(&record, track_column).trim();

        let (rank, streams) = match (rank, streams) {
            (Some(rank), Some(streams)) => (rank, streams),
            _ => {
                skipped += 1;
                continue;
            }
        };
        if artist.is_empty() || track.is_empty() {
            skipped += 1;
            continue;
        }

        points.push(Point {
            date: date.to_string(),
            uri: uri.to_string(),
            rank,
            streams,
            artist: artist.to_string(),
            track: track.to_string(),
        });
    }

    Ok(CsvBatch {
        date: date.to_string(),
        points,
        skipped,
    })
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| record.get(i)).unwrap_or("")
}

/// Parse a chart number, tolerating `,` thousands separators.
fn parse_count(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    let number: f64 = cleaned.trim().parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    Some(number as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(uris: &[&str]) -> HashSet<String> {
        uris.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_extract_date_from_filename() {
        assert_eq!(
            extract_date_from_filename("chart_2026-02-03.csv"),
            Some("2026-02-03".to_string())
        );
        assert_eq!(
            extract_date_from_filename("2026-02-03_2026-02-04.csv"),
            Some("2026-02-03".to_string())
        );
        assert_eq!(extract_date_from_filename("chart.csv"), None);
    }

    #[test]
    fn test_accepts_row_with_quoted_thousands_separators() {
        let text = "uri,rank,streams,artist_names,track_name\n\
                    spotify:track:abc,1,\"1,234,567\",Artist A,Track A\n";
        let batch = parse_csv_text(text, "2026-02-03", &allow(&["spotify:track:abc"])).unwrap();
        assert_eq!(batch.skipped, 0);
        assert_eq!(
            batch.points,
            vec![Point {
                date: "2026-02-03".to_string(),
                uri: "spotify:track:abc".to_string(),
                rank: 1,
                streams: 1234567,
                artist: "Artist A".to_string(),
                track: "Track A".to_string(),
            }]
        );
    }

    #[test]
    fn test_row_outside_allowlist_is_skipped_not_fatal() {
        let text = "uri,rank,streams,artist_names,track_name\n\
                    spotify:track:abc,1,100,Artist A,Track A\n\
                    spotify:track:zzz,2,90,Artist B,Track B\n";
        let batch = parse_csv_text(text, "2026-02-03", &allow(&["spotify:track:abc"])).unwrap();
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_bad_numbers_and_blank_names_are_skipped() {
        let text = "uri,rank,streams,artist_names,track_name\n\
                    a,first,100,Artist,Track\n\
                    a,1,,Artist,Track\n\
                    a,1,100,   ,Track\n\
                    a,1,100,Artist,\n\
                    a,2,200,Artist,Track\n";
        let batch = parse_csv_text(text, "2026-02-03", &allow(&["a"])).unwrap();
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.points[0].rank, 2);
        assert_eq!(batch.skipped, 4);
    }

    #[test]
    fn test_uri_columns_probed_in_priority_order() {
        let text = "URL,rank,streams,artist_names,track_name\n\
                    a,1,100,Artist,Track\n";
        let batch = parse_csv_text(text, "2026-02-03", &allow(&["a"])).unwrap();
        assert_eq!(batch.points.len(), 1);

        // An empty primary column falls through to the next variant.
        let text = "uri,url,rank,streams,artist_names,track_name\n\
                    ,a,1,100,Artist,Track\n";
        let batch = parse_csv_text(text, "2026-02-03", &allow(&["a"])).unwrap();
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.points[0].uri, "a");
    }

    #[test]
    fn test_structural_error_aborts_the_file() {
        let text = "uri,rank,streams,artist_names,track_name\n\
                    a,1,100,Artist\n";
        let err = parse_csv_text(text, "2026-02-03", &allow(&["a"])).unwrap_err();
        assert!(matches!(err, IngestError::Syntax(_)));
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let text = "uri,rank,streams,artist_names,track_name\n\
                    \n\
                    a,1,100,Artist,Track\n\
                    \n";
        let batch = parse_csv_text(text, "2026-02-03", &allow(&["a"])).unwrap();
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn test_file_without_date_in_name_is_rejected_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.csv");
        std::fs::write(&path, "uri,rank\n").unwrap();
        let err = parse_csv_file(&path, &allow(&["a"])).unwrap_err();
        assert!(matches!(err, IngestError::Filename));
    }

    #[test]
    fn test_parse_count_tolerates_separators() {
        assert_eq!(parse_count("1,234,567"), Some(1234567));
        assert_eq!(parse_count(" 42 "), Some(42));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("n/a"), None);
    }
}
