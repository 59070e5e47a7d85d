//! Reconciliation of imported day batches into the point set.

use super::models::Point;

/// Full-day replacement: every existing point for `date` is removed
/// and the incoming batch appended; points for other dates keep their
/// relative order. Importing the same date twice is last-write-wins.
pub fn replace_points_for_date(existing: &[Point], date: &str, incoming: Vec<Point>) -> Vec<Point> {
    let mut merged: Vec<Point> = existing
        .iter()
        .filter(|point| point.date != date)
        .cloned()
        .collect();
    merged.extend(incoming);
    merged
}
