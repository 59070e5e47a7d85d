//! Display formatting for chart labels and values.

use chrono::NaiveDate;

/// Short axis label for an ISO date: `2026-02-03` becomes `Feb 3`.
/// Strings that do not parse as dates are passed through unchanged.
pub fn format_display_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%b %-d").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Thousands-separated rendering of a stream count.
pub fn format_number(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
