mod color;
mod dashboard;
mod format;

pub use color::color_for_uri;
pub use dashboard::{
    build_label_map, derive_trends, in_date_range, sort_unique_dates, ChartPayload, ChartSeries,
    Metric, TrendsConfig, TrendsView,
};
pub use format::{format_display_date, format_number};
