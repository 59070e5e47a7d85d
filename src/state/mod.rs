mod merge;
mod models;
mod sanitize;

pub use merge::replace_points_for_date;
pub use models::{AppState, Point, Round, Song};
pub use sanitize::{check_state, lenient_state, strict_state, ImportError, StateDefect};
