mod format;
mod path;

pub use format::{datetime_from_unix, format_datetime};
pub use path::{file_extension, normalize_extension};
