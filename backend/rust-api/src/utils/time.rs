use chrono::{DateTime, Utc};

/// Compact UTC timestamp safe for use in file names.
pub fn timestamp_str(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
