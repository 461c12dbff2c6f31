//! Module containing some utility functions that didn't fit anywhere else.

use time::{format_description, OffsetDateTime};

/// Format used for naming output directories, e.g. `20251001_134501`.
const DIR_TIMESTAMP_FORMAT: &str = "[year][month][day]_[hour][minute][second]";
/// Format used inside human-readable reports.
const REPORT_TIMESTAMP_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn format_now(format: &str) -> String {
    // both formats are constants, so parsing and formatting cannot fail
    format_description::parse(format)
        .ok()
        .and_then(|description| now().format(&description).ok())
        .unwrap_or_default()
}

/// Produces a timestamp `String` of the current time in YYYYMMDD_HHmmSS format, used to name
/// the output directory of a single analysis run.
pub fn get_timestamp() -> String {
    format_now(DIR_TIMESTAMP_FORMAT)
}

/// Produces a timestamp `String` of the current time in `YYYY-MM-DD HH:mm:SS` format.
pub fn get_report_timestamp() -> String {
    format_now(REPORT_TIMESTAMP_FORMAT)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timestamp_shape() {
        let ts = get_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));

        let ts = get_report_timestamp();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }
}
