//! Line splitting and leading-timestamp extraction
//!
//! Every supported engine writes a date-time at the start of each line.
//! The date-time is taken from the first three `:`-delimited components
//! of the line, which keeps `HH:MM:SS` plus whatever zone text follows
//! the seconds, and drops the rest of the message.

use crate::types::EpochMillis;
use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// File extensions never fetched (binary trace formats)
pub const BINARY_EXTENSIONS: &[&str] = &["xel", "trc"];

/// Leading date-time layouts, tried in order
const TIMESTAMP_FORMATS: &[&str] = &[
    // PostgreSQL, MySQL 8, MariaDB: 2024-01-15 10:00:00.123 / 2024-01-15T10:00:00.123456Z
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    // MySQL 5.x: 240115 10:00:00
    "%y%m%d %H:%M:%S",
    // Oracle alert log and listener: 2024/01/15 10:00:00
    "%Y/%m/%d %H:%M:%S",
    // ctime: Mon Jan 15 10:00:00 2024
    "%a %b %e %H:%M:%S %Y",
];

/// Zone designator right after the seconds
static ZONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s?(?:(Z|UTC|GMT)|([+-])(\d{2})(?::?(\d{2}))?)(?:$|[^0-9A-Za-z])").unwrap()
});

/// Whether a file is excluded by extension, regardless of when it changed
pub fn is_binary_log_file(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        BINARY_EXTENSIONS
            .iter()
            .any(|binary| ext.eq_ignore_ascii_case(binary))
    })
}

/// Non-blank lines of a payload, in order
///
/// Handles both `\n` and `\r\n` endings.
pub fn split_lines(data: &str) -> impl Iterator<Item = &str> {
    data.trim_end()
        .lines()
        .filter(|line| !line.trim().is_empty())
}

/// The first three `:`-delimited components, rejoined
pub fn timestamp_prefix(line: &str) -> &str {
    let mut end = line.len();
    let mut colons = 0;
    for (i, c) in line.char_indices() {
        if c == ':' {
            colons += 1;
            if colons == 3 {
                end = i;
                break;
            }
        }
    }
    &line[..end]
}

/// Epoch milliseconds of the date-time a line starts with
///
/// A missing zone means UTC.
pub fn parse_line_timestamp(line: &str) -> Option<EpochMillis> {
    let prefix = timestamp_prefix(line.trim_start());

    TIMESTAMP_FORMATS.iter().find_map(|format| {
        let (naive, rest) = NaiveDateTime::parse_and_remainder(prefix, format).ok()?;
        let offset_seconds = zone_offset_seconds(rest);
        Some(Utc.from_utc_datetime(&naive).timestamp_millis() - offset_seconds * 1_000)
    })
}

/// Offset east of UTC encoded at the start of `rest`, or 0
fn zone_offset_seconds(rest: &str) -> i64 {
    let Some(caps) = ZONE_REGEX.captures(rest) else {
        return 0;
    };
    if caps.get(1).is_some() {
        return 0;
    }

    let number = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };
    let seconds = number(3) * 3_600 + number(4) * 60;
    match caps.get(2).map(|m| m.as_str()) {
        Some("-") => -seconds,
        _ => seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    /// 2024-01-15T10:00:00Z
    const BASE: EpochMillis = 1_705_312_800_000;

    #[test_case("2024-01-15 10:00:00 UTC::@:[1234]:LOG:  checkpoint starting", BASE ; "postgres")]
    #[test_case("2024-01-15 10:00:00.250 UTC::@:[1]:LOG: x", BASE + 250 ; "postgres millis")]
    #[test_case("2024-01-15T10:00:00.123456Z 0 [Note] [MY-010116] mysqld", BASE + 123 ; "mysql 8")]
    #[test_case("2024-01-15T10:00:00Z 12 [Warning] Aborted connection", BASE ; "iso zulu")]
    #[test_case("240115 10:00:00 [Note] InnoDB: Starting shutdown", BASE ; "mysql 5")]
    #[test_case("2024/01/15 10:00:00 listener: ready", BASE ; "slash form")]
    #[test_case("Mon Jan 15 10:00:00 2024", BASE ; "ctime")]
    #[test_case("2024-01-15 12:00:00+02:00 something", BASE ; "positive offset")]
    #[test_case("2024-01-15 05:00:00 -0500 something", BASE ; "negative offset")]
    #[test_case("2024-01-15 10:00:00 GMT: message", BASE ; "gmt")]
    fn test_parse_line_timestamp(line: &str, expected: EpochMillis) {
        assert_eq!(parse_line_timestamp(line), Some(expected));
    }

    #[test_case("" ; "empty")]
    #[test_case("garbage line with no date" ; "no date")]
    #[test_case("\tat org.postgresql.Driver.connect(Driver.java:10)" ; "continuation")]
    #[test_case("2024-13-45 10:00:00 UTC::LOG" ; "impossible date")]
    fn test_parse_line_timestamp_rejects(line: &str) {
        assert_eq!(parse_line_timestamp(line), None);
    }

    #[test]
    fn test_timestamp_prefix() {
        assert_eq!(
            timestamp_prefix("2024-01-15 10:00:00 UTC::@:[1]:LOG"),
            "2024-01-15 10:00:00 UTC"
        );
        assert_eq!(timestamp_prefix("no colons here"), "no colons here");
        assert_eq!(timestamp_prefix("a:b"), "a:b");
    }

    #[test]
    fn test_split_lines() {
        let lines: Vec<_> = split_lines("one\r\ntwo\n\n   \nthree\n\n").collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert_eq!(split_lines("").count(), 0);
        assert_eq!(split_lines("\n\n").count(), 0);
    }

    #[test_case("x.trc", true)]
    #[test_case("y.xel", true)]
    #[test_case("trace/ORCL_ora_123.TRC", true)]
    #[test_case("error/postgresql.log.2024-01-15-10", false)]
    #[test_case("trace/alert_ORCL.log", false)]
    #[test_case("trc", false)]
    fn test_is_binary_log_file(name: &str, expected: bool) {
        assert_eq!(is_binary_log_file(name), expected);
    }
}
