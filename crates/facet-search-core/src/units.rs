//! Value parsing for time-window and size predicates
//!
//! Every parser returns `None` for input it cannot read; the evaluator turns
//! that into an empty match set.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::config::SearchConfig;

const MS_PER_DAY: i64 = 86_400_000;

/// `<N>[d|m|y]`, bare N = days
static PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+)\s*([dmy]?)\s*$").expect("period regex"));

/// `<N>[K|M|G][B]`, bare N = bytes
static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+)\s*([kmg]?)b?\s*$").expect("size regex"));

/// Epoch seconds (at least 9 digits, so `20240115` stays a date)
static EPOCH_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{9,}$").expect("epoch regex"));

const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d", "%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y.%m.%d", "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Length of an `older_than:` / `newer_than:` period in milliseconds.
#[must_use]
pub fn parse_period_ms(value: &str, config: &SearchConfig) -> Option<i64> {
    let caps = PERIOD.captures(value)?;
    let n: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit_days = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("m") => i64::from(config.month_days),
        Some("y") => i64::from(config.year_days),
        _ => 1,
    };
    n.checked_mul(unit_days)?.checked_mul(MS_PER_DAY)
}

/// Byte count for `larger:` / `smaller:` / `size:`. Suffixes are binary.
#[must_use]
pub fn parse_size_bytes(value: &str) -> Option<u64> {
    let caps = SIZE.captures(value)?;
    let n: u64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier: u64 = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("k") => 1 << 10,
        Some("m") => 1 << 20,
        Some("g") => 1 << 30,
        _ => 1,
    };
    n.checked_mul(multiplier)
}

/// Instant (ms since epoch, UTC) named by an `after:` / `before:` value.
///
/// Calendar dates resolve to the start of that day in UTC, so `after:` is
/// inclusive of the day and `before:` exclusive of it. Relative words
/// (`today`, `yesterday`, `last week|month|year`) resolve to the start of the
/// day that many days before `now`.
#[must_use]
pub fn parse_date_ms(value: &str, now: DateTime<Utc>, config: &SearchConfig) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(days_back) = relative_days(trimmed, config) {
        let day = now.date_naive().checked_sub_days(Days::new(days_back))?;
        return Some(day_start_ms(day));
    }

    if EPOCH_SECONDS.is_match(trimmed) {
        let secs: i64 = trimmed.parse().ok()?;
        return secs.checked_mul(1000);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }

    let iso = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(iso, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(day_start_ms)
}

fn relative_days(value: &str, config: &SearchConfig) -> Option<u64> {
    let words: Vec<String> = value
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["today"] => Some(0),
        ["yesterday"] => Some(1),
        ["last", "week"] => Some(7),
        ["last", "month"] => Some(u64::from(config.month_days)),
        ["last", "year"] => Some(u64::from(config.year_days)),
        _ => None,
    }
}

fn day_start_ms(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> SearchConfig {
        SearchConfig::default()
    }

    fn utc_ms(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn periods() {
        let cfg = config();
        assert_eq!(parse_period_ms("3d", &cfg), Some(3 * MS_PER_DAY));
        assert_eq!(parse_period_ms("2", &cfg), Some(2 * MS_PER_DAY));
        assert_eq!(parse_period_ms("1M", &cfg), Some(30 * MS_PER_DAY));
        assert_eq!(parse_period_ms("1y", &cfg), Some(365 * MS_PER_DAY));
        assert_eq!(parse_period_ms("1w", &cfg), None);
        assert_eq!(parse_period_ms("-1d", &cfg), None);
        assert_eq!(parse_period_ms("", &cfg), None);
    }

    #[test]
    fn period_units_follow_config() {
        let cfg = SearchConfig {
            month_days: 31,
            year_days: 366,
            ..SearchConfig::default()
        };
        assert_eq!(parse_period_ms("1m", &cfg), Some(31 * MS_PER_DAY));
        assert_eq!(parse_period_ms("1y", &cfg), Some(366 * MS_PER_DAY));
    }

    #[test]
    fn period_overflow_is_none() {
        assert_eq!(parse_period_ms("99999999999999999y", &config()), None);
    }

    #[test]
    fn sizes() {
        assert_eq!(parse_size_bytes("1000"), Some(1000));
        assert_eq!(parse_size_bytes("10K"), Some(10 * 1024));
        assert_eq!(parse_size_bytes("5m"), Some(5 * 1024 * 1024));
        assert_eq!(parse_size_bytes("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size_bytes("2MB"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size_bytes("big"), None);
        assert_eq!(parse_size_bytes("1.5M"), None);
    }

    #[test]
    fn calendar_dates_resolve_to_day_start() {
        let now = Utc::now();
        let cfg = config();
        let expected = utc_ms(2024, 1, 15);
        for raw in [
            "2024/01/15",
            "01/15/2024",
            "2024-01-15",
            "01-15-2024",
            "15/01/2024",
            "15-01-2024",
            "2024.01.15",
            "15.01.2024",
        ] {
            assert_eq!(parse_date_ms(raw, now, &cfg), Some(expected), "{raw}");
        }
    }

    #[test]
    fn month_first_wins_when_ambiguous() {
        assert_eq!(
            parse_date_ms("03/04/2024", Utc::now(), &config()),
            Some(utc_ms(2024, 3, 4))
        );
    }

    #[test]
    fn datetimes() {
        let now = Utc::now();
        let cfg = config();
        let expected = utc_ms(2024, 1, 15) + 10 * 3_600_000 + 30 * 60_000;
        for raw in [
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00Z",
            "2024-01-15T11:30:00+01:00",
            "2024/01/15 10:30:00",
            "01/15/2024 10:30:00",
            "2024-01-15 10:30:00",
        ] {
            assert_eq!(parse_date_ms(raw, now, &cfg), Some(expected), "{raw}");
        }
    }

    #[test]
    fn epoch_seconds() {
        assert_eq!(
            parse_date_ms("1705276800", Utc::now(), &config()),
            Some(utc_ms(2024, 1, 15))
        );
    }

    #[test]
    fn relative_words() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 45, 0).single().unwrap();
        let cfg = config();
        assert_eq!(parse_date_ms("today", now, &cfg), Some(utc_ms(2024, 3, 10)));
        assert_eq!(parse_date_ms("Yesterday", now, &cfg), Some(utc_ms(2024, 3, 9)));
        assert_eq!(parse_date_ms("last week", now, &cfg), Some(utc_ms(2024, 3, 3)));
        assert_eq!(parse_date_ms("last_month", now, &cfg), Some(utc_ms(2024, 2, 9)));
        assert_eq!(parse_date_ms("last-year", now, &cfg), Some(utc_ms(2023, 3, 11)));
    }

    #[test]
    fn relative_words_past_calendar_range_are_none() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).single().unwrap();
        let cfg = SearchConfig {
            month_days: u32::MAX,
            year_days: u32::MAX,
            ..SearchConfig::default()
        };
        assert_eq!(parse_date_ms("last year", now, &cfg), None);
        assert_eq!(parse_date_ms("last month", now, &cfg), None);
        assert_eq!(parse_date_ms("today", now, &cfg), Some(utc_ms(2024, 3, 10)));
    }

    #[test]
    fn garbage_dates() {
        let now = Utc::now();
        let cfg = config();
        for raw in ["", "soon", "2024/13/45", "last fortnight", "12345"] {
            assert_eq!(parse_date_ms(raw, now, &cfg), None, "{raw}");
        }
    }
}
