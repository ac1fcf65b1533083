//! Best-effort normalization of the timestamps shown in the feed.
//!
//! The feed mixes relative markers ("3 hrs ago", "昨天 12:30"), a full
//! absolute format and bare dates. Each form is handled by an independent
//! [`Strategy`]; [`normalize`] tries them in order and falls back to the
//! reference instant, so an unrecognized string reads as "recent" and never
//! ends a scan early.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone};
use regex::Regex;

/// A single parsing attempt. Returns `None` when the input is not in the
/// strategy's format (or names an impossible date).
pub type Strategy = fn(&str, &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>>;

/// Strategies in priority order.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("relative", relative_recency),
    ("yesterday", yesterday),
    ("absolute", absolute),
    ("month_day", month_day),
    ("year_month_day", year_month_day),
];

/// Full format used by the API, e.g. `Sun Nov 30 12:46:08 +0800 2025`.
pub const ABSOLUTE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

static RELATIVE_RECENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)just now|刚刚|\d+\s*(?:mins?|minutes?|hrs?|hours?)\s+ago|\d+\s*(?:分钟|小时)前")
        .unwrap()
});

static YESTERDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:yesterday|昨天)").unwrap());

static MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})$").unwrap());

static YEAR_MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());

/// Convert a feed timestamp to an instant, expressed in the offset of
/// `reference_now`.
///
/// Never fails: input no strategy recognizes yields `reference_now`.
#[must_use]
pub fn normalize(raw: &str, reference_now: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let raw = raw.trim();
    STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(raw, reference_now))
        .unwrap_or(*reference_now)
}

/// Fractional seconds since the Unix epoch.
#[must_use]
pub fn to_epoch(instant: &DateTime<FixedOffset>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1_000_000.0
}

/// "just now", "N mins ago", "N hrs ago" and their Chinese forms.
///
/// Hour-level precision is not attempted; these all map to the reference.
pub fn relative_recency(
    raw: &str,
    reference_now: &DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    RELATIVE_RECENT.is_match(raw).then_some(*reference_now)
}

/// "Yesterday 12:30" / "昨天 12:30": exactly one day before the reference.
pub fn yesterday(raw: &str, reference_now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    YESTERDAY
        .is_match(raw)
        .then(|| *reference_now - Duration::days(1))
}

/// The full absolute format, converted to the reference offset.
pub fn absolute(raw: &str, reference_now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, ABSOLUTE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(reference_now.offset()))
}

/// `MM-DD`, in the reference year.
pub fn month_day(raw: &str, reference_now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let caps = MONTH_DAY.captures(raw)?;
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    local_midnight(reference_now, reference_now.year(), month, day)
}

/// `YYYY-MM-DD`.
pub fn year_month_day(
    raw: &str,
    reference_now: &DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    let caps = YEAR_MONTH_DAY.captures(raw)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    local_midnight(reference_now, year, month, day)
}

fn local_midnight(
    reference_now: &DateTime<FixedOffset>,
    year: i32,
    month: u32,
    day: u32,
) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    reference_now.offset().from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-12-01T10:00:00+08:00").unwrap()
    }

    #[test]
    fn test_relative_markers_map_to_reference() {
        let now = reference();
        for raw in [
            "just now",
            "Just now",
            "5 mins ago",
            "1 min ago",
            "3 hrs ago",
            "1 hr ago",
            "12 hours ago",
            "刚刚",
            "20分钟前",
            "2小时前",
        ] {
            let parsed = normalize(raw, &now);
            assert_eq!(parsed, now, "{raw}");
            assert_eq!(parsed.date_naive(), now.date_naive(), "{raw}");
        }
    }

    #[test]
    fn test_yesterday_is_exactly_one_day_back() {
        let now = reference();
        assert_eq!(normalize("Yesterday 12:30", &now), now - Duration::days(1));
        assert_eq!(normalize("昨天 08:15", &now), now - Duration::days(1));
    }

    #[test]
    fn test_absolute_format_is_offset_independent() {
        let raw = "Sun Nov 30 12:46:08 +0800 2025";
        let east = reference();
        let west = DateTime::parse_from_rfc3339("2025-12-01T10:00:00-05:00").unwrap();
        let utc = DateTime::parse_from_rfc3339("2025-12-01T02:00:00+00:00").unwrap();

        for now in [east, west, utc] {
            let parsed = normalize(raw, &now);
            assert_eq!(parsed.timestamp(), 1_764_477_968);
            assert_eq!(parsed.offset(), now.offset());
        }
        assert!((to_epoch(&normalize(raw, &west)) - 1_764_477_968.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_month_day_uses_reference_year() {
        let now = reference();
        let parsed = normalize("03-14", &now);
        assert_eq!(parsed.timestamp(), 1_741_881_600);
        assert_eq!(parsed.format("%Y-%m-%d %H:%M").to_string(), "2025-03-14 00:00");
    }

    #[test]
    fn test_full_date() {
        let now = reference();
        let parsed = normalize("2023-07-09", &now);
        assert_eq!(parsed.format("%Y-%m-%d %H:%M").to_string(), "2023-07-09 00:00");
        assert_eq!(parsed.offset(), now.offset());
    }

    #[test]
    fn test_invalid_dates_fall_back_to_reference() {
        let now = reference();
        assert_eq!(normalize("02-30", &now), now);
        assert_eq!(normalize("2024-13-01", &now), now);
        assert_eq!(normalize("", &now), now);
        assert_eq!(normalize("sometime last spring", &now), now);
        assert_eq!(normalize("Mon Foo 99 12:00:00 +0800 2025", &now), now);
    }

    #[test]
    fn test_strategies_are_independent() {
        let now = reference();
        assert!(absolute("03-14", &now).is_none());
        assert!(month_day("2025-03-14", &now).is_none());
        assert!(year_month_day("03-14", &now).is_none());
        assert!(relative_recency("Yesterday 12:30", &now).is_none());
        assert!(yesterday("5 mins ago", &now).is_none());
    }

    #[test]
    fn test_strategy_order() {
        let names: Vec<&str> = STRATEGIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["relative", "yesterday", "absolute", "month_day", "year_month_day"]
        );
    }
}
