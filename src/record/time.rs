//! Timestamp helpers for record columns

use chrono::{
    DateTime, FixedOffset, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Utc,
};
use regex::Regex;
use std::sync::OnceLock;

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Korea Standard Time (UTC+09:00), used for the `crawled_at_kst` column
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

/// RFC 3339 with microsecond precision
pub fn format_crawl_timestamp<Tz: TimeZone>(at: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn relative_hours() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s+hours?\s+ago").expect("valid regex"))
}

fn relative_minutes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s+minutes?\s+ago").expect("valid regex"))
}

fn absolute_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{2}-\d{2}-\d{2},\s+\d{2}:\d{2}\s+[AP]M)").expect("valid regex")
    })
}

/// Normalises a forum post date to RFC 3339 UTC.
///
/// Understands `7 hours ago`, `12 minutes ago`, `Yesterday, 02:50 PM`,
/// `Today, 02:50 PM` and `16-05-25, 02:12 PM` (day-month-year). Board times
/// are rendered in UTC. Anything else yields an empty string.
pub fn normalize_posted_at(input: &str, now: DateTime<Utc>) -> String {
    let clean = input.trim();
    match parse_posted_at(clean, now) {
        Some(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        None => {
            if !clean.is_empty() {
                tracing::warn!("Unrecognised post date format: '{}'", clean);
            }
            String::new()
        }
    }
}

fn parse_posted_at(clean: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(caps) = relative_hours().captures(clean) {
        let hours: i64 = caps[1].parse().ok()?;
        return subtract(now, TimeDelta::try_hours(hours), clean);
    }

    if let Some(caps) = relative_minutes().captures(clean) {
        let minutes: i64 = caps[1].parse().ok()?;
        return subtract(now, TimeDelta::try_minutes(minutes), clean);
    }

    if clean.starts_with("Yesterday") || clean.starts_with("Today") {
        let (day, time) = clean.split_once(',')?;
        let time = NaiveTime::parse_from_str(time.trim(), "%I:%M %p").ok()?;
        let date = if day.trim() == "Yesterday" {
            subtract(now, TimeDelta::try_days(1), clean)?.date_naive()
        } else {
            now.date_naive()
        };
        return Some(Utc.from_utc_datetime(&date.and_time(time)));
    }

    if let Some(caps) = absolute_date().captures(clean) {
        let naive = NaiveDateTime::parse_from_str(&caps[1], "%d-%m-%y, %I:%M %p").ok()?;
        return Some(Utc.from_utc_datetime(&naive));
    }

    None
}

/// `now - delta`, or `None` when the offset is outside chrono's range
fn subtract(now: DateTime<Utc>, delta: Option<TimeDelta>, raw: &str) -> Option<DateTime<Utc>> {
    let at = delta.and_then(|delta| now.checked_sub_signed(delta));
    if at.is_none() {
        tracing::warn!("Post date '{}' is out of range", raw);
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_hours_ago() {
        assert_eq!(
            normalize_posted_at("7 hours ago", now()),
            "2025-05-20T05:00:00+00:00"
        );
        assert_eq!(
            normalize_posted_at("1 hour ago", now()),
            "2025-05-20T11:00:00+00:00"
        );
    }

    #[test]
    fn test_out_of_range_relative_date_is_empty() {
        assert_eq!(normalize_posted_at("9999999999 hours ago", now()), "");
        assert_eq!(normalize_posted_at("99999999999999 hours ago", now()), "");
        assert_eq!(normalize_posted_at("999999999999999 minutes ago", now()), "");
        // does not fit in an i64
        assert_eq!(
            normalize_posted_at("99999999999999999999 minutes ago", now()),
            ""
        );
    }

    #[test]
    fn test_minutes_ago() {
        assert_eq!(
            normalize_posted_at("15 minutes ago", now()),
            "2025-05-20T11:45:00+00:00"
        );
    }

    #[test]
    fn test_yesterday_and_today() {
        assert_eq!(
            normalize_posted_at("Yesterday, 02:50 PM", now()),
            "2025-05-19T14:50:00+00:00"
        );
        assert_eq!(
            normalize_posted_at("Today, 09:05 AM", now()),
            "2025-05-20T09:05:00+00:00"
        );
    }

    #[test]
    fn test_absolute_date() {
        assert_eq!(
            normalize_posted_at("16-05-25, 02:12 PM", now()),
            "2025-05-16T14:12:00+00:00"
        );
    }

    #[test]
    fn test_absolute_date_with_surrounding_text() {
        assert_eq!(
            normalize_posted_at("  Posted 16-05-25, 02:12 PM (edited) ", now()),
            "2025-05-16T14:12:00+00:00"
        );
    }

    #[test]
    fn test_unknown_format_is_empty() {
        assert_eq!(normalize_posted_at("last week", now()), "");
        assert_eq!(normalize_posted_at("", now()), "");
    }

    #[test]
    fn test_crawl_timestamp_has_microseconds() {
        assert_eq!(
            format_crawl_timestamp(now()),
            "2025-05-20T12:00:00.000000+00:00"
        );
        assert_eq!(
            format_crawl_timestamp(now().with_timezone(&kst())),
            "2025-05-20T21:00:00.000000+09:00"
        );
    }
}
