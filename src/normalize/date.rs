use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\+?\s*(minute|hour|day|week|month)s?\s*ago").expect("valid relative date pattern")
});

const NAIVE_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Resolves posting-date text against the current time. Never fails.
pub fn parse_posted_date(text: &str, offset: FixedOffset) -> DateTime<Utc> {
    parse_posted_date_at(text, offset, Utc::now())
}

/// Like [`parse_posted_date`] with an explicit "now". Zone-less absolute
/// dates are read in `offset`; anything unrecognised resolves to `now`.
pub fn parse_posted_date_at(text: &str, offset: FixedOffset, now: DateTime<Utc>) -> DateTime<Utc> {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();

    if lowered.is_empty() || lowered == "today" || lowered == "just now" {
        return now;
    }

    if let Some(caps) = RELATIVE.captures(&lowered) {
        let amount: i64 = caps[1].parse().unwrap_or(0);
        let delta = match &caps[2] {
            "minute" => Duration::try_minutes(amount),
            "hour" => Duration::try_hours(amount),
            "day" => Duration::try_days(amount),
            "week" => Duration::try_weeks(amount),
            _ => amount.checked_mul(30).and_then(Duration::try_days),
        };
        return delta
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(now);
    }

    parse_absolute(trimmed, offset).unwrap_or(now)
}

fn parse_absolute(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return in_offset(naive, offset);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| in_offset(naive, offset))
}

fn in_offset(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
