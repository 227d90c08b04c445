use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime};

/// Date-only layouts tried in order. Day-first wins over month-first for
/// ambiguous numeric dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Best-effort interpretation of a human-supplied date.
///
/// Accepts ISO dates, RFC 3339 and RFC 2822 timestamps, common numeric
/// layouts, English month names (full or abbreviated), and the relative
/// forms `today`, `yesterday`, `tomorrow` and `N days|weeks ago`.
/// Relative forms are resolved against `today`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use newsboard::util::parse_date_loose;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
/// assert_eq!(
///     parse_date_loose("Jan 5, 2024", today),
///     NaiveDate::from_ymd_opt(2024, 1, 5)
/// );
/// assert_eq!(
///     parse_date_loose("3 days ago", today),
///     NaiveDate::from_ymd_opt(2024, 3, 7)
/// );
/// assert_eq!(parse_date_loose("not-a-date", today), None);
/// ```
pub fn parse_date_loose(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(date) = parse_relative(trimmed, today) {
        return Some(date);
    }

    if let Some(timestamp) = parse_timestamp(trimmed) {
        return Some(timestamp.date_naive());
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    {
        return Some(dt.date());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Parses an upstream feed timestamp (`pubDate`, `updated`, ...).
///
/// RFC 2822 is what RSS mandates; RFC 3339 covers Atom. The offset carried by
/// the string is kept so the calendar date matches what the feed published.
pub fn parse_timestamp(input: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = input.trim();
    DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
}

fn parse_relative(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = input.to_ascii_lowercase();
    match lower.as_str() {
        "today" | "now" => return Some(today),
        "yesterday" => return today.pred_opt(),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }

    let rest = lower.strip_suffix(" ago")?;
    let mut parts = rest.split_whitespace();
    let amount: u64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let days = match unit.trim_end_matches('s') {
        "day" => amount,
        "week" => amount.checked_mul(7)?,
        _ => return None,
    };
    today.checked_sub_days(Days::new(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_and_numeric_layouts() {
        let today = ymd(2024, 6, 1);
        assert_eq!(parse_date_loose("2024-01-05", today), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date_loose("2024/01/05", today), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date_loose("05/01/2024", today), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date_loose("05-01-2024", today), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date_loose(" 2024-01-05 ", today), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_month_names() {
        let today = ymd(2024, 6, 1);
        assert_eq!(
            parse_date_loose("January 5, 2024", today),
            Some(ymd(2024, 1, 5))
        );
        assert_eq!(parse_date_loose("5 Jan 2024", today), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_timestamps() {
        let today = ymd(2024, 6, 1);
        assert_eq!(
            parse_date_loose("Fri, 05 Jan 2024 08:00:00 GMT", today),
            Some(ymd(2024, 1, 5))
        );
        assert_eq!(
            parse_date_loose("2024-01-05T23:30:00+01:00", today),
            Some(ymd(2024, 1, 5))
        );
        assert_eq!(
            parse_date_loose("2024-01-05 12:00:00", today),
            Some(ymd(2024, 1, 5))
        );
    }

    #[test]
    fn test_relative_forms() {
        let today = ymd(2024, 3, 1);
        assert_eq!(parse_date_loose("today", today), Some(today));
        assert_eq!(parse_date_loose("Yesterday", today), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_date_loose("tomorrow", today), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_date_loose("1 day ago", today), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_date_loose("2 weeks ago", today), Some(ymd(2024, 2, 16)));
    }

    #[test]
    fn test_garbage_rejected() {
        let today = ymd(2024, 3, 1);
        assert_eq!(parse_date_loose("not-a-date", today), None);
        assert_eq!(parse_date_loose("", today), None);
        assert_eq!(parse_date_loose("3 fortnights ago", today), None);
        assert_eq!(parse_date_loose("2024-13-45", today), None);
    }

    #[test]
    fn test_timestamp_keeps_offset_date() {
        let ts = parse_timestamp("Sun, 31 Dec 2023 23:30:00 -0500").unwrap();
        assert_eq!(ts.date_naive(), ymd(2023, 12, 31));
        assert!(parse_timestamp("yesterday").is_none());
    }
}
