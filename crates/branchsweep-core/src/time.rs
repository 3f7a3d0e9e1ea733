use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Parses a `git log --pretty=%cI` timestamp (strict ISO-8601, which is
/// Rfc3339-compatible). Returns None rather than failing: the metadata
/// loader defaults unreadable timestamps to the epoch.
pub fn parse_commit_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).ok()
}

/// Short `YYYY-MM-DD` rendering for tables.
pub fn format_date(value: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        value.year(),
        u8::from(value.month()),
        value.day()
    )
}

/// Whole days between `value` and `now`, clamped at zero for future dates.
pub fn age_in_days(value: OffsetDateTime, now: OffsetDateTime) -> i64 {
    (now - value).whole_days().max(0)
}
