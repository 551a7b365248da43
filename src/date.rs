use anyhow::{anyhow, Result};
use time::macros::format_description;
use time::{Date, Month, PrimitiveDateTime};

/// Length of the `YYYY-MM-DDTHH:MM:SS` prefix every archive timestamp starts with.
pub const TIMESTAMP_PREFIX_LEN: usize = 19;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a second-precision `YYYY-MM-DDTHH:MM:SS` timestamp.
pub fn parse_timestamp(s: &str) -> Result<PrimitiveDateTime> {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(s, fmt)
        .map_err(|e| anyhow!("invalid timestamp {:?} (expected YYYY-MM-DDTHH:MM:SS): {}", s, e))
}

/// Parse the leading `YYYY-MM-DDTHH:MM:SS` of a record timestamp, ignoring
/// fractional seconds and zone suffixes. Returns None when it doesn't parse.
pub fn parse_record_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let head = raw.get(..TIMESTAMP_PREFIX_LEN)?;
    parse_timestamp(head).ok()
}

/// Three-letter English month name as used by the archive directory layout.
pub fn month_abbr(month: Month) -> &'static str {
    MONTH_ABBR[u8::from(month) as usize - 1]
}

/// "01-Jan-2024", used in per-day log lines.
pub fn day_label(day: Date) -> String {
    format!("{:02}-{}-{}", day.day(), month_abbr(day.month()), day.year())
}

/// Inclusive iteration from `start` to `end` (if `start` <= `end`), else empty.
pub fn iter_days(start: Date, end: Date) -> impl Iterator<Item = Date> {
    let mut curr = if start <= end { Some(start) } else { None };
    std::iter::from_fn(move || {
        let ret = curr?;
        curr = ret.next_day().filter(|n| *n <= end);
        Some(ret)
    })
}
