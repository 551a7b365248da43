//! Record filtering: timestamp window plus nested field equality. Pure functions.

use crate::date::parse_record_timestamp;
use crate::gz_jsonl::LogRecord;
use crate::json_utils::{lookup_path, str_field};
use crate::query::FieldPredicate;
use anyhow::{bail, Result};
use time::{Date, PrimitiveDateTime};

pub const DEFAULT_TIMESTAMP_FIELD: &str = "timestamp";

/// Half-open recovery window `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    min: PrimitiveDateTime,
    max: PrimitiveDateTime,
}

impl TimeRange {
    pub fn new(min: PrimitiveDateTime, max: PrimitiveDateTime) -> Result<Self> {
        if min > max {
            bail!("min timestamp {} is after max timestamp {}", min, max);
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> PrimitiveDateTime {
        self.min
    }
    pub fn max(&self) -> PrimitiveDateTime {
        self.max
    }

    #[inline]
    pub fn contains(&self, ts: PrimitiveDateTime) -> bool {
        self.min <= ts && ts < self.max
    }

    /// First and last calendar day the driver has to visit.
    pub fn day_bounds(&self) -> (Date, Date) {
        (self.min.date(), self.max.date())
    }
}

/// Everything a record is checked against.
#[derive(Clone, Debug)]
pub struct FilterSpec {
    pub range: TimeRange,
    pub predicates: Vec<FieldPredicate>,
    pub timestamp_field: String,
}

impl FilterSpec {
    pub fn new(range: TimeRange, predicates: Vec<FieldPredicate>) -> Self {
        Self { range, predicates, timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string() }
    }

    #[inline]
    pub fn matches(&self, record: &LogRecord) -> bool {
        matches_with_field(record, &self.timestamp_field, &self.range, &self.predicates)
    }
}

/// `matches` using the default `timestamp` key.
pub fn matches(record: &LogRecord, range: &TimeRange, predicates: &[FieldPredicate]) -> bool {
    matches_with_field(record, DEFAULT_TIMESTAMP_FIELD, range, predicates)
}

pub fn matches_with_field(
    record: &LogRecord,
    timestamp_field: &str,
    range: &TimeRange,
    predicates: &[FieldPredicate],
) -> bool {
    let ts = match str_field(record, timestamp_field).and_then(parse_record_timestamp) {
        Some(ts) => ts,
        None => return false,
    };
    if !range.contains(ts) {
        return false;
    }
    predicates.iter().all(|p| predicate_holds(record, p))
}

#[inline]
pub fn predicate_holds(record: &LogRecord, p: &FieldPredicate) -> bool {
    matches!(lookup_path(record, &p.path), Some(v) if *v == p.expected)
}
