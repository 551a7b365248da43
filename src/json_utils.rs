use crate::date::TIMESTAMP_PREFIX_LEN;
use serde_json::{Map, Value};

/// Walk nested objects along `path`. None if a key is missing or an intermediate
/// value is not an object.
pub fn lookup_path<'a, S: AsRef<str>>(record: &'a Map<String, Value>, path: &[S]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut cur = record.get(first.as_ref())?;
    for key in rest {
        cur = cur.as_object()?.get(key.as_ref())?;
    }
    Some(cur)
}

/// String value of a top-level field.
pub fn str_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record.get(key).and_then(|v| v.as_str())
}

/// Left-pad the fractional seconds of `2024-01-01T05:00:00.5+0000` to three digits
/// (`…00.005+0000`). Returns None when there is nothing to fix.
pub fn pad_fraction(ts: &str) -> Option<String> {
    let head = ts.get(..TIMESTAMP_PREFIX_LEN)?;
    let rest = ts.get(TIMESTAMP_PREFIX_LEN..)?.strip_prefix('.')?;
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits >= 3 {
        return None;
    }
    let zeros = "0".repeat(3 - digits);
    Some(format!("{}.{}{}", head, zeros, rest))
}

/// Apply `pad_fraction` to the record's timestamp field in place.
pub fn normalize_timestamp_in_place(record: &mut Map<String, Value>, key: &str) {
    if let Some(v) = record.get_mut(key) {
        if let Some(fixed) = v.as_str().and_then(pad_fraction) {
            *v = Value::String(fixed);
        }
    }
}
