#[path = "common/mod.rs"]
mod common;

use common::record;
use logrecover::{matches, matches_with_field, parse_timestamp, FieldPredicate, TimeRange};
use serde_json::json;

fn jan1_window() -> TimeRange {
    TimeRange::new(
        parse_timestamp("2024-01-01T00:00:00").unwrap(),
        parse_timestamp("2024-01-02T00:00:00").unwrap(),
    )
    .unwrap()
}

fn resource_is(v: &str) -> FieldPredicate {
    FieldPredicate::new(["data", "win", "eventInfo", "resource"], v)
}

fn ev(ts: &str, resource: &str) -> serde_json::Map<String, serde_json::Value> {
    record(json!({"timestamp": ts, "data": {"win": {"eventInfo": {"resource": resource}}}}))
}

/// Window is half-open: min is included, max is not, anything outside is rejected.
#[test]
fn window_is_half_open() {
    let range = jan1_window();
    assert!(matches(&ev("2024-01-01T00:00:00", "x"), &range, &[]));
    assert!(matches(&ev("2024-01-01T23:59:59", "x"), &range, &[]));
    assert!(!matches(&ev("2023-12-31T23:59:59", "x"), &range, &[]));
    assert!(!matches(&ev("2024-01-02T00:00:00", "x"), &range, &[]));
    assert!(!matches(&ev("2024-03-01T12:00:00", "x"), &range, &[]));
}

/// Archive timestamps carry milliseconds and a zone suffix; only the first 19 chars count.
#[test]
fn fractional_and_zone_suffix_are_ignored() {
    let range = jan1_window();
    assert!(matches(&ev("2024-01-01T05:00:00.123+0000", "x"), &range, &[]));
    assert!(!matches(&ev("2024-01-02T00:00:00.001+0000", "x"), &range, &[]));
}

/// Missing, non-string or garbage timestamps are plain rejections.
#[test]
fn bad_timestamps_do_not_match() {
    let range = jan1_window();
    assert!(!matches(&record(json!({"data": {}})), &range, &[]));
    assert!(!matches(&record(json!({"timestamp": 1704067200})), &range, &[]));
    assert!(!matches(&record(json!({"timestamp": "yesterday"})), &range, &[]));
    assert!(!matches(&record(json!({"timestamp": "2024-01-01"})), &range, &[]));
}

/// In range + all predicates equal => match; changing one expected value flips it.
#[test]
fn predicates_are_conjunctive_and_exact() {
    let range = jan1_window();
    let r = record(json!({
        "timestamp": "2024-01-01T05:00:00",
        "rule": {"level": 5},
        "data": {"win": {"eventInfo": {"resource": "a@mail.com"}}}
    }));
    let level_5 = FieldPredicate::new(["rule", "level"], 5);

    assert!(matches(&r, &range, &[resource_is("a@mail.com"), level_5.clone()]));
    assert!(!matches(&r, &range, &[resource_is("b@mail.com"), level_5.clone()]));
    assert!(!matches(&r, &range, &[resource_is("a@mail.com"), FieldPredicate::new(["rule", "level"], 6)]));
    // Type matters: the string "5" is not the number 5.
    assert!(!matches(&r, &range, &[FieldPredicate::new(["rule", "level"], "5")]));
}

/// Missing intermediate keys and non-object intermediates reject the record.
#[test]
fn unresolvable_paths_do_not_match() {
    let range = jan1_window();
    let no_win = record(json!({"timestamp": "2024-01-01T05:00:00", "data": {"linux": {}}}));
    let scalar_win = record(json!({"timestamp": "2024-01-01T05:00:00", "data": {"win": "n/a"}}));
    assert!(!matches(&no_win, &range, &[resource_is("a@mail.com")]));
    assert!(!matches(&scalar_win, &range, &[resource_is("a@mail.com")]));
}

#[test]
fn matching_is_idempotent() {
    let range = jan1_window();
    let preds = [resource_is("a@mail.com")];
    let r = ev("2024-01-01T05:00:00", "a@mail.com");
    let first = matches(&r, &range, &preds);
    let second = matches(&r, &range, &preds);
    assert!(first);
    assert_eq!(first, second);
}

#[test]
fn custom_timestamp_field() {
    let range = jan1_window();
    let r = record(json!({"@timestamp": "2024-01-01T05:00:00", "timestamp": "1999-01-01T00:00:00"}));
    assert!(matches_with_field(&r, "@timestamp", &range, &[]));
    assert!(!matches(&r, &range, &[]));
}

#[test]
fn inverted_window_is_rejected() {
    let min = parse_timestamp("2024-01-02T00:00:00").unwrap();
    let max = parse_timestamp("2024-01-01T00:00:00").unwrap();
    assert!(TimeRange::new(min, max).is_err());
    assert!(parse_timestamp("2024-01-01 00:00:00").is_err());
}

/// `PATH=VALUE` parsing: JSON scalars are typed, anything else is a string.
#[test]
fn field_predicate_from_str() {
    let p: FieldPredicate = "data.win.eventInfo.resource=a@mail.com".parse().unwrap();
    assert_eq!(p, resource_is("a@mail.com"));

    let n: FieldPredicate = "rule.level=5".parse().unwrap();
    assert_eq!(n.expected, json!(5));

    let s: FieldPredicate = "rule.level=\"5\"".parse().unwrap();
    assert_eq!(s.expected, json!("5"));

    let b: FieldPredicate = "syscheck.changed=true".parse().unwrap();
    assert_eq!(b.path, vec!["syscheck".to_string(), "changed".to_string()]);
    assert_eq!(b.expected, json!(true));

    assert!("no_equals_sign".parse::<FieldPredicate>().is_err());
    assert!("data..resource=x".parse::<FieldPredicate>().is_err());
    assert!("data.tags=[1,2]".parse::<FieldPredicate>().is_err());
}
