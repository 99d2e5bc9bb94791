//! Integration tests for the `driftlog-event` public surface.
//!
//! Exercises the contract downstream stages rely on: reserved fields,
//! timestamp import and round-trips, the JSON layer, and format strings.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use driftlog_event::{Event, EventError, JsonError, Map, Timestamp, TimestampError, Value, json};

fn event_at(seconds: i64) -> Event {
    let mut event = Event::new(Map::new());
    event.set_timestamp(Timestamp::at(seconds, 0).expect("valid instant"));
    event
}

#[test]
fn iso8601_round_trip_keeps_epoch_seconds() {
    for _ in 0..100 {
        let now = Timestamp::now();
        let parsed = Timestamp::parse_iso8601(&now.to_iso8601()).unwrap();
        assert_eq!(parsed.epoch_seconds(), now.epoch_seconds());
    }
}

#[test]
fn import_agrees_across_input_kinds() {
    let time = Utc.with_ymd_and_hms(2014, 9, 23, 12, 34, 56).unwrap();
    let timestamp = Timestamp::from(time);
    let text = timestamp.to_iso8601();

    let from_timestamp = Timestamp::import(timestamp).unwrap().unwrap();
    let from_time = Timestamp::import(time).unwrap().unwrap();
    let from_text = Timestamp::import(text.as_str()).unwrap().unwrap();

    assert_eq!(from_timestamp.epoch_seconds(), time.timestamp());
    assert_eq!(from_time.epoch_seconds(), time.timestamp());
    assert_eq!(from_text.epoch_seconds(), time.timestamp());
}

#[test]
fn import_rejects_garbage_and_ignores_unsupported_kinds() {
    assert!(matches!(
        Timestamp::import("foobar"),
        Err(TimestampError::TimestampParser { .. })
    ));
    assert_eq!(Timestamp::import(&Value::from(42)).unwrap(), None);
    assert_eq!(Timestamp::import(&Value::Null).unwrap(), None);
}

#[test]
fn normalize_is_idempotent() {
    let tree: serde_json::Value = serde_json::json!({
        "a": [1, 2.5, {"b": null}],
        "c": {"d": "e", "f": [true, false]},
    });
    let once = json::normalize(tree);
    let twice = json::normalize(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn json_round_trip_and_parser_error() {
    let value: Value = [
        ("string", Value::from("hello")),
        ("number", Value::from(42)),
        ("float", Value::from(0.25)),
        ("list", Value::from(vec![Value::from(1), Value::Null, Value::from("x")])),
        ("nested", [("k", Value::from(true))].into_iter().collect()),
    ]
    .into_iter()
    .collect();

    let encoded = json::encode(&value).unwrap();
    assert_eq!(json::decode(&encoded).unwrap(), value);
    assert!(matches!(json::decode("abc"), Err(JsonError::Parser(_))));
}

#[test]
fn new_event_has_version_and_current_timestamp() {
    let event = Event::new(Map::new());
    assert_eq!(event.get("@version"), Some(&Value::from("1")));

    let stamp = event.get("@timestamp").and_then(Value::as_timestamp).unwrap();
    let delta = Timestamp::now().epoch_seconds() - stamp.epoch_seconds();
    assert!(delta.abs() <= 2, "timestamp {stamp} too far from now");
}

#[test]
fn timestamp_field_only_accepts_timestamps() {
    let mut event = Event::new(Map::new());
    assert!(matches!(
        event.set("@timestamp", "not-a-timestamp"),
        Err(EventError::TimestampType { .. })
    ));
    assert!(event.set("@timestamp", Timestamp::now()).is_ok());
}

#[test]
fn timestamp_field_cannot_be_reached_mutably() {
    let mut event = event_at(1_700_000_000);
    assert!(event.get_mut("@timestamp").is_none());
    assert!(event.get_mut("[@timestamp]").is_none());
    assert_eq!(event.sprintf("%{+%s}").unwrap(), "1700000000");

    event.set_timestamp(Timestamp::at(1_700_000_060, 0).unwrap());
    assert_eq!(event.sprintf("%{+%s}").unwrap(), "1700000060");
}

#[test]
fn clone_gives_an_independent_copy() {
    let mut data = Map::new();
    data.insert(
        "a".to_owned(),
        [("b", Value::from(1))].into_iter().collect(),
    );
    let original = Event::new(data);

    let mut copy = original.clone();
    *copy.get_mut("[a][b]").unwrap() = Value::from(2);
    assert_eq!(original.get("[a][b]"), Some(&Value::from(1)));

    copy.set("a", Map::new()).unwrap();
    assert_eq!(original.get("[a][b]"), Some(&Value::from(1)));
    assert_eq!(copy.get("[a][b]"), None);
}

#[test]
fn sprintf_substitutes_and_preserves_missing_tokens() {
    let mut event = event_at(1_700_000_000);
    event.set("type", "foo").unwrap();
    assert_eq!(
        event.sprintf("type is %{type} and ts is %{+%s}").unwrap(),
        "type is foo and ts is 1700000000"
    );

    let event = event_at(1_700_000_000);
    assert_eq!(
        event.sprintf("type is %{type} and ts is %{+%s}").unwrap(),
        "type is %{type} and ts is 1700000000"
    );
}

#[test]
fn tag_is_set_like_and_ordered() {
    let mut event = Event::new(Map::new());
    event.tag("x");
    event.tag("x");
    assert_eq!(event.get("tags"), Some(&Value::from(vec!["x"])));
    event.tag("y");
    assert_eq!(event.get("tags"), Some(&Value::from(vec!["x", "y"])));
}

#[test]
fn decoded_events_render_back_to_the_same_shape() {
    let event = Event::from_json(
        r#"{"@timestamp":"2013-02-09T20:39:26.234Z","@version":"1","message":"hello world"}"#,
    )
    .unwrap();
    let encoded = event.to_json().unwrap();
    assert_eq!(
        encoded,
        r#"{"@timestamp":"2013-02-09T20:39:26.234Z","@version":"1","message":"hello world"}"#
    );
}
