//! The `%{...}` format-string engine.
//!
//! Tokens are scanned left to right and rendered independently:
//!
//! - `%{+%s}` -- the event's `@timestamp` as Unix epoch seconds
//! - `%{+pattern}` -- `@timestamp` in UTC through a [Joda-style pattern](crate::date_pattern)
//! - `%{field}` -- the value at a field reference; arrays are comma-joined,
//!   objects rendered as JSON, other values via [`Value::to_text`]
//!
//! A field that is missing or null leaves its token in the output as
//! written, so unresolved placeholders stay visible downstream. `%{}` and
//! an unterminated `%{` are plain text.

use crate::date_pattern;
use crate::error::EventError;
use crate::event::Event;
use crate::timestamp::Timestamp;
use crate::value::Value;

/// Token for the epoch-seconds rendering of `@timestamp`.
const EPOCH_SECONDS: &str = "+%s";

/// Render `format` against `event`.
///
/// # Errors
///
/// Returns [`EventError::MissingTimestamp`] if a date token is used on an
/// event without `@timestamp`, [`EventError::DatePattern`] for an
/// unsupported pattern, and [`EventError::Json`] if an object field cannot
/// be encoded.
pub fn sprintf(event: &Event, format: &str) -> Result<String, EventError> {
    if !format.contains('%') {
        return Ok(format.to_owned());
    }

    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while let Some((before, after)) = rest.split_once("%{") {
        out.push_str(before);
        match after.split_once('}') {
            Some(("", _)) => {
                out.push_str("%{");
                rest = after;
            }
            Some((key, tail)) => {
                render_token(event, key, &mut out)?;
                rest = tail;
            }
            None => {
                out.push_str("%{");
                rest = after;
                break;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn render_token(event: &Event, key: &str, out: &mut String) -> Result<(), EventError> {
    if key == EPOCH_SECONDS {
        out.push_str(&timestamp(event)?.epoch_seconds().to_string());
    } else if let Some(pattern) = key.strip_prefix('+') {
        out.push_str(&date_pattern::format(pattern, timestamp(event)?)?);
    } else {
        match event.get(key) {
            None | Some(Value::Null) => {
                out.push_str("%{");
                out.push_str(key);
                out.push('}');
            }
            Some(value) => out.push_str(&value.to_text()?),
        }
    }
    Ok(())
}

fn timestamp(event: &Event) -> Result<Timestamp, EventError> {
    event.timestamp().ok_or(EventError::MissingTimestamp)
}
