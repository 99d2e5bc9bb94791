//! The [`Codec`] trait shared by every payload format.

use std::fmt;
use std::str::FromStr;

use driftlog_event::{Event, Map, TIMESTAMP, Value};
use serde::Deserialize;
use tracing::warn;

use crate::edn::EdnCodec;
use crate::error::CodecError;
use crate::json::JsonCodec;
use crate::plain::PlainCodec;

/// Converts single payloads to events and back.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Strictly decode `data` into an event.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] describing why `data` is not a valid
    /// payload for this format.
    fn try_decode(&self, data: &str) -> Result<Event, CodecError>;

    /// Encode one event.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the event holds something the format
    /// cannot represent.
    fn encode(&self, event: &Event) -> Result<String, CodecError>;

    /// Decode `data`, falling back to a plain-text event on failure.
    ///
    /// The fallback event carries the raw payload in `message`.
    fn decode(&self, data: &str) -> Event {
        match self.try_decode(data) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    codec = self.name(),
                    error = %e,
                    data,
                    "parse failure, falling back to plain-text"
                );
                message_event(data)
            }
        }
    }

    /// Encode every event that has not been cancelled, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first event that fails to encode.
    fn encode_batch(&self, events: &[Event]) -> Result<Vec<String>, CodecError> {
        events
            .iter()
            .filter(|event| !event.is_cancelled())
            .map(|event| self.encode(event))
            .collect()
    }
}

/// An event holding `data` verbatim in its `message` field.
pub fn message_event(data: &str) -> Event {
    let mut fields = Map::new();
    fields.insert("message".to_owned(), Value::from(data));
    Event::new(fields)
}

/// The field map an encoder should write for `event`.
///
/// This is a normalized copy with `@timestamp` replaced by its ISO-8601
/// string; the event is left untouched.
pub fn encoded_hash(event: &Event) -> Map {
    let mut data = event.to_hash_normalized();
    if let Some(timestamp) = event.timestamp() {
        data.insert(TIMESTAMP.to_owned(), Value::from(timestamp.to_iso8601()));
    }
    data
}

/// Which payload format to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// One JSON object per payload.
    #[default]
    Json,
    /// One EDN map per payload.
    Edn,
    /// Raw text.
    Plain,
}

impl CodecKind {
    /// Build the codec; `format` is only used by [`CodecKind::Plain`].
    pub fn build(self, format: Option<String>) -> Box<dyn Codec> {
        match self {
            Self::Json => Box::new(JsonCodec),
            Self::Edn => Box::new(EdnCodec),
            Self::Plain => Box::new(PlainCodec::new(format)),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Edn => "edn",
            Self::Plain => "plain",
        })
    }
}

impl FromStr for CodecKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "edn" => Ok(Self::Edn),
            "plain" | "line" => Ok(Self::Plain),
            other => Err(format!("unknown codec: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use driftlog_event::Timestamp;

    #[test]
    fn encoded_hash_stringifies_timestamp_without_touching_event() {
        let mut event = Event::default();
        event.set_timestamp(Timestamp::at(1_700_000_000, 0).unwrap());

        let data = encoded_hash(&event);
        assert_eq!(
            data.get(TIMESTAMP),
            Some(&Value::from("2023-11-14T22:13:20.000Z"))
        );
        assert!(matches!(event.get(TIMESTAMP), Some(Value::Timestamp(_))));
    }

    #[test]
    fn message_event_wraps_raw_text() {
        let event = message_event("not structured");
        assert_eq!(event.get("message"), Some(&Value::from("not structured")));
        assert!(event.timestamp().is_some());
    }

    #[test]
    fn codec_kind_parses_names() {
        assert_eq!("JSON".parse::<CodecKind>().unwrap(), CodecKind::Json);
        assert_eq!("edn".parse::<CodecKind>().unwrap(), CodecKind::Edn);
        assert_eq!("line".parse::<CodecKind>().unwrap(), CodecKind::Plain);
        assert!("xml".parse::<CodecKind>().is_err());
        assert_eq!(CodecKind::default().to_string(), "json");
    }

    #[test]
    fn build_returns_matching_codec() {
        assert_eq!(CodecKind::Json.build(None).name(), "json");
        assert_eq!(CodecKind::Edn.build(None).name(), "edn");
        assert_eq!(CodecKind::Plain.build(None).name(), "plain");
    }
}
