//! JSON payloads: one object per payload.

use driftlog_event::{Event, json};

use crate::codec::{Codec, encoded_hash};
use crate::error::CodecError;

/// Reads and writes events as JSON objects through the installed backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn try_decode(&self, data: &str) -> Result<Event, CodecError> {
        Ok(Event::from_json(data)?)
    }

    fn encode(&self, event: &Event) -> Result<String, CodecError> {
        Ok(json::encode_object(&encoded_hash(event))?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use driftlog_event::{JsonError, Timestamp, Value};

    #[test]
    fn decodes_objects() {
        let event = JsonCodec.decode(r#"{"message":"hi","@timestamp":"2014-01-01T00:00:00.000Z"}"#);
        assert_eq!(event.get("message"), Some(&Value::from("hi")));
        assert_eq!(event.timestamp().unwrap().epoch_seconds(), 1_388_534_400);
        assert_eq!(event.tags(), Vec::<&str>::new());
    }

    #[test]
    fn falls_back_to_message_on_bad_input() {
        for raw in ["not json", "[1,2,3]", "{\"unterminated\":"] {
            let event = JsonCodec.decode(raw);
            assert_eq!(event.get("message"), Some(&Value::from(raw)));
        }
        assert!(matches!(
            JsonCodec.try_decode("nope"),
            Err(CodecError::Json(JsonError::Parser(_)))
        ));
    }

    #[test]
    fn encodes_with_iso_timestamp() {
        let mut event = JsonCodec.decode(r#"{"message":"hi"}"#);
        event.set_timestamp(Timestamp::at(1_700_000_000, 0).unwrap());
        assert_eq!(
            JsonCodec.encode(&event).unwrap(),
            r#"{"message":"hi","@version":"1","@timestamp":"2023-11-14T22:13:20.000Z"}"#
        );
    }

    #[test]
    fn encode_rejects_non_finite_floats() {
        let mut event = Event::default();
        event.set("ratio", f64::NAN).unwrap();
        assert!(matches!(
            JsonCodec.encode(&event),
            Err(CodecError::Json(JsonError::Generator(_)))
        ));
    }
}
