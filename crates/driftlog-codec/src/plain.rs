//! Plain-text payloads: raw text in, formatted text out.

use driftlog_event::Event;

use crate::codec::{Codec, message_event};
use crate::error::CodecError;

/// Wraps raw text in a `message` field and renders events through a
/// format string (or their `Display` form when none is set).
#[derive(Debug, Clone, Default)]
pub struct PlainCodec {
    format: Option<String>,
}

impl PlainCodec {
    /// A codec rendering events with `format`.
    pub const fn new(format: Option<String>) -> Self {
        Self { format }
    }
}

impl Codec for PlainCodec {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn try_decode(&self, data: &str) -> Result<Event, CodecError> {
        Ok(message_event(data))
    }

    fn encode(&self, event: &Event) -> Result<String, CodecError> {
        match &self.format {
            Some(format) => Ok(event.sprintf(format)?),
            None => Ok(event.to_string()),
        }
    }
}
