//! The [`Event`] record: a timestamped, path-addressable map of values.

use std::fmt;

use tracing::warn;

use crate::accessors::{Accessors, AccessorsMut};
use crate::error::EventError;
use crate::field_ref::FieldReference;
use crate::json::{self, JsonError};
use crate::sprintf;
use crate::timestamp::Timestamp;
use crate::value::{Map, Value};

/// Reserved field holding the event time.
pub const TIMESTAMP: &str = "@timestamp";
/// Reserved field holding the event schema version.
pub const VERSION: &str = "@version";
/// The only schema version in use.
pub const VERSION_ONE: &str = "1";
/// Field collecting tags added with [`Event::tag`].
pub const TAGS: &str = "tags";

/// Where an unusable `@timestamp` is moved during construction.
const TIMESTAMP_FAILURE_FIELD: &str = "_@timestamp";
/// Tag added when `@timestamp` could not be used.
const TIMESTAMP_FAILURE_TAG: &str = "_timestampparsefailure";

/// Template used by [`Event`]'s `Display` impl.
const DISPLAY_TEMPLATE: &str = "%{+yyyy-MM-dd'T'HH:mm:ss.SSSZ} %{host} %{message}";

/// A semi-structured record flowing through the pipeline.
///
/// Every event carries `@version` and an `@timestamp` that is always a
/// [`Timestamp`]. An event is owned by one stage at a time; hand a branch
/// its own copy with [`Clone`].
#[derive(Debug, PartialEq)]
pub struct Event {
    data: Map,
    cancelled: bool,
}

impl Event {
    /// Build an event around `data`.
    ///
    /// `@version` defaults to `"1"`. A string `@timestamp` is parsed as
    /// ISO-8601; a missing one becomes the current time. Construction never
    /// fails: an `@timestamp` that cannot be used is kept under
    /// `_@timestamp`, the event is tagged `_timestampparsefailure`, and the
    /// current time is used instead.
    pub fn new(data: Map) -> Self {
        let mut event = Self {
            data,
            cancelled: false,
        };
        if event.data.get(VERSION).is_none_or(Value::is_null) {
            event
                .data
                .insert(VERSION.to_owned(), Value::from(VERSION_ONE));
        }
        event.init_timestamp();
        event
    }

    /// Decode a JSON object into an event through the installed backend.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError::Parser`] if `text` is not valid JSON or is not
    /// an object.
    pub fn from_json(text: &str) -> Result<Self, JsonError> {
        match json::decode(text)? {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(JsonError::Parser(format!(
                "expected a JSON object, found {}",
                other.type_name()
            ))),
        }
    }

    fn init_timestamp(&mut self) {
        let parsed = match self.data.get(TIMESTAMP) {
            Some(Value::Timestamp(_)) => return,
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::String(_)) => Timestamp::parse_iso8601_value(value)
                .map_err(|e| e.to_string()),
            Some(other) => Err(format!("unsupported {} value", other.type_name())),
        };

        match parsed {
            Ok(Some(timestamp)) => {
                self.data
                    .insert(TIMESTAMP.to_owned(), Value::Timestamp(timestamp));
            }
            Ok(None) => {
                self.data
                    .insert(TIMESTAMP.to_owned(), Value::Timestamp(Timestamp::now()));
            }
            Err(reason) => {
                let bad = self
                    .data
                    .insert(TIMESTAMP.to_owned(), Value::Timestamp(Timestamp::now()))
                    .unwrap_or_default();
                warn!(
                    value = ?bad,
                    error = %reason,
                    "Unrecognized @timestamp value, setting current time"
                );
                self.data.insert(TIMESTAMP_FAILURE_FIELD.to_owned(), bad);
                self.tag(TIMESTAMP_FAILURE_TAG);
            }
        }
    }

    /// Read-only path view over this event's fields.
    pub const fn accessors(&self) -> Accessors<'_> {
        Accessors::new(&self.data)
    }

    /// Read-write path view over this event's fields. Unguarded, so it
    /// stays inside the crate.
    pub(crate) const fn accessors_mut(&mut self) -> AccessorsMut<'_> {
        AccessorsMut::new(&mut self.data)
    }

    /// Mark the event as dropped; later stages skip it.
    pub const fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Clear the dropped mark.
    pub const fn uncancel(&mut self) {
        self.cancelled = false;
    }

    /// Whether the event has been cancelled.
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The value at `reference`.
    ///
    /// References starting with `+` are reserved for date tokens in
    /// format strings and never resolve here.
    pub fn get(&self, reference: &str) -> Option<&Value> {
        if reference.starts_with('+') {
            return None;
        }
        self.accessors().get(reference)
    }

    /// Mutable access to the value at `reference`.
    ///
    /// `@timestamp` itself is never handed out; use
    /// [`Event::set_timestamp`] to change it.
    pub fn get_mut(&mut self, reference: &str) -> Option<&mut Value> {
        if reference.starts_with('+') || is_timestamp_field(&FieldReference::parse(reference)) {
            return None;
        }
        self.accessors_mut().get(reference)
    }

    /// Write `value` at `reference` and return the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::TimestampType`] when assigning anything but a
    /// [`Timestamp`] to `@timestamp`, or the path errors of
    /// [`AccessorsMut::set`].
    pub fn set(&mut self, reference: &str, value: impl Into<Value>) -> Result<&Value, EventError> {
        let value = value.into();
        if is_timestamp_field(&FieldReference::parse(reference))
            && !matches!(value, Value::Timestamp(_))
        {
            return Err(EventError::TimestampType {
                found: value.type_name(),
                value: format!("{value:?}"),
            });
        }
        self.accessors_mut().set(reference, value)
    }

    /// Remove the value at `reference` and return it.
    pub fn remove(&mut self, reference: &str) -> Option<Value> {
        self.accessors_mut().delete(reference)
    }

    /// Whether `reference` resolves to a non-null value.
    pub fn includes(&self, reference: &str) -> bool {
        self.get(reference).is_some_and(|value| !value.is_null())
    }

    /// The event time, if `@timestamp` has not been removed.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.data.get(TIMESTAMP).and_then(Value::as_timestamp).copied()
    }

    /// Replace the event time.
    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.data
            .insert(TIMESTAMP.to_owned(), Value::Timestamp(timestamp));
    }

    /// Replace this event's fields with `other`'s.
    ///
    /// The cancellation flag of `self` is kept. A string `@timestamp` in
    /// the incoming fields is parsed the same way [`Event::new`] does.
    pub fn overwrite(&mut self, other: Self) {
        self.data = other.data;
        self.init_timestamp();
    }

    /// Merge `other`'s fields into this event.
    ///
    /// Objects present on both sides merge recursively, arrays on both
    /// sides are concatenated, and anything else is replaced by the
    /// incoming value.
    pub fn append(&mut self, other: &Self) {
        merge_maps(&mut self.data, &other.data);
    }

    /// Add `value` to `tags` unless it is already there.
    ///
    /// A scalar `tags` field is turned into a one-element array first.
    pub fn tag(&mut self, value: &str) {
        let slot = self.data.entry(TAGS.to_owned()).or_insert(Value::Null);
        if !matches!(slot, Value::Array(_)) {
            let previous = std::mem::take(slot);
            *slot = Value::Array(if previous.is_null() {
                Vec::new()
            } else {
                vec![previous]
            });
        }
        if let Value::Array(tags) = slot
            && !tags.iter().any(|tag| tag.as_str() == Some(value))
        {
            tags.push(Value::from(value));
        }
    }

    /// String tags currently on the event, in insertion order.
    pub fn tags(&self) -> Vec<&str> {
        match self.data.get(TAGS) {
            Some(Value::Array(tags)) => tags.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(tag)) => vec![tag.as_str()],
            _ => Vec::new(),
        }
    }

    /// The backing map.
    pub const fn to_hash(&self) -> &Map {
        &self.data
    }

    /// A normalized copy of the backing map, ready for a format encoder.
    pub fn to_hash_normalized(&self) -> Map {
        match json::normalize(self.data.clone()) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Consume the event and return its backing map.
    pub fn into_hash(self) -> Map {
        self.data
    }

    /// Encode the fields as a JSON object through the installed backend.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError::Generator`] if a field holds a non-finite float.
    pub fn to_json(&self) -> Result<String, JsonError> {
        json::encode_object(&self.data)
    }

    /// Render `format` against this event.
    ///
    /// See [`crate::sprintf::sprintf`] for the token grammar.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DatePattern`] or [`EventError::MissingTimestamp`]
    /// for unusable date tokens, and [`EventError::Json`] if an object field
    /// cannot be rendered.
    pub fn sprintf(&self, format: &str) -> Result<String, EventError> {
        sprintf::sprintf(self, format)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl From<Map> for Event {
    fn from(data: Map) -> Self {
        Self::new(data)
    }
}

/// Copies every field deeply; the copy starts out not cancelled.
///
/// Nested objects and arrays are copied too, so changing a copy at any
/// depth never shows through to the original. Sharing nested containers
/// between copies is not supported.
impl Clone for Event {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            cancelled: false,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sprintf(DISPLAY_TEMPLATE) {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str(DISPLAY_TEMPLATE),
        }
    }
}

/// Whether `field` addresses the top-level `@timestamp` key.
fn is_timestamp_field(field: &FieldReference) -> bool {
    field.head() == TIMESTAMP && field.is_top_level()
}

fn merge_maps(into: &mut Map, from: &Map) {
    for (key, incoming) in from {
        match into.get_mut(key) {
            Some(existing) => merge_value(existing, incoming),
            None => {
                into.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Object(into), Value::Object(from)) => merge_maps(into, from),
        (Value::Array(into), Value::Array(from)) => into.extend(from.iter().cloned()),
        (slot, value) => *slot = value.clone(),
    }
}
