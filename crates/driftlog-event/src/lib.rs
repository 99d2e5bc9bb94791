//! Event representation and templating core for the Driftlog pipeline.
//!
//! An [`Event`] is a semi-structured record (timestamp + arbitrary fields)
//! that moves through ingestion, filtering, and output stages. This crate
//! owns the pieces every stage shares:
//!
//! # Modules
//!
//! - [`value`] -- The canonical [`Value`] tree every field is made of
//! - [`timestamp`] -- UTC [`Timestamp`] with two ISO-8601 parser/formatter paths
//! - [`json`] -- Pluggable JSON backends, the normalizer, and mapped error kinds
//! - [`field_ref`] -- Field-reference resolver (`host`, `[a][b][0]`)
//! - [`accessors`] -- Path-based get/set/delete over an event's backing map
//! - [`event`] -- The [`Event`] record: reserved fields, cancellation, merge
//! - [`sprintf`] -- The `%{...}` format-string engine
//! - [`date_pattern`] -- Joda-style date patterns used by `%{+pattern}` tokens
//!
//! # Reserved fields
//!
//! Every event carries `@timestamp` (always a [`Timestamp`]) and `@version`
//! (defaults to `"1"`). Assigning anything but a [`Timestamp`] to
//! `@timestamp` through [`Event::set`] is rejected with
//! [`EventError::TimestampType`].
//!
//! ```
//! use driftlog_event::{Event, Map, Timestamp, Value};
//!
//! let mut event = Event::new(Map::new());
//! event.set("type", "nginx").ok();
//! event.set_timestamp(Timestamp::at(1_700_000_000, 0).unwrap_or_else(|_| Timestamp::now()));
//!
//! let rendered = event.sprintf("type is %{type} and ts is %{+%s}");
//! assert_eq!(rendered.ok().as_deref(), Some("type is nginx and ts is 1700000000"));
//! assert!(event.set("@timestamp", Value::from("not-a-timestamp")).is_err());
//! ```

pub mod accessors;
pub mod date_pattern;
pub mod error;
pub mod event;
pub mod field_ref;
pub mod json;
pub mod sprintf;
pub mod timestamp;
pub mod value;

// Re-export the everyday types at crate root for convenience.
pub use accessors::{Accessors, AccessorsMut};
pub use error::EventError;
pub use event::{Event, TAGS, TIMESTAMP, VERSION, VERSION_ONE};
pub use field_ref::FieldReference;
pub use json::{BackendKind, JsonBackend, JsonError, Normalize};
pub use sprintf::sprintf;
pub use timestamp::{TimeSource, Timestamp, TimestampError};
pub use value::{Map, Value};
