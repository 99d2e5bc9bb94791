//! Error types for event field access and formatting.
//!
//! Field-level failures from [`crate::Event`] and the format-string engine
//! surface as [`EventError`]. Timestamp and JSON failures keep their own
//! kinds ([`crate::TimestampError`], [`crate::JsonError`]) so callers can
//! tell them apart.

use crate::json::JsonError;

/// Errors that can occur while reading, writing, or formatting an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// Something other than a timestamp was assigned to `@timestamp`.
    #[error("the field '@timestamp' must be a Timestamp, not a {found} ({value})")]
    TimestampType {
        /// Type name of the rejected value.
        found: &'static str,
        /// Debug rendering of the rejected value.
        value: String,
    },

    /// A write walked through a value that cannot hold children.
    #[error("cannot write {reference:?}: path crosses a {found} value")]
    NotAContainer {
        /// The field reference being written.
        reference: String,
        /// Type name of the blocking value.
        found: &'static str,
    },

    /// An array segment is not a usable index.
    #[error("cannot write {reference:?}: {segment:?} is not a valid array index")]
    InvalidIndex {
        /// The field reference being written.
        reference: String,
        /// The offending segment.
        segment: String,
    },

    /// A date token was rendered on an event without `@timestamp`.
    #[error("event has no @timestamp to format")]
    MissingTimestamp,

    /// A `%{+pattern}` token holds an unsupported pattern.
    #[error("invalid date pattern {pattern:?}: {reason}")]
    DatePattern {
        /// The pattern as written.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A field value could not be rendered as JSON.
    #[error(transparent)]
    Json(#[from] JsonError),
}
