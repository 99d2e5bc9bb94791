//! Error types for event encoding and decoding.

use driftlog_event::{EventError, JsonError};

/// Errors that can occur while encoding or decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The JSON layer rejected the payload or the event.
    #[error(transparent)]
    Json(#[from] JsonError),

    /// The payload is not well-formed EDN.
    #[error("EDN parse error at byte {offset}: {reason}")]
    Edn {
        /// Byte offset where reading stopped.
        offset: usize,
        /// What was wrong.
        reason: String,
    },

    /// The payload decoded, but not to a map of fields.
    #[error("expected a map of fields, found {found}")]
    NotAnObject {
        /// Type name of the decoded value.
        found: &'static str,
    },

    /// A format template could not be rendered against the event.
    #[error("format error: {0}")]
    Format(#[from] EventError),
}
