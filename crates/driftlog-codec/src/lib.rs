//! Per-payload event codecs for the Driftlog pipeline.
//!
//! A codec turns one encoded payload into an [`Event`] and back. Decoding
//! never fails: a payload that does not parse becomes an event whose
//! `message` field holds the raw text, and a warning is logged. Encoding
//! always works on a normalized copy of the event's fields with
//! `@timestamp` rendered as its ISO-8601 string, so the event itself is
//! never touched.
//!
//! # Modules
//!
//! - [`codec`] -- The [`Codec`] trait and [`CodecKind`] selector
//! - [`json`] -- [`JsonCodec`], one JSON object per payload
//! - [`edn`] -- [`EdnCodec`], one EDN map per payload
//! - [`plain`] -- [`PlainCodec`], raw text in, formatted text out
//! - [`error`] -- [`CodecError`]
//!
//! [`Event`]: driftlog_event::Event

pub mod codec;
pub mod edn;
pub mod error;
pub mod json;
pub mod plain;

pub use codec::{Codec, CodecKind, encoded_hash, message_event};
pub use edn::EdnCodec;
pub use error::CodecError;
pub use json::JsonCodec;
pub use plain::PlainCodec;
