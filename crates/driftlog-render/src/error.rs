//! Error types for the renderer.

use driftlog_codec::CodecError;
use driftlog_event::{EventError, JsonError};

use crate::config::ConfigError;

/// Errors that can occur while rendering events.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An event could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A format string could not be rendered.
    #[error("format error: {0}")]
    Format(#[from] EventError),

    /// A mapped output object could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
