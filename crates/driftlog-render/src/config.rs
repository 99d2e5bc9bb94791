//! Configuration loading for the renderer.
//!
//! Configuration lives in a YAML file (see `driftlog-render.example.yaml`).
//! Every section is optional; missing values fall back to defaults. A few
//! environment variables override the file after it is loaded:
//!
//! - `DRIFTLOG_JSON_BACKEND` overrides `json.backend`
//! - `DRIFTLOG_INPUT_CODEC` overrides `input.codec`
//! - `DRIFTLOG_TEMPLATE` switches the output to the plain codec with this
//!   format string

use std::collections::BTreeMap;
use std::path::Path;

use driftlog_codec::CodecKind;
use driftlog_event::BackendKind;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override holds an unusable value.
    #[error("invalid value for {name}: {reason}")]
    Env {
        /// The environment variable.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level renderer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// JSON backend selection.
    #[serde(default)]
    pub json: JsonConfig,

    /// How input lines are decoded.
    #[serde(default)]
    pub input: InputConfig,

    /// How events are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Tags added to every event after decoding.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Events carrying any of these tags are cancelled and not written.
    #[serde(default)]
    pub drop_tags: Vec<String>,
}

/// JSON layer configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct JsonConfig {
    /// Backend installed once at startup.
    #[serde(default)]
    pub backend: BackendKind,
}

/// Input decoding configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct InputConfig {
    /// Codec used for each input line.
    #[serde(default)]
    pub codec: CodecKind,
}

/// Output encoding configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Codec used for each output line.
    #[serde(default)]
    pub codec: CodecKind,

    /// Format string for the plain codec; `None` uses the event's
    /// default text form.
    #[serde(default)]
    pub format: Option<String>,

    /// When set, each output line is a JSON object whose values are these
    /// format strings rendered against the event. Takes precedence over
    /// `codec`.
    #[serde(default)]
    pub mapping: Option<BTreeMap<String, String>>,
}

impl RenderConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if an override is invalid.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("DRIFTLOG_JSON_BACKEND") {
            self.json.backend = val.parse().map_err(|reason| ConfigError::Env {
                name: "DRIFTLOG_JSON_BACKEND",
                reason,
            })?;
        }
        if let Some(val) = lookup("DRIFTLOG_INPUT_CODEC") {
            self.input.codec = val.parse().map_err(|reason| ConfigError::Env {
                name: "DRIFTLOG_INPUT_CODEC",
                reason,
            })?;
        }
        if let Some(val) = lookup("DRIFTLOG_TEMPLATE") {
            self.output.codec = CodecKind::Plain;
            self.output.format = Some(val);
            self.output.mapping = None;
        }
        Ok(())
    }
}
