//! JSON encode/decode behind a backend selected once at startup, plus the
//! normalizer that turns backend trees into canonical [`Value`] trees.
//!
//! Two backends ship with the crate:
//!
//! - [`TreeBackend`] -- parses into `serde_json::Value` (backend-specific
//!   containers) and runs the result through [`Normalize`].
//! - [`StreamingBackend`] -- deserializes straight into [`Value`] and
//!   serializes [`Value`] without an intermediate tree.
//!
//! Both produce identical output. Callers never see `serde_json` errors or
//! containers: failures surface as [`JsonError::Parser`] and
//! [`JsonError::Generator`], and trees surface as [`Value`].
//!
//! ```
//! use driftlog_event::json::{self, JsonError};
//!
//! let value = json::decode(r#"{"a":[1,2]}"#);
//! assert!(value.is_ok());
//! assert!(matches!(json::decode("abc"), Err(JsonError::Parser(_))));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::value::{self, Map, Value};

/// The backend installed for this process.
static INSTALLED: OnceLock<BackendKind> = OnceLock::new();

/// Errors surfaced by the JSON layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonError {
    /// Input text is not valid JSON.
    #[error("JSON parser error: {0}")]
    Parser(String),

    /// A value could not be rendered as JSON.
    #[error("JSON generator error: {0}")]
    Generator(String),
}

/// A JSON implementation the pipeline can run on.
pub trait JsonBackend: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Decode JSON text into a canonical tree.
    fn decode(&self, text: &str) -> Result<Value, JsonError>;

    /// Encode a value as compact JSON.
    fn encode(&self, value: &Value) -> Result<String, JsonError>;

    /// Encode a bare object without wrapping it in a [`Value`].
    fn encode_object(&self, map: &Map) -> Result<String, JsonError>;
}

/// Backend that goes through `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBackend;

/// Backend that reads and writes [`Value`] directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingBackend;

impl JsonBackend for TreeBackend {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn decode(&self, text: &str) -> Result<Value, JsonError> {
        serde_json::from_str::<serde_json::Value>(text)
            .map(Normalize::normalize)
            .map_err(|e| JsonError::Parser(e.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<String, JsonError> {
        let tree = to_tree(value)?;
        serde_json::to_string(&tree).map_err(|e| JsonError::Generator(e.to_string()))
    }

    fn encode_object(&self, map: &Map) -> Result<String, JsonError> {
        let tree = object_to_tree(map)?;
        serde_json::to_string(&tree).map_err(|e| JsonError::Generator(e.to_string()))
    }
}

impl JsonBackend for StreamingBackend {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn decode(&self, text: &str) -> Result<Value, JsonError> {
        serde_json::from_str::<Value>(text).map_err(|e| JsonError::Parser(e.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<String, JsonError> {
        serde_json::to_string(value).map_err(|e| JsonError::Generator(e.to_string()))
    }

    fn encode_object(&self, map: &Map) -> Result<String, JsonError> {
        serde_json::to_string(map).map_err(|e| JsonError::Generator(e.to_string()))
    }
}

/// Which backend to run on; chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// [`TreeBackend`].
    #[default]
    Tree,
    /// [`StreamingBackend`].
    Streaming,
}

impl BackendKind {
    /// The backend implementation for this kind.
    pub fn backend(self) -> &'static dyn JsonBackend {
        match self {
            Self::Tree => &TreeBackend,
            Self::Streaming => &StreamingBackend,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend().name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Ok(Self::Tree),
            "streaming" => Ok(Self::Streaming),
            other => Err(format!("unknown JSON backend {other:?} (expected tree or streaming)")),
        }
    }
}

/// Select the process-wide backend. Only the first call has any effect.
///
/// Returns the backend that is active after the call.
pub fn install(kind: BackendKind) -> BackendKind {
    let active = *INSTALLED.get_or_init(|| kind);
    if active == kind {
        debug!(backend = %active, "JSON backend installed");
    } else {
        warn!(
            requested = %kind,
            active = %active,
            "JSON backend already installed, keeping the first choice"
        );
    }
    active
}

/// The installed backend, or [`BackendKind::Tree`] if none was installed.
pub fn backend() -> &'static dyn JsonBackend {
    INSTALLED.get().copied().unwrap_or_default().backend()
}

/// Decode JSON text with the installed backend.
///
/// # Errors
///
/// Returns [`JsonError::Parser`] for malformed input.
pub fn decode(text: &str) -> Result<Value, JsonError> {
    backend().decode(text)
}

/// Encode a value with the installed backend.
///
/// # Errors
///
/// Returns [`JsonError::Generator`] if the value holds a non-finite float.
pub fn encode(value: &Value) -> Result<String, JsonError> {
    backend().encode(value)
}

/// Encode a bare object with the installed backend.
///
/// # Errors
///
/// Returns [`JsonError::Generator`] if the map holds a non-finite float.
pub fn encode_object(map: &Map) -> Result<String, JsonError> {
    backend().encode_object(map)
}

/// Convert any supported tree into a canonical [`Value`] tree.
pub fn normalize<T: Normalize>(tree: T) -> Value {
    tree.normalize()
}

/// Trees that can be rewritten into canonical [`Value`] form.
///
/// Containers are rebuilt recursively; leaf scalars pass through as-is.
/// Normalizing an already-canonical tree returns an equal tree.
pub trait Normalize {
    /// Rewrite into canonical form.
    fn normalize(self) -> Value;
}

impl Normalize for Value {
    fn normalize(self) -> Value {
        match self {
            Self::Array(items) => Self::Array(items.into_iter().map(Normalize::normalize).collect()),
            Self::Object(map) => map.normalize(),
            leaf => leaf,
        }
    }
}

impl Normalize for Map {
    fn normalize(self) -> Value {
        Value::Object(
            self.into_iter()
                .map(|(key, value)| (key, value.normalize()))
                .collect(),
        )
    }
}

impl Normalize for serde_json::Value {
    fn normalize(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => number(&n),
            Self::String(text) => Value::String(text),
            Self::Array(items) => Value::Array(items.into_iter().map(Normalize::normalize).collect()),
            Self::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.normalize()))
                    .collect(),
            ),
        }
    }
}

/// Map a `serde_json` number onto the canonical numeric variants.
fn number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Integer(i)
    } else if let Some(u) = n.as_u64() {
        value::unsigned(u)
    } else {
        n.as_f64().map_or(Value::Null, Value::Float)
    }
}

/// Rebuild a canonical value as a `serde_json` tree for [`TreeBackend`].
fn to_tree(value: &Value) -> Result<serde_json::Value, JsonError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| JsonError::Generator(format!("cannot serialize non-finite float {n}")))?,
        Value::String(text) => serde_json::Value::String(text.clone()),
        Value::Timestamp(timestamp) => serde_json::Value::String(timestamp.to_string()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(to_tree).collect::<Result<_, _>>()?)
        }
        Value::Object(map) => object_to_tree(map)?,
    })
}

fn object_to_tree(map: &Map) -> Result<serde_json::Value, JsonError> {
    let mut tree = serde_json::Map::with_capacity(map.len());
    for (key, value) in map {
        tree.insert(key.clone(), to_tree(value)?);
    }
    Ok(serde_json::Value::Object(tree))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    /// JSON text paired with the canonical value it decodes to.
    fn samples() -> Vec<(&'static str, Value)> {
        vec![
            (r#""foo bar baz""#, Value::from("foo bar baz")),
            (r#""1""#, Value::from("1")),
            (r#"{"a":true}"#, [("a", true)].into_iter().collect()),
            (r#"{"a":null}"#, [("a", Value::Null)].into_iter().collect()),
            (r#"["a","b"]"#, Value::from(vec!["a", "b"])),
            ("[1,2]", Value::from(vec![1, 2])),
            ("[1,null]", Value::Array(vec![Value::from(1), Value::Null])),
            (
                r#"{"a":[1,2]}"#,
                [("a", Value::from(vec![1, 2]))].into_iter().collect(),
            ),
            (
                r#"{"a":{"b":2}}"#,
                [("a", [("b", 2)].into_iter().collect::<Value>())]
                    .into_iter()
                    .collect(),
            ),
            ("1.5", Value::from(1.5)),
        ]
    }

    fn backends() -> [&'static dyn JsonBackend; 2] {
        [&TreeBackend, &StreamingBackend]
    }

    #[test]
    fn decodes_samples_on_both_backends() {
        for backend in backends() {
            for (text, expected) in samples() {
                assert_eq!(backend.decode(text).unwrap(), expected, "{} {text}", backend.name());
            }
        }
    }

    #[test]
    fn encodes_samples_on_both_backends() {
        for backend in backends() {
            for (text, value) in samples() {
                assert_eq!(backend.encode(&value).unwrap(), text, "{}", backend.name());
            }
        }
    }

    #[test]
    fn invalid_json_is_a_parser_error() {
        for backend in backends() {
            for text in ["abc", "{\"a\":", "[1,2", "{'a':1}", ""] {
                assert!(
                    matches!(backend.decode(text), Err(JsonError::Parser(_))),
                    "{} accepted {text:?}",
                    backend.name()
                );
            }
        }
    }

    #[test]
    fn non_finite_floats_are_generator_errors() {
        let value: Value = [("x", Value::Float(f64::INFINITY))].into_iter().collect();
        for backend in backends() {
            assert!(matches!(backend.encode(&value), Err(JsonError::Generator(_))));
        }
    }

    #[test]
    fn timestamps_encode_as_iso8601_on_both_backends() {
        let timestamp = Timestamp::at(1_360_442_366, 234_000).unwrap();
        let mut map = Map::new();
        map.insert("@timestamp".to_owned(), Value::from(timestamp));
        for backend in backends() {
            assert_eq!(
                backend.encode_object(&map).unwrap(),
                r#"{"@timestamp":"2013-02-09T20:39:26.234Z"}"#
            );
        }
    }

    #[test]
    fn object_key_order_survives_both_backends() {
        let text = r#"{"z":1,"a":2,"m":{"y":1,"b":2}}"#;
        for backend in backends() {
            let value = backend.decode(text).unwrap();
            assert_eq!(backend.encode(&value).unwrap(), text);
        }
    }

    #[test]
    fn normalize_converts_backend_trees() {
        let tree = serde_json::json!({"a": [1, {"b": "c"}], "d": 2.5});
        let expected: Value = [
            (
                "a",
                Value::Array(vec![
                    Value::from(1),
                    [("b", "c")].into_iter().collect::<Value>(),
                ]),
            ),
            ("d", Value::from(2.5)),
        ]
        .into_iter()
        .collect();
        assert_eq!(normalize(tree), expected);
    }

    #[test]
    fn normalize_is_idempotent() {
        let tree = serde_json::json!({"a": [1, [2, 3], {"b": null}], "c": "x"});
        let once = normalize(tree);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_leaves_scalars_alone() {
        let timestamp = Timestamp::now();
        assert_eq!(normalize(Value::from(timestamp)), Value::from(timestamp));
        assert_eq!(normalize(Value::from("x")), Value::from("x"));
    }

    #[test]
    fn backend_kind_parses_from_config_text() {
        assert_eq!("tree".parse::<BackendKind>(), Ok(BackendKind::Tree));
        assert_eq!(" Streaming ".parse::<BackendKind>(), Ok(BackendKind::Streaming));
        assert!("oj".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Streaming.to_string(), "streaming");
    }
}
