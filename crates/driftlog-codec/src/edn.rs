//! EDN payloads: one map per payload.
//!
//! The reader accepts the full scalar and collection syntax (`nil`,
//! booleans, integers with an optional `N` suffix, floats with an optional
//! `M` suffix, strings, characters, keywords, symbols, lists, vectors,
//! maps, sets), comments, `#_` discards, `##Inf`/`##-Inf`/`##NaN`, and
//! tagged elements. Values land in the event's [`Value`] tree:
//!
//! - keywords and symbols become strings (keywords lose their `:`)
//! - lists and sets become arrays
//! - `#inst "..."` becomes a [`Timestamp`]; other tags keep their value
//!
//! The writer emits strings for keys, vectors for arrays, `#inst` for
//! timestamps, and `##NaN`/`##Inf` for non-finite floats.

use std::iter::Peekable;
use std::str::CharIndices;

use driftlog_event::{Event, Map, Timestamp, Value};

use crate::codec::{Codec, encoded_hash};
use crate::error::CodecError;

/// Reads and writes events as EDN maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdnCodec;

impl Codec for EdnCodec {
    fn name(&self) -> &'static str {
        "edn"
    }

    fn try_decode(&self, data: &str) -> Result<Event, CodecError> {
        match read(data)? {
            Value::Object(map) => Ok(Event::new(map)),
            other => Err(CodecError::NotAnObject {
                found: other.type_name(),
            }),
        }
    }

    fn encode(&self, event: &Event) -> Result<String, CodecError> {
        let mut out = String::new();
        write(&Value::Object(encoded_hash(event)), &mut out);
        Ok(out)
    }
}

/// Read exactly one EDN form from `text`.
///
/// # Errors
///
/// Returns [`CodecError::Edn`] if `text` is empty, malformed, or holds
/// more than one form.
pub fn read(text: &str) -> Result<Value, CodecError> {
    let mut reader = Reader::new(text);
    let value = reader.read_form()?;
    reader.skip_ws()?;
    if reader.peek().is_some() {
        return Err(reader.error("trailing content after the first form"));
    }
    Ok(value)
}

/// Append the EDN rendering of `value` to `out`.
pub fn write(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Float(n) => write_float(*n, out),
        Value::String(text) => write_string(text, out),
        Value::Timestamp(timestamp) => {
            out.push_str("#inst ");
            write_string(&timestamp.to_iso8601(), out);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(key, out);
                out.push(' ');
                write(item, out);
            }
            out.push('}');
        }
    }
}

fn write_float(n: f64, out: &mut String) {
    if n.is_nan() {
        out.push_str("##NaN");
    } else if n.is_infinite() {
        out.push_str(if n.is_sign_positive() { "##Inf" } else { "##-Inf" });
    } else {
        out.push_str(&Value::Float(n).to_text().unwrap_or_else(|_| n.to_string()));
    }
}

fn write_string(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Characters that end a token.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';')
}

/// Deepest nesting of forms the reader accepts.
const MAX_DEPTH: usize = 128;

struct Reader<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            len: text.len(),
            depth: 0,
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.len, |&(i, _)| i)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn error(&mut self, reason: impl Into<String>) -> CodecError {
        CodecError::Edn {
            offset: self.offset(),
            reason: reason.into(),
        }
    }

    /// Skip whitespace, commas, comments, and `#_` discarded forms.
    fn skip_ws(&mut self) -> Result<(), CodecError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ',' => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('#') if self.chars.clone().nth(1).map(|(_, c)| c) == Some('_') => {
                    self.bump();
                    self.bump();
                    self.read_form()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_form(&mut self) -> Result<Value, CodecError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth = self.depth.saturating_add(1);
        let form = self.read_nested_form();
        self.depth = self.depth.saturating_sub(1);
        form
    }

    fn read_nested_form(&mut self) -> Result<Value, CodecError> {
        self.skip_ws()?;
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of input"));
        };
        match c {
            '{' => {
                self.bump();
                self.read_map()
            }
            '[' => {
                self.bump();
                Ok(Value::Array(self.read_seq(']')?))
            }
            '(' => {
                self.bump();
                Ok(Value::Array(self.read_seq(')')?))
            }
            '"' => {
                self.bump();
                self.read_string().map(Value::String)
            }
            '\\' => {
                self.bump();
                self.read_char().map(|c| Value::String(c.to_string()))
            }
            '#' => {
                self.bump();
                self.read_dispatch()
            }
            ':' => {
                self.bump();
                let name = self.read_token();
                if name.is_empty() {
                    return Err(self.error("empty keyword"));
                }
                Ok(Value::String(name))
            }
            ')' | ']' | '}' => Err(self.error(format!("unexpected '{c}'"))),
            _ => {
                let token = self.read_token();
                self.atom(&token)
            }
        }
    }

    fn read_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            token.push(c);
            self.bump();
        }
        token
    }

    fn read_seq(&mut self, close: char) -> Result<Vec<Value>, CodecError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws()?;
            match self.peek() {
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                None => return Err(self.error(format!("unterminated collection, expected '{close}'"))),
                Some(_) => items.push(self.read_form()?),
            }
        }
    }

    fn read_map(&mut self) -> Result<Value, CodecError> {
        let mut map = Map::new();
        let mut forms = self.read_seq('}')?.into_iter();
        while let Some(key) = forms.next() {
            let Some(value) = forms.next() else {
                return Err(self.error("map literal has an odd number of forms"));
            };
            let key = match key {
                Value::String(text) => text,
                Value::Integer(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(self.error(format!("unsupported map key of type {}", other.type_name())));
                }
            };
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('u') => self.read_unicode()?,
                        Some(other) => return Err(self.error(format!("invalid escape '\\{other}'"))),
                        None => return Err(self.error("unterminated string")),
                    };
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn read_unicode(&mut self) -> Result<char, CodecError> {
        let mut digits = String::with_capacity(4);
        while digits.len() < 4 {
            match self.chars.next_if(|&(_, c)| c.is_ascii_hexdigit()) {
                Some((_, c)) => digits.push(c),
                None => break,
            }
        }
        if digits.len() < 4 {
            return Err(self.error(format!("invalid unicode escape '\\u{digits}'")));
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid unicode escape '\\u{digits}'")))
    }

    fn read_char(&mut self) -> Result<char, CodecError> {
        let Some(first) = self.bump() else {
            return Err(self.error("unterminated character literal"));
        };
        let rest = self.read_token();
        if rest.is_empty() {
            return Ok(first);
        }
        let name = format!("{first}{rest}");
        match name.as_str() {
            "newline" => Ok('\n'),
            "space" => Ok(' '),
            "tab" => Ok('\t'),
            "return" => Ok('\r'),
            "backspace" => Ok('\u{8}'),
            "formfeed" => Ok('\u{c}'),
            _ => match name.strip_prefix('u') {
                Some(hex) if hex.len() == 4 => u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(format!("invalid character \\{name}"))),
                _ => Err(self.error(format!("invalid character \\{name}"))),
            },
        }
    }

    /// Forms starting with `#`: sets, symbolic values, and tags.
    fn read_dispatch(&mut self) -> Result<Value, CodecError> {
        match self.peek() {
            Some('{') => {
                self.bump();
                Ok(Value::Array(self.read_seq('}')?))
            }
            Some('#') => {
                self.bump();
                match self.read_token().as_str() {
                    "Inf" => Ok(Value::Float(f64::INFINITY)),
                    "-Inf" => Ok(Value::Float(f64::NEG_INFINITY)),
                    "NaN" => Ok(Value::Float(f64::NAN)),
                    other => Err(self.error(format!("unknown symbolic value ##{other}"))),
                }
            }
            Some(c) if c.is_alphabetic() => {
                let tag = self.read_token();
                let form = self.read_form()?;
                self.tagged(&tag, form)
            }
            _ => Err(self.error("unsupported dispatch character after '#'")),
        }
    }

    fn tagged(&mut self, tag: &str, form: Value) -> Result<Value, CodecError> {
        match (tag, form) {
            ("inst", Value::String(text)) => Timestamp::parse_iso8601(&text)
                .map(Value::Timestamp)
                .map_err(|e| self.error(e.to_string())),
            ("inst", other) => Err(self.error(format!(
                "#inst expects a string, found {}",
                other.type_name()
            ))),
            (_, form) => Ok(form),
        }
    }

    fn atom(&mut self, token: &str) -> Result<Value, CodecError> {
        match token {
            "nil" => return Ok(Value::Null),
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }

        let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
        if !unsigned.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(Value::String(token.to_owned()));
        }

        let decimal = token.ends_with('M');
        let body = token
            .strip_suffix('N')
            .or_else(|| token.strip_suffix('M'))
            .unwrap_or(token);
        let parsed = if decimal || body.contains(['.', 'e', 'E']) {
            body.parse::<f64>().ok().map(Value::Float)
        } else {
            body.parse::<i64>()
                .map(Value::Integer)
                .ok()
                .or_else(|| body.parse::<f64>().ok().map(Value::Float))
        };
        parsed.ok_or_else(|| self.error(format!("invalid number {token:?}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn object(text: &str) -> Map {
        read(text).unwrap().as_object().cloned().unwrap()
    }

    #[test]
    fn reads_scalars() {
        assert_eq!(read("nil").unwrap(), Value::Null);
        assert_eq!(read("true").unwrap(), Value::Bool(true));
        assert_eq!(read("-42").unwrap(), Value::Integer(-42));
        assert_eq!(read("42N").unwrap(), Value::Integer(42));
        assert_eq!(read("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(read("3M").unwrap(), Value::Float(3.0));
        assert_eq!(read("1e3").unwrap(), Value::Float(1000.0));
        assert_eq!(read(":kw").unwrap(), Value::from("kw"));
        assert_eq!(read("my/symbol").unwrap(), Value::from("my/symbol"));
        assert_eq!(read(r#""a\"b\né""#).unwrap(), Value::from("a\"b\né"));
        assert_eq!(read(r"\newline").unwrap(), Value::from("\n"));
        assert_eq!(read(r"\x").unwrap(), Value::from("x"));
    }

    #[test]
    fn reads_collections() {
        assert_eq!(read("[1 2, 3]").unwrap(), Value::from(vec![1, 2, 3]));
        assert_eq!(read("(1 2)").unwrap(), Value::from(vec![1, 2]));
        assert_eq!(read("#{:a}").unwrap(), Value::from(vec!["a"]));

        let map = object(r#"{:message "hi", "count" 3 :nested {:list [true nil]}}"#);
        assert_eq!(map.get("message"), Some(&Value::from("hi")));
        assert_eq!(map.get("count"), Some(&Value::from(3)));
        assert_eq!(
            map.get("nested").and_then(|v| v.as_object()).and_then(|m| m.get("list")),
            Some(&Value::Array(vec![Value::Bool(true), Value::Null]))
        );
    }

    #[test]
    fn skips_comments_and_discards() {
        let map = object("; leading comment\n{:a 1 #_ :b #_ 2 :c [1 #_ 2 3]} ; trailing");
        assert_eq!(map.get("a"), Some(&Value::from(1)));
        assert_eq!(map.get("b"), None);
        assert_eq!(map.get("c"), Some(&Value::from(vec![1, 3])));
    }

    #[test]
    fn reads_tagged_elements() {
        let value = read(r#"#inst "2014-01-01T00:00:00.000Z""#).unwrap();
        assert_eq!(value.as_timestamp().unwrap().epoch_seconds(), 1_388_534_400);
        assert_eq!(
            read(r#"#uuid "f81d4fae-7dec-11d0-a765-00a0c91e6bf6""#).unwrap(),
            Value::from("f81d4fae-7dec-11d0-a765-00a0c91e6bf6")
        );
        assert!(read("##NaN").unwrap().as_f64().unwrap().is_nan());
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "{:a}", "[1 2", "\"open", "1 2", ")", "#inst 5", "{[1] 2}"] {
            assert!(
                matches!(read(bad), Err(CodecError::Edn { .. })),
                "expected error for {bad:?}"
            );
        }
    }

    #[test]
    fn short_unicode_escapes_stop_at_the_first_non_hex_char() {
        let err = read(r#""\u12""#).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Edn { offset: 5, ref reason } if reason.contains("unicode escape")
        ));
        assert_eq!(read(r#""\u00e9""#).unwrap(), Value::from("\u{e9}"));
    }

    #[test]
    fn nesting_is_capped() {
        let nested = |depth: usize| format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        assert!(read(&nested(MAX_DEPTH)).is_ok());

        let deep = nested(MAX_DEPTH.saturating_add(1));
        assert!(matches!(
            read(&deep),
            Err(CodecError::Edn { ref reason, .. }) if reason == "nesting too deep"
        ));
    }

    #[test]
    fn hostile_nesting_falls_back_to_a_message_event() {
        let text = format!("{{:a {}{}}}", "[".repeat(200_000), "]".repeat(200_000));
        let event = EdnCodec.decode(&text);
        assert_eq!(event.get("message").and_then(Value::as_str), Some(text.as_str()));
        assert!(event.get("a").is_none());
    }

    #[test]
    fn writes_values() {
        let value: Value = [
            ("s", Value::from("q\"uote")),
            ("n", Value::from(1)),
            ("f", Value::from(1.0)),
            ("list", Value::from(vec![Value::Null, Value::Bool(false)])),
            ("inf", Value::from(f64::INFINITY)),
        ]
        .into_iter()
        .collect();
        let mut out = String::new();
        write(&value, &mut out);
        assert_eq!(
            out,
            r#"{"s" "q\"uote", "n" 1, "f" 1.0, "list" [nil false], "inf" ##Inf}"#
        );
    }

    #[test]
    fn codec_decodes_maps_and_falls_back_otherwise() {
        let event = EdnCodec.decode(r#"{:message "hi" :@timestamp "2014-01-01T00:00:00.000Z"}"#);
        assert_eq!(event.get("message"), Some(&Value::from("hi")));
        assert_eq!(event.timestamp().unwrap().epoch_seconds(), 1_388_534_400);

        let event = EdnCodec.decode("[1 2 3]");
        assert_eq!(event.get("message"), Some(&Value::from("[1 2 3]")));
        assert!(matches!(
            EdnCodec.try_decode("[1 2 3]"),
            Err(CodecError::NotAnObject { found: "array" })
        ));
    }

    #[test]
    fn codec_encodes_with_iso_timestamp() {
        let mut event = EdnCodec.decode(r#"{:message "hi"}"#);
        event.set_timestamp(Timestamp::at(1_700_000_000, 0).unwrap());
        assert_eq!(
            EdnCodec.encode(&event).unwrap(),
            r#"{"message" "hi", "@version" "1", "@timestamp" "2023-11-14T22:13:20.000Z"}"#
        );
    }
}
