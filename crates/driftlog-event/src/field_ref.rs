//! Field-reference resolver: turns a path string into traversal steps.
//!
//! Two spellings are understood:
//!
//! - `name` -- a single top-level key, taken literally (dots included).
//! - `[a][b][0]` -- nested keys; segments that land on an array are read
//!   as integer indexes, negative ones counting from the end.
//!
//! Parsing never fails. Anything that is not a well-formed bracket chain
//! is treated as one literal top-level key.

/// A parsed field path: always at least one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference {
    head: String,
    tail: Vec<String>,
}

impl FieldReference {
    /// Parse a reference string.
    pub fn parse(reference: &str) -> Self {
        if let Some(mut segments) = bracketed_segments(reference)
            && !segments.is_empty()
        {
            let head = segments.remove(0);
            return Self { head, tail: segments };
        }
        Self {
            head: reference.to_owned(),
            tail: Vec::new(),
        }
    }

    /// The top-level key.
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Segments below the top-level key, outermost first.
    pub fn tail(&self) -> &[String] {
        &self.tail
    }

    /// Whether the reference names a top-level key only.
    pub fn is_top_level(&self) -> bool {
        self.tail.is_empty()
    }
}

/// Split `[a][b]` into `["a", "b"]`, or `None` if malformed.
fn bracketed_segments(reference: &str) -> Option<Vec<String>> {
    let mut rest = reference.strip_prefix('[')?;
    let mut segments = Vec::new();
    loop {
        let (segment, tail) = rest.split_once(']')?;
        if segment.is_empty() || segment.contains('[') {
            return None;
        }
        segments.push(segment.to_owned());
        if tail.is_empty() {
            return Some(segments);
        }
        rest = tail.strip_prefix('[')?;
    }
}

/// Resolve `segment` against an array of `len` items for reading.
///
/// Returns `None` for non-numeric segments and out-of-range indexes.
pub fn array_index(segment: &str, len: usize) -> Option<usize> {
    let index: i64 = segment.parse().ok()?;
    let resolved = if index < 0 {
        let back = usize::try_from(index.checked_neg()?).ok()?;
        len.checked_sub(back)?
    } else {
        usize::try_from(index).ok()?
    };
    (resolved < len).then_some(resolved)
}

/// Most `null` slots a single write may pad onto the end of an array.
pub const MAX_ARRAY_PADDING: usize = 1024;

/// Resolve `segment` for writing: like [`array_index`], but non-negative
/// indexes up to [`MAX_ARRAY_PADDING`] past the end are allowed (the array
/// is padded).
pub fn writable_index(segment: &str, len: usize) -> Option<usize> {
    let index: i64 = segment.parse().ok()?;
    if index < 0 {
        return array_index(segment, len);
    }
    let index = usize::try_from(index).ok()?;
    (index.saturating_sub(len) <= MAX_ARRAY_PADDING).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_single_keys() {
        let field = FieldReference::parse("@timestamp");
        assert_eq!(field.head(), "@timestamp");
        assert!(field.is_top_level());

        let dotted = FieldReference::parse("host.name");
        assert_eq!(dotted.head(), "host.name");
        assert!(dotted.is_top_level());
    }

    #[test]
    fn bracket_chains_split_into_segments() {
        let field = FieldReference::parse("[a][b][0]");
        assert_eq!(field.head(), "a");
        assert_eq!(field.tail(), ["b", "0"]);

        let single = FieldReference::parse("[message]");
        assert_eq!(single.head(), "message");
        assert!(single.is_top_level());
    }

    #[test]
    fn malformed_brackets_fall_back_to_literal_keys() {
        for reference in ["[a", "[a]b", "[]", "[a][", "[a[b]]"] {
            let field = FieldReference::parse(reference);
            assert_eq!(field.head(), reference);
            assert!(field.is_top_level());
        }
    }

    #[test]
    fn array_indexes_support_negative_offsets() {
        assert_eq!(array_index("0", 3), Some(0));
        assert_eq!(array_index("-1", 3), Some(2));
        assert_eq!(array_index("-3", 3), Some(0));
        assert_eq!(array_index("-4", 3), None);
        assert_eq!(array_index("3", 3), None);
        assert_eq!(array_index("x", 3), None);
    }

    #[test]
    fn writable_indexes_may_extend() {
        assert_eq!(writable_index("5", 2), Some(5));
        assert_eq!(writable_index("-1", 2), Some(1));
        assert_eq!(writable_index("-3", 2), None);
        assert_eq!(writable_index("key", 2), None);
    }

    #[test]
    fn writable_indexes_cap_the_padding() {
        assert_eq!(writable_index("1026", 2), Some(1026));
        assert_eq!(writable_index("1027", 2), None);
        assert_eq!(writable_index("9223372036854775807", 0), None);
    }
}
