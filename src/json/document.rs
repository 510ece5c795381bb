//! Budget-bounded JSON document and zero-copy value views.

use heapless::Vec;

use super::scan;

/// A decoded JSON document bounded by a fixed byte budget `N`.
///
/// The document stores the (optionally filtered) body as compacted JSON text
/// in an `N`-byte buffer. There is no dynamic growth: a body whose kept
/// portion does not fit the budget fails to decode. Values are read through
/// [`Value`] views that borrow from the buffer.
#[derive(Debug)]
pub struct Document<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> Document<N> {
    // Callers only obtain documents from the decoder, which stores validated
    // UTF-8 exclusively.
    pub(crate) fn from_vec(buf: Vec<u8, N>) -> Self {
        Self { buf }
    }

    /// The byte budget this document was decoded under.
    pub fn capacity(&self) -> usize {
        N
    }

    /// Bytes of the budget actually used.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the document holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The document as compacted JSON text.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf).unwrap_or("")
    }

    /// The root value of the document.
    pub fn root(&self) -> Value<'_> {
        Value::classify(self.as_str()).unwrap_or(Value::Null)
    }
}

/// A borrowed view of a JSON value inside a [`Document`].
///
/// String content is returned in wire form: escape sequences are validated
/// during decode but not expanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// A number, kept as its source text.
    Number(&'a str),
    /// A string, without the surrounding quotes.
    String(&'a str),
    /// An array, including its brackets.
    Array(&'a str),
    /// An object, including its braces.
    Object(&'a str),
}

impl<'a> Value<'a> {
    pub(crate) fn classify(text: &'a str) -> Option<Value<'a>> {
        let t = text.trim();
        match t.as_bytes().first()? {
            b'"' if t.len() >= 2 && t.ends_with('"') => Some(Value::String(&t[1..t.len() - 1])),
            b'{' => Some(Value::Object(t)),
            b'[' => Some(Value::Array(t)),
            b't' if t == "true" => Some(Value::Bool(true)),
            b'f' if t == "false" => Some(Value::Bool(false)),
            b'n' if t == "null" => Some(Value::Null),
            b'-' | b'0'..=b'9' => Some(Value::Number(t)),
            _ => None,
        }
    }

    /// Look up a member of an object by key.
    pub fn get(&self, key: &str) -> Option<Value<'a>> {
        match self {
            Value::Object(text) => Value::classify(scan::object_member(text, key)?),
            _ => None,
        }
    }

    /// Look up an array element by index.
    pub fn at(&self, index: usize) -> Option<Value<'a>> {
        match self {
            Value::Array(text) => Value::classify(scan::array_element(text, index)?),
            _ => None,
        }
    }

    /// String content (escapes left as-is), if this is a string.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if this is a number with an integral representation.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Floating-point value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Boolean value, if this is `true` or `false`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this value is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}
