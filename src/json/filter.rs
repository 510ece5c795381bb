//! Decode-time filter for trimming a response down to the fields of interest.

use super::scan;

/// A filter document, expressed as JSON mirroring the shape of the expected
/// body.
///
/// Semantics, applied while the body is parsed (excluded data is never
/// stored):
///
/// - `true` keeps the matched value and everything below it,
/// - an object keeps the matched object but recurses per key; keys absent
///   from the filter are skipped,
/// - an array applies its first element to every element of the matched
///   array,
/// - anything else (including a missing key) skips the matched value.
///
/// ```
/// use jsonservice::json::Filter;
///
/// // Keep only the temperature of every list entry.
/// let filter = Filter::new(r#"{"list":[{"temp":true}]}"#);
/// # let _ = filter;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Filter<'a> {
    text: &'a str,
}

impl<'a> Filter<'a> {
    /// Wrap a filter-JSON string.
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    pub(crate) fn root(&self) -> Node<'a> {
        Node::from_text(self.text)
    }
}

/// Resolved filter position for one node of the body being parsed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Node<'f> {
    /// Keep this value and its whole subtree.
    KeepAll,
    /// Keep this object, recursing per key.
    Object(&'f str),
    /// Keep this array, applying the nested filter to each element.
    Array(&'f str),
    /// Discard this value.
    Skip,
}

impl<'f> Node<'f> {
    pub(crate) fn from_text(text: &'f str) -> Self {
        let t = text.trim();
        if t == "true" {
            Node::KeepAll
        } else if t.starts_with('{') {
            Node::Object(t)
        } else if t.starts_with('[') {
            Node::Array(t)
        } else {
            Node::Skip
        }
    }

    /// The filter position for member `key` of an object matched by `self`.
    pub(crate) fn member(&self, key: &str) -> Node<'f> {
        match self {
            Node::KeepAll => Node::KeepAll,
            Node::Object(text) => scan::object_member(text, key)
                .map(Node::from_text)
                .unwrap_or(Node::Skip),
            _ => Node::Skip,
        }
    }

    /// The filter position for the elements of an array matched by `self`.
    pub(crate) fn element(&self) -> Node<'f> {
        match self {
            Node::KeepAll => Node::KeepAll,
            Node::Array(text) => scan::array_element(text, 0)
                .map(Node::from_text)
                .unwrap_or(Node::Skip),
            _ => Node::Skip,
        }
    }

    pub(crate) fn is_skip(&self) -> bool {
        matches!(self, Node::Skip)
    }
}
