//! Budget-bounded JSON documents for constrained devices.
//!
//! This module is the response-side counterpart of the HTTP machinery: a
//! streaming decoder that reads a body straight off a transport into a
//! fixed-budget [`Document`], optionally trimmed by a [`Filter`] while it is
//! being parsed. Filtered-out data never touches memory, so the budget only
//! has to cover the fields the caller actually wants.
//!
//! The decoder is deliberately small: one value per body, nesting capped at
//! ten levels, string content kept in wire (escaped) form. Typed payloads
//! going the other way are serialized with `serde-json-core`.

/// Streaming decode entry point.
pub mod decode;
/// The bounded document and its value views.
pub mod document;
/// Decode error type.
pub mod error;
/// Decode-time field filtering.
pub mod filter;

pub(crate) mod scan;

pub use decode::decode_from;
pub use document::{Document, Value};
pub use error::Error;
pub use filter::Filter;
