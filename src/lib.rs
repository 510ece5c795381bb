//! # jsonservice - minimal JSON-over-HTTP for constrained devices
//!
//! A client-side request/response engine that issues GET and POST calls
//! carrying JSON payloads and decodes the response body into a structured,
//! budget-bounded document. It is written for devices where a full HTTP
//! client stack is too heavy: `no_std`, no allocator, fixed buffers
//! everywhere, HTTP/1.0 with `Connection: close` so end-of-body is simply
//! end-of-stream.
//!
//! The crate deliberately does not implement a network stack. Concrete
//! TCP/TLS connections are supplied through the small trait set in
//! [`network`]; the service core drives whatever transport the platform
//! provides.
//!
//! ## Usage
//!
//! ```rust
//! use jsonservice::network::{Close, Connect, Delay, Read, TlsValidation, Transport, Write};
//! use jsonservice::{JsonService, ServiceConfig};
//! # struct MockTransport;
//! # impl Read for MockTransport {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> { Ok(0) }
//! # }
//! # impl Write for MockTransport {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, ()> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! # }
//! # impl Close for MockTransport {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), ()> { Ok(()) }
//! # }
//! # impl Transport for MockTransport {
//! #     fn has_data(&mut self) -> bool { false }
//! #     fn is_connected(&mut self) -> bool { false }
//! # }
//! # struct MockConnector;
//! # impl Connect for MockConnector {
//! #     type Transport = MockTransport;
//! #     type Error = ();
//! #     fn connect(&mut self, _s: &str, _p: u16) -> Result<MockTransport, ()> { Ok(MockTransport) }
//! # }
//! # struct NoDelay;
//! # impl Delay for NoDelay { fn delay_ms(&mut self, _ms: u32) {} }
//!
//! let config = ServiceConfig::new("api.example.com", 80).unwrap();
//! let mut service = JsonService::new(config, MockConnector, NoDelay);
//!
//! // Fetch /status into a document budgeted at 256 bytes.
//! let outcome = service.issue_get::<256>("/status", None, TlsValidation::Insecure);
//! # let _ = outcome;
//! ```
//!
//! ## Memory model
//!
//! Every response is decoded into a [`json::Document`] whose byte budget is
//! a per-call const generic; decoding fails rather than grow. A
//! [`json::Filter`] trims unwanted fields *while* the body is parsed, so the
//! budget only needs to cover the fields the caller keeps.
//!
//! ## Optional features
//!
//! - `std`: enable standard library support (default: disabled)
//! - `defmt`: `defmt::Format` impls and warning-level diagnostics at failure
//!   points

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Transport abstraction: the traits a platform implements to lend the
/// service its TCP/TLS connections.
pub mod network;

/// Budget-bounded JSON documents, decode-time filtering and the streaming
/// decoder.
pub mod json;

/// The JSON service client itself: configuration, failure outcomes and the
/// GET/POST orchestrator.
pub mod service;

pub use network::TlsValidation;
pub use service::{Error, JsonService, ServiceConfig};
