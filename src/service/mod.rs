//! The JSON service client: GET/POST with JSON bodies over HTTP/1.0.
//!
//! [`JsonService`] composes a connection factory, a delay provider and an
//! immutable [`ServiceConfig`] into two blocking operations, `issue_get` and
//! `issue_post`. Each operation opens exactly one connection, writes a
//! minimal HTTP/1.0 request, waits for the response, checks the status line,
//! skips the headers and streams the body into a budget-bounded
//! [`Document`](crate::json::Document). The connection is closed on every
//! exit path before the call returns.
//!
//! HTTP/1.0 is used deliberately: tiny TCP stacks cope badly with
//! keep-alive and chunked transfer encoding, and `Connection: close` turns
//! end-of-body into end-of-stream.

/// Failure outcomes of a request.
pub mod error;

/// The orchestrating client.
pub mod client;

pub use client::JsonService;
pub use error::Error;

use heapless::String;

/// Maximum server host-name length.
pub const MAX_SERVER_LEN: usize = 64;
/// Maximum username/password/API-key-name length.
pub const MAX_CRED_LEN: usize = 32;
/// Maximum API-key value length.
pub const MAX_API_KEY_LEN: usize = 64;

/// Where and as whom requests are made. Fixed for the life of the client.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Server host name or address.
    pub server: String<MAX_SERVER_LEN>,
    /// Server TCP port. Port 443 selects the TLS path.
    pub port: u16,
    /// Basic-auth username. Empty means no `Authorization` header.
    pub username: String<MAX_CRED_LEN>,
    /// Basic-auth password. Ignored when `username` is empty.
    pub password: String<MAX_CRED_LEN>,
    /// Name of the API-key header. Ignored when `api_key_value` is empty.
    pub api_key_name: String<MAX_CRED_LEN>,
    /// Value of the API-key header. Empty means no API-key header.
    pub api_key_value: String<MAX_API_KEY_LEN>,
    /// Sleep between polls while waiting for response data.
    pub poll_interval_ms: u32,
    /// Overall bound on the wait for response data. `None` waits as long as
    /// the connection stays up, which can stall indefinitely against a peer
    /// that neither answers nor hangs up.
    pub response_deadline_ms: Option<u32>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 80,
            username: String::new(),
            password: String::new(),
            api_key_name: String::new(),
            api_key_value: String::new(),
            poll_interval_ms: 1,
            response_deadline_ms: None,
        }
    }
}

impl ServiceConfig {
    /// Config for `server:port` with no credentials and default polling.
    /// Returns `None` when `server` exceeds [`MAX_SERVER_LEN`].
    pub fn new(server: &str, port: u16) -> Option<Self> {
        Some(Self {
            server: String::try_from(server).ok()?,
            port,
            ..Self::default()
        })
    }
}
