//! Byte-stream transport abstraction for embedded systems.
//!
//! The service core never talks to a concrete TCP or TLS stack. It drives a
//! transport through the small trait set in this module, so the same protocol
//! logic runs on top of a lwIP socket, an offload-modem AT channel, or a mock
//! in a test harness.

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error type for transport implementations.
pub mod error;

/// Re-exports of the transport traits.
pub mod prelude {
    pub use super::{Close, Connect, Delay, Read, TlsValidation, Transport, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection. `Ok(0)` means the peer has closed the
    /// stream and no further data will arrive.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection, returning how many bytes were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection. Consuming `self` makes double-release
    /// unrepresentable.
    fn close(self) -> Result<(), Self::Error>;
}

/// An open byte-stream connection, with the readiness signals the response
/// reader polls while waiting for the server to answer.
pub trait Transport: Read + Write + Close {
    /// Whether at least one byte is ready to be read without blocking.
    fn has_data(&mut self) -> bool;
    /// Whether the connection is still established.
    fn is_connected(&mut self) -> bool;
}

/// How a TLS connection authenticates the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsValidation<'a> {
    /// Validate the certificate chain against a CA certificate (PEM).
    /// Requires a platform with trust-store logic.
    CaCert(&'a str),
    /// Pin the leaf certificate by its fingerprint, for platforms that cannot
    /// afford full chain validation.
    Fingerprint(&'a str),
    /// Skip certificate validation entirely. The connection is encrypted but
    /// the peer is NOT authenticated; any host can impersonate the server.
    /// Opt into this only on platforms that cannot carry a trust store.
    Insecure,
}

/// A connection factory. One factory serves every request the service makes;
/// the service opens exactly one connection per request.
pub trait Connect {
    /// Associated transport type
    type Transport: Transport;
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Open a plain connection to `server:port`.
    fn connect(&mut self, server: &str, port: u16) -> Result<Self::Transport, Self::Error>;

    /// Open a TLS connection to `server:port`, authenticating the server per
    /// `validation`.
    ///
    /// The default implementation ignores `validation` and opens a plain
    /// connection: platforms built without TLS support fall back to
    /// cleartext. TLS-capable factories override this; chain-validating
    /// stacks honor [`TlsValidation::CaCert`], pinning-only stacks honor
    /// [`TlsValidation::Fingerprint`].
    fn connect_secure(
        &mut self,
        server: &str,
        port: u16,
        _validation: &TlsValidation<'_>,
    ) -> Result<Self::Transport, Self::Error> {
        self.connect(server, port)
    }
}

/// Platform sleep hook, used between polls while waiting for response data.
pub trait Delay {
    /// Block the calling thread/task for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
