//! Failure outcomes of a GET/POST exchange.

use heapless::String;

use crate::json;

/// Longest status-line prefix that is captured for diagnostics. The two
/// accepted lines fit well within this.
pub const STATUS_LINE_MAX: usize = 32;

/// Why a request produced no document.
///
/// All protocol failures collapse into this one enum at the client boundary;
/// nothing panics and nothing propagates a transport error type. Every
/// variant means the connection has already been closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport could not connect to the configured server and port.
    ConnectionFailed,
    /// The remote closed or refused the stream before the request was fully
    /// accepted, or a write failed mid-request.
    RequestRejected,
    /// The request head did not fit the internal request buffer.
    RequestTooLarge,
    /// The serialized payload did not fit its buffer (typed POST only).
    PayloadTooLarge,
    /// No response data arrived within the configured deadline.
    Timeout,
    /// The status line was not one of the two accepted values. Carries the
    /// captured line, truncated to [`STATUS_LINE_MAX`] bytes.
    UnexpectedStatus(String<STATUS_LINE_MAX>),
    /// The header block never terminated with an empty line.
    MalformedHeaders,
    /// The body did not decode into the budgeted document.
    BodyDecode {
        /// The byte budget the caller asked for.
        requested: usize,
        /// The usable capacity of the document that was being filled.
        capacity: usize,
        /// What the decoder tripped over.
        source: json::Error,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::ConnectionFailed => defmt::write!(f, "ConnectionFailed"),
            Error::RequestRejected => defmt::write!(f, "RequestRejected"),
            Error::RequestTooLarge => defmt::write!(f, "RequestTooLarge"),
            Error::PayloadTooLarge => defmt::write!(f, "PayloadTooLarge"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::UnexpectedStatus(line) => {
                defmt::write!(f, "UnexpectedStatus({=str})", line.as_str())
            }
            Error::MalformedHeaders => defmt::write!(f, "MalformedHeaders"),
            Error::BodyDecode {
                requested,
                capacity,
                source,
            } => defmt::write!(
                f,
                "BodyDecode(requested={=usize}, capacity={=usize}, {})",
                requested,
                capacity,
                source
            ),
        }
    }
}
