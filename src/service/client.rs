//! The request orchestrator: transport selection, request writing, response
//! reading and body decode, with the connection released on every path.

use core::fmt::Write as _;

use base64ct::{Base64, Encoding};
use heapless::{String, Vec};

use crate::json::{self, Document, Filter};
use crate::network::{Close, Connect, Delay, TlsValidation, Transport};

use super::error::{Error, STATUS_LINE_MAX};
use super::ServiceConfig;

const USER_AGENT: &str = concat!("jsonservice/", env!("CARGO_PKG_VERSION"));
const SECURE_PORT: u16 = 443;

// Servers answer a 1.0 request with a 1.1 status token; these are the only
// two lines accepted, compared byte for byte.
const STATUS_OK: &str = "HTTP/1.1 200 OK";
const STATUS_CONFLICT: &str = "HTTP/1.1 409 CONFLICT";
const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// Upper bound on the request head (request line plus headers).
const REQUEST_HEAD_MAX: usize = 512;

// username (32) + ':' + password (32), and its base64 expansion.
const AUTH_PLAIN_MAX: usize = 65;
const AUTH_TOKEN_MAX: usize = 88;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A blocking JSON-over-HTTP client bound to one server.
///
/// Construction captures the configuration and, when a username is present,
/// encodes the Basic-auth token once. Each operation then owns a single
/// connection from open to close.
pub struct JsonService<C: Connect, D: Delay> {
    config: ServiceConfig,
    connector: C,
    delay: D,
    auth_token: Option<String<AUTH_TOKEN_MAX>>,
}

impl<C: Connect, D: Delay> core::fmt::Debug for JsonService<C, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JsonService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Connect, D: Delay> JsonService<C, D> {
    /// Build a client from its configuration, connection factory and delay
    /// provider.
    pub fn new(config: ServiceConfig, connector: C, delay: D) -> Self {
        let auth_token = encode_auth(&config);
        Self {
            config,
            connector,
            delay,
            auth_token,
        }
    }

    /// Issue a GET to `endpoint` and decode the JSON response into a
    /// document budgeted at `N` bytes.
    ///
    /// `validation` only matters when the configured port is 443; any other
    /// port always yields a plain connection. Passing
    /// [`TlsValidation::Insecure`] skips server authentication and is the
    /// caller's explicit acceptance of that risk.
    pub fn issue_get<const N: usize>(
        &mut self,
        endpoint: &str,
        filter: Option<&Filter<'_>>,
        validation: TlsValidation<'_>,
    ) -> Result<Document<N>, Error> {
        let transport = self.open(&validation)?;
        self.exchange(transport, Method::Get, endpoint, "", filter)
    }

    /// Issue a POST carrying `payload` (already-serialized JSON) to
    /// `endpoint` and decode the response into a document budgeted at `N`
    /// bytes.
    ///
    /// An empty payload sends a bodiless POST. On port 443 the connection is
    /// opened without certificate validation; use [`Self::issue_get`] when
    /// the server must be authenticated.
    pub fn issue_post<const N: usize>(
        &mut self,
        endpoint: &str,
        payload: &str,
        filter: Option<&Filter<'_>>,
    ) -> Result<Document<N>, Error> {
        let transport = self.open(&TlsValidation::Insecure)?;
        self.exchange(transport, Method::Post, endpoint, payload, filter)
    }

    /// Serialize `payload` with `serde-json-core` into a `P`-byte buffer and
    /// POST it. See [`Self::issue_post`].
    pub fn issue_post_with<T, const P: usize, const N: usize>(
        &mut self,
        endpoint: &str,
        payload: &T,
        filter: Option<&Filter<'_>>,
    ) -> Result<Document<N>, Error>
    where
        T: serde::Serialize,
    {
        let body: String<P> =
            serde_json_core::to_string(payload).map_err(|_| Error::PayloadTooLarge)?;
        self.issue_post(endpoint, &body, filter)
    }

    /// Select and open the transport: TLS (as the factory supports it) on
    /// the well-known secure port, plain everywhere else.
    fn open(&mut self, validation: &TlsValidation<'_>) -> Result<C::Transport, Error> {
        let server = self.config.server.as_str();
        let result = if self.config.port == SECURE_PORT {
            self.connector.connect_secure(server, SECURE_PORT, validation)
        } else {
            self.connector.connect(server, self.config.port)
        };
        result.map_err(|_| {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "connection to {=str}:{=u16} failed",
                self.config.server.as_str(),
                self.config.port
            );
            Error::ConnectionFailed
        })
    }

    /// Drive one full request/response exchange. Owns `transport` and closes
    /// it on every path out.
    fn exchange<const N: usize>(
        &mut self,
        mut transport: C::Transport,
        method: Method,
        endpoint: &str,
        payload: &str,
        filter: Option<&Filter<'_>>,
    ) -> Result<Document<N>, Error> {
        if let Err(e) = self.send_request(&mut transport, method, endpoint, payload) {
            let _ = transport.close();
            return Err(e);
        }

        if let Err(e) = self.await_data(&mut transport) {
            let _ = transport.close();
            return Err(e);
        }

        let status = read_status_line(&mut transport);
        if status.as_str() != STATUS_OK && status.as_str() != STATUS_CONFLICT {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "unexpected response '{=str}' for {=str}",
                status.as_str(),
                endpoint
            );
            // Leave no unread bytes behind before closing.
            drain(&mut transport);
            let _ = transport.close();
            return Err(Error::UnexpectedStatus(status));
        }

        if !skip_headers(&mut transport) {
            let _ = transport.close();
            return Err(Error::MalformedHeaders);
        }

        let decoded = json::decode_from::<_, N>(&mut transport, filter);
        let _ = transport.close();
        match decoded {
            Ok(document) => Ok(document),
            Err(source) => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "body decode failed for {=str}: {} (budget {=usize})",
                    endpoint,
                    source,
                    N
                );
                Err(Error::BodyDecode {
                    requested: N,
                    capacity: N,
                    source,
                })
            }
        }
    }

    /// Write the HTTP/1.0 request. The header-terminating blank line is a
    /// separate write so a zero-byte acceptance (remote refused or closed
    /// before consuming the head) can be told apart and reported as
    /// [`Error::RequestRejected`].
    fn send_request<T: Transport>(
        &self,
        transport: &mut T,
        method: Method,
        endpoint: &str,
        payload: &str,
    ) -> Result<(), Error> {
        let has_body = method == Method::Post && !payload.is_empty();

        let mut head: String<REQUEST_HEAD_MAX> = String::new();
        write!(
            head,
            "{} {} HTTP/1.0\r\nHost: {}:{}\r\nConnection: close\r\n",
            method.as_str(),
            endpoint,
            self.config.server,
            self.config.port
        )
        .map_err(|_| Error::RequestTooLarge)?;
        if !self.config.api_key_value.is_empty() {
            write!(
                head,
                "{}: {}\r\n",
                self.config.api_key_name, self.config.api_key_value
            )
            .map_err(|_| Error::RequestTooLarge)?;
        }
        if let Some(token) = &self.auth_token {
            write!(head, "Authorization: Basic {}\r\n", token).map_err(|_| Error::RequestTooLarge)?;
        }
        write!(head, "User-Agent: {}\r\n", USER_AGENT).map_err(|_| Error::RequestTooLarge)?;
        if has_body {
            write!(
                head,
                "Content-Type: application/json\r\nContent-Length: {}\r\n",
                payload.len()
            )
            .map_err(|_| Error::RequestTooLarge)?;
        }

        write_all(transport, head.as_bytes())?;

        // Terminating blank line, checked for zero-byte acceptance.
        match transport.write(b"\r\n") {
            Ok(0) => return Err(Error::RequestRejected),
            Ok(1) => write_all(transport, b"\n")?,
            Ok(_) => {}
            Err(_) => return Err(Error::RequestRejected),
        }

        if has_body {
            write_all(transport, payload.as_bytes())?;
            write_all(transport, b"\r\n")?;
        }
        transport.flush().map_err(|_| Error::RequestRejected)
    }

    /// Poll for response data while the connection is up, sleeping between
    /// polls. Gives up with [`Error::Timeout`] once the configured deadline
    /// passes; without a deadline this waits as long as the peer stays
    /// connected.
    fn await_data<T: Transport>(&mut self, transport: &mut T) -> Result<(), Error> {
        let interval = self.config.poll_interval_ms.max(1);
        let mut waited: u32 = 0;
        while transport.is_connected() && !transport.has_data() {
            if let Some(deadline) = self.config.response_deadline_ms {
                if waited >= deadline {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "no response from {=str}:{=u16} within {=u32} ms",
                        self.config.server.as_str(),
                        self.config.port,
                        deadline
                    );
                    return Err(Error::Timeout);
                }
            }
            self.delay.delay_ms(interval);
            waited = waited.saturating_add(interval);
        }
        Ok(())
    }
}

/// Encode `username:password` once. Empty username means no token and no
/// `Authorization` header, ever.
fn encode_auth(config: &ServiceConfig) -> Option<String<AUTH_TOKEN_MAX>> {
    if config.username.is_empty() {
        return None;
    }
    let mut plain: Vec<u8, AUTH_PLAIN_MAX> = Vec::new();
    plain.extend_from_slice(config.username.as_bytes()).ok()?;
    plain.push(b':').ok()?;
    plain.extend_from_slice(config.password.as_bytes()).ok()?;

    let mut encoded = [0u8; AUTH_TOKEN_MAX];
    let token = Base64::encode(&plain, &mut encoded).ok()?;
    String::try_from(token).ok()
}

fn write_all<T: Transport>(transport: &mut T, mut data: &[u8]) -> Result<(), Error> {
    while !data.is_empty() {
        match transport.write(data) {
            Ok(0) | Err(_) => return Err(Error::RequestRejected),
            Ok(n) => data = &data[n.min(data.len())..],
        }
    }
    Ok(())
}

/// Read the status line: bytes up to the first `\r`, capped at
/// [`STATUS_LINE_MAX`] like the 32-byte buffer this protocol has always used.
/// Read problems surface as a short or empty line, which then fails the
/// exact-match check.
fn read_status_line<T: Transport>(transport: &mut T) -> String<STATUS_LINE_MAX> {
    let mut line: String<STATUS_LINE_MAX> = String::new();
    let mut byte = [0u8; 1];
    while line.len() < STATUS_LINE_MAX {
        match transport.read(&mut byte) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if byte[0] == b'\r' {
                    break;
                }
                if byte[0].is_ascii() {
                    let _ = line.push(byte[0] as char);
                }
            }
        }
    }
    line
}

/// Discard everything up to and including the first `\r\n\r\n`. Returns
/// false when the stream ends first.
fn skip_headers<T: Transport>(transport: &mut T) -> bool {
    let mut matched = 0usize;
    let mut byte = [0u8; 1];
    loop {
        match transport.read(&mut byte) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {
                if byte[0] == HEADER_TERMINATOR[matched] {
                    matched += 1;
                    if matched == HEADER_TERMINATOR.len() {
                        return true;
                    }
                } else if byte[0] == b'\r' {
                    matched = 1;
                } else {
                    matched = 0;
                }
            }
        }
    }
}

/// Read and discard whatever the server still has to say, so no unread bytes
/// linger when the transport is handed back to the platform.
fn drain<T: Transport>(transport: &mut T) {
    let mut sink = [0u8; 32];
    while transport.is_connected() || transport.has_data() {
        match transport.read(&mut sink) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}
