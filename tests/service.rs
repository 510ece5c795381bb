use std::cell::RefCell;
use std::rc::Rc;

use base64ct::{Base64, Encoding};
use jsonservice::json::{self, Filter};
use jsonservice::network::error::Error as NetError;
use jsonservice::network::{Close, Connect, Delay, Read, TlsValidation, Transport, Write};
use jsonservice::service::{Error, JsonService, ServiceConfig};

#[derive(Default)]
struct TransportState {
    incoming: Vec<u8>,
    read_pos: usize,
    written: Vec<u8>,
    open: bool,
    closes: usize,
    reject_blank_line: bool,
}

struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl Read for MockTransport {
    type Error = NetError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut s = self.state.borrow_mut();
        let available = s.incoming.len() - s.read_pos;
        let n = buf.len().min(available);
        let start = s.read_pos;
        buf[..n].copy_from_slice(&s.incoming[start..start + n]);
        s.read_pos += n;
        Ok(n)
    }
}

impl Write for MockTransport {
    type Error = NetError;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut s = self.state.borrow_mut();
        if s.reject_blank_line && buf == b"\r\n".as_slice() {
            return Ok(0);
        }
        s.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockTransport {
    type Error = NetError;

    fn close(self) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        s.open = false;
        s.closes += 1;
        Ok(())
    }
}

impl Transport for MockTransport {
    fn has_data(&mut self) -> bool {
        let s = self.state.borrow();
        s.read_pos < s.incoming.len()
    }

    fn is_connected(&mut self) -> bool {
        self.state.borrow().open
    }
}

struct MockConnector {
    fail: bool,
    log: Rc<RefCell<Vec<String>>>,
    transport: Rc<RefCell<TransportState>>,
}

impl Connect for MockConnector {
    type Transport = MockTransport;
    type Error = NetError;

    fn connect(&mut self, server: &str, port: u16) -> Result<MockTransport, NetError> {
        self.log.borrow_mut().push(format!("plain {server}:{port}"));
        if self.fail {
            return Err(NetError::ConnectionRefused);
        }
        self.transport.borrow_mut().open = true;
        Ok(MockTransport {
            state: self.transport.clone(),
        })
    }

    fn connect_secure(
        &mut self,
        server: &str,
        port: u16,
        validation: &TlsValidation<'_>,
    ) -> Result<MockTransport, NetError> {
        let mode = match validation {
            TlsValidation::CaCert(_) => "ca",
            TlsValidation::Fingerprint(_) => "fingerprint",
            TlsValidation::Insecure => "insecure",
        };
        self.log
            .borrow_mut()
            .push(format!("secure {server}:{port} {mode}"));
        if self.fail {
            return Err(NetError::ConnectionRefused);
        }
        self.transport.borrow_mut().open = true;
        Ok(MockTransport {
            state: self.transport.clone(),
        })
    }
}

/// A factory that never overrides `connect_secure`, like a platform built
/// without TLS.
struct PlainOnlyConnector {
    log: Rc<RefCell<Vec<String>>>,
    transport: Rc<RefCell<TransportState>>,
}

impl Connect for PlainOnlyConnector {
    type Transport = MockTransport;
    type Error = NetError;

    fn connect(&mut self, server: &str, port: u16) -> Result<MockTransport, NetError> {
        self.log.borrow_mut().push(format!("plain {server}:{port}"));
        self.transport.borrow_mut().open = true;
        Ok(MockTransport {
            state: self.transport.clone(),
        })
    }
}

struct CountingDelay {
    slept_ms: Rc<RefCell<u32>>,
}

impl Delay for CountingDelay {
    fn delay_ms(&mut self, ms: u32) {
        *self.slept_ms.borrow_mut() += ms;
    }
}

struct Harness {
    transport: Rc<RefCell<TransportState>>,
    log: Rc<RefCell<Vec<String>>>,
    slept_ms: Rc<RefCell<u32>>,
    service: JsonService<MockConnector, CountingDelay>,
}

fn harness(config: ServiceConfig, response: &[u8]) -> Harness {
    let transport = Rc::new(RefCell::new(TransportState {
        incoming: response.to_vec(),
        ..TransportState::default()
    }));
    let log = Rc::new(RefCell::new(Vec::new()));
    let slept_ms = Rc::new(RefCell::new(0));
    let connector = MockConnector {
        fail: false,
        log: log.clone(),
        transport: transport.clone(),
    };
    let delay = CountingDelay {
        slept_ms: slept_ms.clone(),
    };
    Harness {
        transport,
        log,
        slept_ms,
        service: JsonService::new(config, connector, delay),
    }
}

fn config(server: &str, port: u16) -> ServiceConfig {
    ServiceConfig::new(server, port).unwrap()
}

fn ok_response(body: &str) -> Vec<u8> {
    format!("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{body}").into_bytes()
}

fn written(h: &Harness) -> String {
    String::from_utf8(h.transport.borrow().written.clone()).unwrap()
}

#[test]
fn test_get_request_line_and_fixed_headers() {
    let mut h = harness(config("device.local", 8080), &ok_response("{}"));
    let doc = h
        .service
        .issue_get::<32>("/api/state", None, TlsValidation::Insecure)
        .unwrap();
    assert_eq!(doc.as_str(), "{}");

    let sent = written(&h);
    assert!(sent.starts_with("GET /api/state HTTP/1.0\r\n"));
    assert!(sent.contains("Host: device.local:8080\r\n"));
    assert!(sent.contains("Connection: close\r\n"));
    assert!(sent.contains("User-Agent: jsonservice/"));
    assert!(sent.ends_with("\r\n\r\n"));
    assert_eq!(h.transport.borrow().closes, 1);
}

#[test]
fn test_no_username_means_no_authorization_header() {
    let mut h = harness(config("device.local", 80), &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap();
    assert!(!written(&h).contains("Authorization"));
}

#[test]
fn test_basic_auth_token_encodes_username_and_password() {
    let mut cfg = config("device.local", 80);
    cfg.username = heapless::String::try_from("melvin").unwrap();
    cfg.password = heapless::String::try_from("hunter2").unwrap();
    let mut h = harness(cfg, &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap();

    let mut buf = [0u8; 32];
    let expected = Base64::encode(b"melvin:hunter2", &mut buf).unwrap();
    assert!(written(&h).contains(&format!("Authorization: Basic {expected}\r\n")));
}

#[test]
fn test_api_key_header_only_when_value_present() {
    let mut cfg = config("device.local", 80);
    cfg.api_key_name = heapless::String::try_from("X-Api-Key").unwrap();
    let mut h = harness(cfg.clone(), &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap();
    assert!(!written(&h).contains("X-Api-Key"));

    cfg.api_key_value = heapless::String::try_from("secret-key").unwrap();
    let mut h = harness(cfg, &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap();
    assert!(written(&h).contains("X-Api-Key: secret-key\r\n"));
}

#[test]
fn test_post_with_empty_payload_sends_no_body() {
    let mut h = harness(config("device.local", 80), &ok_response("{}"));
    h.service.issue_post::<32>("/api/run", "", None).unwrap();

    let sent = written(&h);
    assert!(sent.starts_with("POST /api/run HTTP/1.0\r\n"));
    assert!(!sent.contains("Content-Type"));
    assert!(!sent.contains("Content-Length"));
    assert!(sent.ends_with("\r\n\r\n"));
}

#[test]
fn test_post_payload_and_exact_content_length() {
    let mut h = harness(config("device.local", 80), &ok_response("{}"));
    h.service
        .issue_post::<32>("/api/run", r#"{"cmd":"go"}"#, None)
        .unwrap();

    let sent = written(&h);
    assert!(sent.contains("Content-Type: application/json\r\n"));
    assert!(sent.contains("Content-Length: 12\r\n"));
    assert!(sent.ends_with("\r\n\r\n{\"cmd\":\"go\"}\r\n"));
}

#[test]
fn test_post_with_serializes_typed_payload() {
    #[derive(serde::Serialize)]
    struct Command<'a> {
        cmd: &'a str,
        level: u8,
    }

    let mut h = harness(config("device.local", 80), &ok_response("{}"));
    h.service
        .issue_post_with::<_, 48, 32>(
            "/api/run",
            &Command {
                cmd: "dim",
                level: 3,
            },
            None,
        )
        .unwrap();

    let sent = written(&h);
    assert!(sent.contains(r#"{"cmd":"dim","level":3}"#));
    assert!(sent.contains("Content-Length: 23\r\n"));
}

#[test]
fn test_conflict_status_still_yields_document() {
    let response = b"HTTP/1.1 409 CONFLICT\r\nX: y\r\n\r\n{\"busy\":true}";
    let mut h = harness(config("device.local", 80), response);
    let doc = h
        .service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap();
    assert_eq!(doc.root().get("busy").and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn test_unexpected_status_drains_and_closes() {
    let response = b"HTTP/1.1 404 NOT FOUND\r\nContent-Type: text/html\r\n\r\nnot here";
    let mut h = harness(config("device.local", 80), response);
    let err = h
        .service
        .issue_get::<32>("/missing", None, TlsValidation::Insecure)
        .unwrap_err();
    match err {
        Error::UnexpectedStatus(line) => assert_eq!(line.as_str(), "HTTP/1.1 404 NOT FOUND"),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
    let state = h.transport.borrow();
    // Everything was read off the wire before the close.
    assert_eq!(state.read_pos, state.incoming.len());
    assert_eq!(state.closes, 1);
}

#[test]
fn test_wrong_http_version_token_is_unexpected() {
    let response = b"HTTP/2 200\r\n\r\n{}";
    let mut h = harness(config("device.local", 80), response);
    let err = h
        .service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedStatus(_)));
}

#[test]
fn test_missing_header_terminator_is_malformed() {
    let response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json";
    let mut h = harness(config("device.local", 80), response);
    let err = h
        .service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap_err();
    assert_eq!(err, Error::MalformedHeaders);
    assert_eq!(h.transport.borrow().closes, 1);
}

#[test]
fn test_body_over_budget_reports_capacity_figures() {
    let mut h = harness(
        config("device.local", 80),
        &ok_response(r#"{"a":1,"b":2,"c":3}"#),
    );
    let err = h
        .service
        .issue_get::<8>("/", None, TlsValidation::Insecure)
        .unwrap_err();
    assert_eq!(
        err,
        Error::BodyDecode {
            requested: 8,
            capacity: 8,
            source: json::Error::NoMemory,
        }
    );
    assert_eq!(h.transport.borrow().closes, 1);
}

#[test]
fn test_filter_lets_budget_cover_kept_fields_only() {
    let filter = Filter::new(r#"{"a":true,"c":true}"#);
    let mut h = harness(
        config("device.local", 80),
        &ok_response(r#"{"a":1,"b":2,"c":3}"#),
    );
    let doc = h
        .service
        .issue_get::<13>("/", Some(&filter), TlsValidation::Insecure)
        .unwrap();
    assert_eq!(doc.as_str(), r#"{"a":1,"c":3}"#);
    assert!(doc.root().get("b").is_none());
}

#[test]
fn test_connection_failure_writes_nothing() {
    let transport = Rc::new(RefCell::new(TransportState::default()));
    let log = Rc::new(RefCell::new(Vec::new()));
    let connector = MockConnector {
        fail: true,
        log: log.clone(),
        transport: transport.clone(),
    };
    let delay = CountingDelay {
        slept_ms: Rc::new(RefCell::new(0)),
    };
    let mut service = JsonService::new(config("unreachable.local", 80), connector, delay);

    let err = service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap_err();
    assert_eq!(err, Error::ConnectionFailed);
    let state = transport.borrow();
    assert!(state.written.is_empty());
    assert!(!state.open);
    assert_eq!(state.closes, 0);
}

#[test]
fn test_rejected_blank_line_write() {
    let mut h = harness(config("device.local", 80), &ok_response("{}"));
    h.transport.borrow_mut().reject_blank_line = true;
    let err = h
        .service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap_err();
    assert_eq!(err, Error::RequestRejected);
    assert_eq!(h.transport.borrow().closes, 1);
}

#[test]
fn test_secure_port_uses_supplied_validation() {
    let mut h = harness(config("device.local", 443), &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::CaCert("---CERT---"))
        .unwrap();
    assert_eq!(h.log.borrow()[0], "secure device.local:443 ca");

    let mut h = harness(config("device.local", 443), &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::Fingerprint("AA:BB"))
        .unwrap();
    assert_eq!(h.log.borrow()[0], "secure device.local:443 fingerprint");

    let mut h = harness(config("device.local", 443), &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap();
    assert_eq!(h.log.borrow()[0], "secure device.local:443 insecure");
}

#[test]
fn test_non_secure_port_ignores_validation() {
    let mut h = harness(config("device.local", 8080), &ok_response("{}"));
    h.service
        .issue_get::<32>("/", None, TlsValidation::CaCert("---CERT---"))
        .unwrap();
    assert_eq!(h.log.borrow()[0], "plain device.local:8080");
}

#[test]
fn test_post_on_secure_port_connects_insecure() {
    let mut h = harness(config("device.local", 443), &ok_response("{}"));
    h.service.issue_post::<32>("/", "", None).unwrap();
    assert_eq!(h.log.borrow()[0], "secure device.local:443 insecure");
}

#[test]
fn test_tls_less_factory_falls_back_to_plain_on_443() {
    let transport = Rc::new(RefCell::new(TransportState {
        incoming: ok_response("{}"),
        ..TransportState::default()
    }));
    let log = Rc::new(RefCell::new(Vec::new()));
    let connector = PlainOnlyConnector {
        log: log.clone(),
        transport: transport.clone(),
    };
    let delay = CountingDelay {
        slept_ms: Rc::new(RefCell::new(0)),
    };
    let mut service = JsonService::new(config("device.local", 443), connector, delay);
    service
        .issue_get::<32>("/", None, TlsValidation::CaCert("---CERT---"))
        .unwrap();
    assert_eq!(log.borrow()[0], "plain device.local:443");
}

#[test]
fn test_silent_peer_times_out_at_deadline() {
    let mut cfg = config("device.local", 80);
    cfg.poll_interval_ms = 2;
    cfg.response_deadline_ms = Some(10);
    let mut h = harness(cfg, b"");
    let err = h
        .service
        .issue_get::<32>("/", None, TlsValidation::Insecure)
        .unwrap_err();
    assert_eq!(err, Error::Timeout);
    assert!(*h.slept_ms.borrow() >= 10);
    assert_eq!(h.transport.borrow().closes, 1);
}
