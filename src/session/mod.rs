//! RTSP session state machine and per-method request builders (RFC 2326
//! §3/§10, RFC 7826 §4/§13).
//!
//! This is the client's view of the conversation: a `Session` is opened
//! against a base URI, drives the method-legality table itself (a
//! well-behaved client never sends a request its own state rules out),
//! and learns the session id and timeout from the server's responses
//! rather than minting them.

use std::sync::Arc;
use std::time::Duration;

use base64::prelude::{BASE64_STANDARD, Engine as _};
use parking_lot::Mutex;

use crate::connection::Connection;
use crate::correlator;
use crate::error::{Error, Result};
use crate::message::{HeaderMap, Method, Request, Response, Version};
use crate::url::RtspUrl;

/// Default session timeout in seconds, used until a `Session` response
/// header says otherwise (RFC 2326 §12.37).
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 60;

/// Client-side view of an RTSP session's lifecycle.
///
/// ```text
/// Init --SETUP--> Ready --PLAY--> Playing --PAUSE--> Ready
///   |                |--RECORD--> Recording --PAUSE--> Ready
///   |                                  |
///   +-----------------TEARDOWN---------+---> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No `Session` id has been established yet; only `OPTIONS`,
    /// `DESCRIBE`, and `ANNOUNCE` are legal.
    Init,
    /// `SETUP` succeeded; media is not yet flowing.
    Ready,
    /// `PLAY` succeeded; the server is delivering media.
    Playing,
    /// `RECORD` succeeded; the server is receiving media from the client.
    Recording,
    /// `TEARDOWN` succeeded (or the connection was lost). Terminal.
    Closed,
}

/// Whether `method` is legal to send from `state`, per the per-state
/// method table.
fn is_legal(state: SessionState, method: &Method) -> bool {
    use Method::*;
    use SessionState::*;
    match (state, method) {
        (Closed, _) => false,
        (_, Options) => true,
        (Init | Ready, Describe | Announce) => true,
        (Init | Ready, Setup) => true,
        (Ready | Playing, Play) => true,
        (Ready | Recording, Record) => true,
        (Playing | Recording, Pause) => true,
        (Init, Teardown) => true, // no-op: nothing was ever set up
        (Ready | Playing | Recording, Teardown) => true,
        (Init | Ready | Playing | Recording, GetParameter | SetParameter) => true,
        _ => false,
    }
}

/// The state a session moves to after a 2xx response to `method` sent from
/// `from`. Only called once `is_legal` has already passed.
fn next_state(from: SessionState, method: &Method) -> SessionState {
    use Method::*;
    match method {
        Setup => SessionState::Ready,
        Play => SessionState::Playing,
        Record => SessionState::Recording,
        Pause => SessionState::Ready,
        Teardown => SessionState::Closed,
        _ => from,
    }
}

/// A single client-side RTSP session bound to one connection.
pub struct Session {
    base_uri: RtspUrl,
    version: Version,
    connection: Arc<Connection>,
    state: Mutex<SessionState>,
    session_id: Mutex<Option<String>>,
    timeout_secs: Mutex<u64>,
    default_request_timeout: Duration,
}

impl Session {
    /// Open a session against `base_uri` over an already-connected
    /// [`Connection`]. No bytes are written until the first request is
    /// sent. `default_request_timeout` is used by [`Session::send`]
    /// whenever a caller passes `None`.
    pub fn new(
        base_uri: RtspUrl,
        version: Version,
        connection: Arc<Connection>,
        default_request_timeout: Duration,
    ) -> Self {
        Session {
            base_uri,
            version,
            connection,
            state: Mutex::new(SessionState::Init),
            session_id: Mutex::new(None),
            timeout_secs: Mutex::new(DEFAULT_SESSION_TIMEOUT_SECS),
            default_request_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    pub fn timeout_secs(&self) -> u64 {
        *self.timeout_secs.lock()
    }

    pub fn base_uri(&self) -> &RtspUrl {
        &self.base_uri
    }

    fn new_request(&self, method: Method, uri: impl Into<String>) -> Request {
        let mut headers = HeaderMap::new();
        let cseq = self.connection.correlator().next_cseq();
        headers.set("CSeq", cseq.to_string());
        headers.set("User-Agent", "rtsp-client-rs/0.1");

        if let Some(id) = self.session_id() {
            headers.set("Session", id);
        }
        if let Some((user, pass)) = self.base_uri.credentials() {
            let encoded = BASE64_STANDARD.encode(format!("{user}:{pass}"));
            headers.set("Authorization", format!("Basic {encoded}"));
        }

        Request {
            method,
            uri: uri.into(),
            version: self.version,
            headers,
            body: None,
        }
    }

    pub fn options(&self) -> Request {
        self.new_request(Method::Options, self.base_uri.to_string())
    }

    /// Build a `DESCRIBE`. `accept` overrides the default
    /// `Accept: application/sdp` when the caller wants a different media
    /// description format.
    pub fn describe(&self, accept: Option<&str>) -> Request {
        let mut req = self.new_request(Method::Describe, self.base_uri.to_string());
        req.headers.set("Accept", accept.unwrap_or("application/sdp"));
        req
    }

    /// Build an `ANNOUNCE` carrying an SDP body (RFC 7826 §13.3). Legal
    /// from [`SessionState::Init`] or [`SessionState::Ready`] and does not
    /// change session state on success.
    pub fn announce(&self, sdp: Vec<u8>) -> Request {
        let mut req = self.new_request(Method::Announce, self.base_uri.to_string());
        req.headers.set("Content-Type", "application/sdp");
        req.body = Some(sdp);
        req
    }

    /// Build a `SETUP` for one track's control URI with the given
    /// transport spec.
    pub fn setup(&self, track_uri: &RtspUrl, transport: &crate::message::TransportSpec) -> Request {
        let mut req = self.new_request(Method::Setup, track_uri.to_string());
        req.headers.set("Transport", transport.to_string());
        req
    }

    pub fn play(&self, range: Option<&crate::message::Range>) -> Request {
        let mut req = self.new_request(Method::Play, self.base_uri.to_string());
        if let Some(r) = range {
            req.headers.set("Range", r.to_string());
        }
        req
    }

    pub fn record(&self, range: Option<&crate::message::Range>) -> Request {
        let mut req = self.new_request(Method::Record, self.base_uri.to_string());
        if let Some(r) = range {
            req.headers.set("Range", r.to_string());
        }
        req
    }

    pub fn pause(&self) -> Request {
        self.new_request(Method::Pause, self.base_uri.to_string())
    }

    pub fn teardown(&self) -> Request {
        self.new_request(Method::Teardown, self.base_uri.to_string())
    }

    pub fn get_parameter(&self, params: Option<Vec<u8>>) -> Request {
        let mut req = self.new_request(Method::GetParameter, self.base_uri.to_string());
        if let Some(body) = params {
            req.headers.set("Content-Type", "text/parameters");
            req.body = Some(body);
        }
        req
    }

    pub fn set_parameter(&self, body: Vec<u8>, content_type: &str) -> Request {
        let mut req = self.new_request(Method::SetParameter, self.base_uri.to_string());
        req.headers.set("Content-Type", content_type);
        req.body = Some(body);
        req
    }

    /// Send `request`, enforcing method legality against the session's
    /// current state before any bytes are written. `timeout` of `None`
    /// falls back to the session's configured default request timeout.
    /// On a 2xx response, transitions state and captures/validates the
    /// `Session` id. On any other response, state is left unchanged and
    /// [`Error::ProtocolError`] is returned.
    pub fn send(&self, request: Request, timeout: Option<Duration>) -> Result<Response> {
        let timeout = Some(timeout.unwrap_or(self.default_request_timeout));
        let current = self.state();
        if !is_legal(current, &request.method) {
            return Err(Error::IllegalState {
                from: current,
                method: request.method,
            });
        }

        // Nothing was ever set up, so there is nothing to tear down.
        if current == SessionState::Init && request.method == Method::Teardown {
            let response = synthetic_ok(request.version, &request);
            *self.state.lock() = SessionState::Closed;
            return Ok(response);
        }

        let cseq = request.cseq().expect("builders always set CSeq");
        let rx = self.connection.correlator().register(cseq)?;
        if let Err(e) = self.connection.write_request(&request) {
            self.connection.correlator().cancel(cseq);
            return Err(e);
        }

        let response = match correlator::wait(&rx, timeout) {
            Ok(r) => r,
            Err(e) => {
                self.connection.correlator().cancel(cseq);
                return Err(e);
            }
        };

        if let Some(actual) = response.cseq() {
            if actual != cseq {
                return Err(Error::CSeqMismatch {
                    expected: cseq,
                    actual,
                });
            }
        }

        self.apply_response(current, &request.method, &response)?;
        Ok(response)
    }

    fn apply_response(&self, from: SessionState, method: &Method, response: &Response) -> Result<()> {
        if !response.is_success() {
            return Err(Error::ProtocolError(Box::new(response.clone())));
        }

        if let Some(id) = response.session_id() {
            let mut current_id = self.session_id.lock();
            match current_id.as_deref() {
                Some(existing) if existing != id => {
                    return Err(Error::SessionIdDrift {
                        expected: existing.to_string(),
                        actual: id.to_string(),
                    });
                }
                Some(_) => {}
                None => *current_id = Some(id.to_string()),
            }
            *self.timeout_secs.lock() = response.session_timeout_secs();
        }

        // A successful TEARDOWN ends the session; nothing is left to carry
        // the old id forward.
        if *method == Method::Teardown {
            *self.session_id.lock() = None;
        }

        let new_state = next_state(from, method);
        if new_state != from {
            tracing::debug!(?from, ?new_state, %method, "session state transition");
        }
        *self.state.lock() = new_state;
        Ok(())
    }
}

/// A locally-synthesized 200 OK for the Init-state TEARDOWN no-op, carrying
/// the request's own CSeq so callers inspecting `response.cseq()` see a
/// consistent round trip.
fn synthetic_ok(version: Version, request: &Request) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(cseq) = request.cseq() {
        headers.set("CSeq", cseq.to_string());
    }
    Response {
        version,
        status: 200,
        reason: "OK".to_string(),
        headers,
        body: None,
    }
}
