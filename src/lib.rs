//! # rtsp_client — client-side RTSP/1.0 and RTSP/2.0 protocol core
//!
//! A Rust library for speaking RTSP as a client: sending requests, tracking
//! session state, and correlating pipelined responses over one persistent
//! connection. It does not move media — RTP/RTCP delivery and SDP
//! generation are a caller's concern, not this crate's (see [`session`]).
//!
//! ## Protocol references
//!
//! | RFC | Topic | How this crate uses it |
//! |-----|-------|----------------------|
//! | [RFC 2326](https://tools.ietf.org/html/rfc2326) | RTSP 1.0 | Request/response framing, session lifecycle, Transport/Range headers |
//! | [RFC 7826](https://tools.ietf.org/html/rfc7826) | RTSP 2.0 | Server push (`PLAY_NOTIFY`/`REDIRECT`), version negotiation |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Session      — state machine, builders  │
//! ├──────────────────────────────────────────┤
//! │  Correlator   — CSeq-keyed response match│
//! │  Connection   — write + background reader│
//! ├──────────────────────────────────────────┤
//! │  Codec        — framing, parse, serialize│
//! │  Message      — Request/Response/headers │
//! ├──────────────────────────────────────────┤
//! │  Url          — rtsp(s)(u):// parsing    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use rtsp_client::{ClientConfig, RtspUrl, connect};
//!
//! let url = RtspUrl::parse("rtsp://camera.local/stream1").unwrap();
//! let (session, _events) = connect(url, ClientConfig::default()).unwrap();
//!
//! let options = session.options();
//! let response = session.send(options, Some(Duration::from_secs(5))).unwrap();
//! assert!(response.is_success());
//! ```
//!
//! ## Crate layout
//!
//! - [`url`] — [`RtspUrl`] parsing and rendering.
//! - [`message`] — [`message::Request`]/[`message::Response`], header map, `Transport`/`Range`.
//! - [`codec`] — length-delimited framing, parsing, and serialization.
//! - [`connection`] — [`connection::Connection`], [`connection::Connector`]/[`connection::ByteStream`] TLS boundary.
//! - [`correlator`] — CSeq-keyed request/response matching and server-push events.
//! - [`session`] — [`session::Session`] state machine and per-method builders.
//! - [`config`] — [`ClientConfig`].
//! - [`error`] — [`Error`] enum and [`Result`] alias.

pub mod codec;
pub mod config;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod message;
pub mod session;
pub mod url;

pub use config::ClientConfig;
pub use connection::{ByteStream, Connection, Connector, TcpConnector};
pub use correlator::ServerEvent;
pub use error::{Error, Result};
pub use session::{Session, SessionState};
pub use url::RtspUrl;

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Open a connection to `url`'s host/port using `config`'s connector, and
/// return a ready-to-use [`Session`] plus its server-push event channel.
/// `config.request_timeout` becomes the session's default `send` timeout.
pub fn connect(url: RtspUrl, config: ClientConfig) -> Result<(Session, Receiver<ServerEvent>)> {
    let (connection, events) = Connection::connect(&url, config.connector.as_ref())?;
    Ok((
        Session::new(url, config.version, connection, config.request_timeout),
        events,
    ))
}

/// Wrap an already-open [`Connection`] in a new [`Session`] against `url`,
/// for callers managing connection lifetime themselves (e.g. sharing one
/// connection across multiple [`Session`]s via `SETUP`'s aggregate-control
/// semantics). `default_request_timeout` is used by `Session::send`
/// whenever a caller passes `None`.
pub fn session(
    url: RtspUrl,
    version: message::Version,
    connection: Arc<Connection>,
    default_request_timeout: Duration,
) -> Session {
    Session::new(url, version, connection, default_request_timeout)
}
