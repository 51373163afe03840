//! Error types for the RTSP client core.

use std::fmt;

use crate::message::{Method, Response};
use crate::session::SessionState;

/// Errors that can occur anywhere in the RTSP client core.
///
/// Variants map to the failure taxonomy the core is built against:
///
/// - **URL**: [`InvalidUrl`](Self::InvalidUrl).
/// - **Transport**: [`TransportFailure`](Self::TransportFailure),
///   [`ConnectionClosed`](Self::ConnectionClosed).
/// - **Codec**: [`MalformedStatusLine`](Self::MalformedStatusLine),
///   [`MalformedHeaders`](Self::MalformedHeaders),
///   [`IncompleteMessage`](Self::IncompleteMessage).
/// - **Session**: [`IllegalState`](Self::IllegalState),
///   [`CSeqMismatch`](Self::CSeqMismatch),
///   [`CSeqCollision`](Self::CSeqCollision),
///   [`SessionIdDrift`](Self::SessionIdDrift).
/// - **Request lifecycle**: [`ProtocolError`](Self::ProtocolError),
///   [`Timeout`](Self::Timeout).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A URL failed to parse (RFC 2326 §3.2 / RFC 7826 §20.2.19 grammar).
    #[error("invalid RTSP url: {0}")]
    InvalidUrl(UrlErrorKind),

    /// Underlying I/O or socket error while connecting, reading, or writing.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] std::io::Error),

    /// The connection was closed (by the peer, or locally) while a request
    /// was pending or about to be sent.
    #[error("connection closed")]
    ConnectionClosed,

    /// Codec could not parse the status line of a response.
    #[error("malformed status line")]
    MalformedStatusLine,

    /// The header block was not valid UTF-8, or a header line was malformed
    /// in a way the codec could not resynchronize past.
    #[error("malformed headers: {0}")]
    MalformedHeaders(String),

    /// Internal `NeedMore` surfaced because the stream closed before a
    /// complete message was buffered.
    #[error("incomplete message at connection shutdown")]
    IncompleteMessage,

    /// A caller attempted a method the session state machine forbids from
    /// its current state. No bytes are written.
    #[error("illegal state: cannot send {method:?} from {from:?}")]
    IllegalState { from: SessionState, method: Method },

    /// A pending-request slot already existed for a CSeq about to be
    /// registered. Should not happen in normal use — CSeqs come from a
    /// single monotonic counter — surfaced as a hard error rather than
    /// silently overwriting the existing waiter.
    #[error("CSeq collision: {0} already has a pending request")]
    CSeqCollision(u32),

    /// The response delivered through the correlator carries a different
    /// CSeq than the request it was matched against. The correlator's
    /// CSeq-keyed map makes this unreachable in practice; kept as a named,
    /// checked error rather than an assertion.
    #[error("CSeq mismatch: request had {expected}, response carried {actual}")]
    CSeqMismatch { expected: u32, actual: u32 },

    /// The server responded with a non-2xx status. Session state is left
    /// unchanged; the full response is attached so the caller can inspect
    /// its headers and body — a 401, for instance, carries the challenge
    /// to retry with in `WWW-Authenticate`.
    #[error("protocol error: {} {}", .0.status, .0.reason)]
    ProtocolError(Box<Response>),

    /// No response arrived for a request within its timeout. The
    /// correlator slot has already been removed; a late reply with this
    /// CSeq will surface as an unsolicited event instead.
    #[error("timed out waiting for response")]
    Timeout,

    /// A successful response carried a `Session` header whose id differs
    /// from the session's current id. State is left unchanged.
    #[error("session id drift: expected {expected}, server sent {actual}")]
    SessionIdDrift { expected: String, actual: String },
}

/// Specific kind of URL parse failure.
#[derive(Debug)]
pub enum UrlErrorKind {
    /// Scheme was not one of `rtsp`, `rtsps`, `rtspu`.
    InvalidScheme(String),
    /// Host was empty or otherwise unparseable.
    InvalidHost,
    /// Port segment was present but not decimal.
    InvalidPort(String),
    /// Missing the `scheme://` separator entirely.
    Malformed,
}

impl fmt::Display for UrlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScheme(s) => write!(f, "unsupported scheme '{s}'"),
            Self::InvalidHost => write!(f, "invalid or empty host"),
            Self::InvalidPort(p) => write!(f, "invalid port '{p}'"),
            Self::Malformed => write!(f, "missing '://' separator"),
        }
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
