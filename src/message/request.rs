//! RTSP request model (RFC 2326 §6).
//!
//! This side both builds requests for serialization and — for RTSP/2.0
//! server push (`PLAY_NOTIFY`/`REDIRECT`) — parses them back off the wire.

use crate::message::{HeaderMap, Method, Version};

/// A request, either outbound (built by [`crate::session::Session`]) or
/// inbound (a server-pushed `PLAY_NOTIFY`/`REDIRECT`).
///
/// Invariant: if `body` is present, the caller is responsible for
/// `Content-Length` matching its length —
/// [`crate::codec::serialize_request`] enforces this automatically
/// rather than trusting a caller-set header.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>, version: Version) -> Self {
        Request {
            method,
            uri: uri.into(),
            version,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// The `CSeq` this request was assigned, if the header has been set.
    /// Every request is required to carry one before it is written;
    /// builders set it immediately on construction.
    pub fn cseq(&self) -> Option<u32> {
        self.headers.get("CSeq")?.parse().ok()
    }
}
