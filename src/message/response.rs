//! RTSP response model (RFC 2326 §7).
//!
//! A plain data holder the codec fills in from parsed bytes, with
//! read-only accessors the session and correlator need.

use crate::message::HeaderMap;
use crate::message::Version;

/// A parsed response.
///
/// Invariants enforced by [`crate::codec::parse`] before one of these is
/// ever constructed: `status` is in `100..=599`; if `Content-Length` was
/// present, `body` is exactly that many bytes.
#[derive(Debug, Clone)]
pub struct Response {
    pub version: Version,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `CSeq` header, required to correlate a response to its request.
    /// `None` means the server sent a frame the correlator cannot match
    /// to anything.
    pub fn cseq(&self) -> Option<u32> {
        self.headers.get("CSeq")?.parse().ok()
    }

    /// The session id portion of a `Session: <id>[;timeout=<secs>]` header,
    /// with the optional `;timeout=` suffix stripped.
    pub fn session_id(&self) -> Option<&str> {
        self.headers
            .get("Session")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// The session timeout in seconds, from `Session: <id>;timeout=<secs>`,
    /// falling back to the RFC 2326 §12.37 default of 60 when absent.
    pub fn session_timeout_secs(&self) -> u64 {
        self.headers
            .get("Session")
            .and_then(|v| v.split(';').nth(1))
            .and_then(|t| t.trim().strip_prefix("timeout="))
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(60)
    }

    /// Parse the `Public` header's comma-separated method list. Tokens
    /// that aren't a method this crate recognizes are kept as
    /// [`crate::message::Method::Unknown`].
    pub fn public_methods(&self) -> Vec<crate::message::Method> {
        self.headers
            .get("Public")
            .map(|v| {
                v.split(',')
                    .map(|tok| crate::message::Method::parse(tok.trim()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HeaderMap;

    fn resp(status: u16, headers: &[(&str, &str)]) -> Response {
        let mut h = HeaderMap::new();
        for (k, v) in headers {
            h.set(k, *v);
        }
        Response {
            version: Version::V1_0,
            status,
            reason: "OK".to_string(),
            headers: h,
            body: None,
        }
    }

    #[test]
    fn is_success_covers_2xx_only() {
        assert!(resp(200, &[]).is_success());
        assert!(resp(299, &[]).is_success());
        assert!(!resp(300, &[]).is_success());
        assert!(!resp(404, &[]).is_success());
    }

    #[test]
    fn session_id_strips_timeout_suffix() {
        let r = resp(200, &[("Session", "f8f3d1a2;timeout=60")]);
        assert_eq!(r.session_id(), Some("f8f3d1a2"));
        assert_eq!(r.session_timeout_secs(), 60);
    }

    #[test]
    fn session_timeout_defaults_to_60() {
        let r = resp(200, &[("Session", "abc")]);
        assert_eq!(r.session_timeout_secs(), 60);
    }

    #[test]
    fn public_methods_parsed_from_csv() {
        let r = resp(
            200,
            &[("Public", "OPTIONS, DESCRIBE, SETUP, PLAY, PAUSE, TEARDOWN")],
        );
        let methods = r.public_methods();
        assert_eq!(methods.len(), 6);
        assert!(methods.contains(&crate::message::Method::Play));
    }
}
