//! RTSP message model (RFC 2326 §4/§6/§7, RFC 7826 §13).
//!
//! Typed representations of requests, responses, case-insensitive headers,
//! and the structured `Transport`/`Range` header variants. This module
//! holds data only — framing and serialization live in [`crate::codec`].

pub mod headers;
pub mod method;
pub mod range;
pub mod request;
pub mod response;
pub mod transport_header;
pub mod version;

pub use headers::HeaderMap;
pub use method::Method;
pub use range::Range;
pub use request::Request;
pub use response::Response;
pub use transport_header::{Cast, LowerTransport, PortRange, TransportSpec};
pub use version::Version;

/// Either side of a single parsed frame: a response to one of our own
/// requests, or a server-initiated request (`PLAY_NOTIFY`/`REDIRECT`,
/// RTSP/2.0 only).
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Response(Response),
    Request(Request),
}
