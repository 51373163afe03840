//! Client configuration.
//!
//! A plain, cloneable struct with a `Default` impl, no file or
//! environment layer. It configures connection-level policy that is not
//! already carried in the target URL — protocol version preference,
//! request timeout, and the [`Connector`] used to open the byte-stream.

use std::sync::Arc;
use std::time::Duration;

use crate::connection::{Connector, TcpConnector};
use crate::message::Version;

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`crate::session::Session`].
#[derive(Clone)]
pub struct ClientConfig {
    /// RTSP version to send on every request. Servers that only speak
    /// RTSP/1.0 ignore the distinction; this core does not attempt
    /// version negotiation on the caller's behalf.
    pub version: Version,
    /// Default for how long [`crate::session::Session::send`] waits for a
    /// response before returning [`crate::error::Error::Timeout`], used
    /// whenever a caller passes `None` for a call's own timeout.
    pub request_timeout: Duration,
    /// Opens the byte-stream for a connection. Swap this to hand in a
    /// TLS-wrapped stream for `rtsps://` targets.
    pub connector: Arc<dyn Connector>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            version: Version::V1_0,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connector: Arc::new(TcpConnector),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("version", &self.version)
            .field("request_timeout", &self.request_timeout)
            .field("connector", &"<dyn Connector>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_rtsp_1_0_and_plain_tcp() {
        let config = ClientConfig::default();
        assert_eq!(config.version, Version::V1_0);
        assert_eq!(config.connector.kind(), crate::connection::ConnectorKind::PlainTcp);
    }
}
