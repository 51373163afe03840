//! Structured `Transport` header (RFC 2326 §12.39 / RFC 7826 §18.54).
//!
//! The client side originates this header (in `SETUP`) and also has to
//! read back everything the server negotiated in the response, so every
//! recognized option is modeled rather than just the fields a sender
//! would need.

use std::fmt;

/// `lower-transport` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerTransport {
    Udp,
    Tcp,
}

/// `unicast` / `multicast` cast mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    Unicast,
    Multicast,
}

/// A `low[-high]` port or channel range, e.g. `client_port=8000-8001` or
/// `interleaved=0-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub low: u16,
    pub high: Option<u16>,
}

impl PortRange {
    fn parse(s: &str) -> Option<Self> {
        match s.split_once('-') {
            Some((low, high)) => Some(PortRange {
                low: low.parse().ok()?,
                high: Some(high.parse().ok()?),
            }),
            None => Some(PortRange {
                low: s.parse().ok()?,
                high: None,
            }),
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.high {
            Some(h) => write!(f, "{}-{}", self.low, h),
            None => write!(f, "{}", self.low),
        }
    }
}

/// The `Transport` header's recognized options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportSpec {
    /// `transport-protocol`, e.g. `"RTP"`.
    pub protocol: String,
    /// `profile`, e.g. `"AVP"`.
    pub profile: String,
    pub lower_transport: Option<LowerTransport>,
    pub cast: Option<Cast>,
    pub client_port: Option<PortRange>,
    pub server_port: Option<PortRange>,
    pub destination: Option<String>,
    pub source: Option<String>,
    pub ssrc: Option<String>,
    pub mode: Option<String>,
    pub ttl: Option<u8>,
    pub interleaved: Option<PortRange>,
}

impl TransportSpec {
    /// Build the common unicast-UDP spec a client SETUP request sends.
    pub fn rtp_avp_unicast(client_port: PortRange) -> Self {
        TransportSpec {
            protocol: "RTP".to_string(),
            profile: "AVP".to_string(),
            lower_transport: Some(LowerTransport::Udp),
            cast: Some(Cast::Unicast),
            client_port: Some(client_port),
            ..Default::default()
        }
    }

    /// Build an interleaved (RTP-over-TCP) transport spec.
    pub fn rtp_avp_interleaved(channels: PortRange) -> Self {
        TransportSpec {
            protocol: "RTP".to_string(),
            profile: "AVP".to_string(),
            lower_transport: Some(LowerTransport::Tcp),
            interleaved: Some(channels),
            ..Default::default()
        }
    }

    /// Parse a `Transport` header value. Only the first semicolon-delimited
    /// transport spec is parsed if the server offered several (a fallback
    /// list is legal per RFC 2326 §12.39 but RTSP/1.0 servers reply with
    /// exactly one negotiated spec in practice).
    pub fn parse(header: &str) -> Option<Self> {
        let first = header.split(',').next()?;
        let mut parts = first.split(';');
        let head = parts.next()?.trim();
        let mut head_parts = head.split('/');
        let protocol = head_parts.next()?.trim().to_string();
        let profile = head_parts.next().unwrap_or_default().trim().to_string();
        let lower_transport = match head_parts.next().map(|s| s.trim()) {
            Some("TCP") => Some(LowerTransport::Tcp),
            Some("UDP") => Some(LowerTransport::Udp),
            _ => None,
        };

        let mut spec = TransportSpec {
            protocol,
            profile,
            lower_transport,
            ..Default::default()
        };

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((key, value)) => match key.trim() {
                    "client_port" => spec.client_port = PortRange::parse(value),
                    "server_port" => spec.server_port = PortRange::parse(value),
                    "destination" => spec.destination = Some(value.to_string()),
                    "source" => spec.source = Some(value.to_string()),
                    "ssrc" => spec.ssrc = Some(value.to_string()),
                    "mode" => spec.mode = Some(value.trim_matches('"').to_string()),
                    "ttl" => spec.ttl = value.parse().ok(),
                    "interleaved" => spec.interleaved = PortRange::parse(value),
                    _ => {}
                },
                None => match part {
                    "unicast" => spec.cast = Some(Cast::Unicast),
                    "multicast" => spec.cast = Some(Cast::Multicast),
                    _ => {}
                },
            }
        }

        Some(spec)
    }
}

impl fmt::Display for TransportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.profile)?;
        if let Some(lt) = self.lower_transport {
            write!(f, "/{}", if lt == LowerTransport::Tcp { "TCP" } else { "UDP" })?;
        }
        if let Some(cast) = self.cast {
            write!(
                f,
                ";{}",
                if cast == Cast::Unicast {
                    "unicast"
                } else {
                    "multicast"
                }
            )?;
        }
        if let Some(p) = &self.client_port {
            write!(f, ";client_port={p}")?;
        }
        if let Some(p) = &self.server_port {
            write!(f, ";server_port={p}")?;
        }
        if let Some(d) = &self.destination {
            write!(f, ";destination={d}")?;
        }
        if let Some(s) = &self.source {
            write!(f, ";source={s}")?;
        }
        if let Some(s) = &self.ssrc {
            write!(f, ";ssrc={s}")?;
        }
        if let Some(m) = &self.mode {
            write!(f, ";mode=\"{m}\"")?;
        }
        if let Some(ttl) = self.ttl {
            write!(f, ";ttl={ttl}")?;
        }
        if let Some(c) = &self.interleaved {
            write!(f, ";interleaved={c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_unicast_client_port() {
        let t = TransportSpec::parse("RTP/AVP;unicast;client_port=8000-8001").unwrap();
        assert_eq!(t.protocol, "RTP");
        assert_eq!(t.profile, "AVP");
        assert_eq!(t.cast, Some(Cast::Unicast));
        assert_eq!(
            t.client_port,
            Some(PortRange {
                low: 8000,
                high: Some(8001)
            })
        );
    }

    #[test]
    fn parse_server_reply_with_both_ports() {
        let t = TransportSpec::parse(
            "RTP/AVP;unicast;client_port=8000-8001;server_port=5541-5542",
        )
        .unwrap();
        assert_eq!(t.server_port.unwrap().low, 5541);
    }

    #[test]
    fn parse_interleaved_tcp() {
        let t = TransportSpec::parse("RTP/AVP/TCP;interleaved=0-1").unwrap();
        assert_eq!(t.lower_transport, Some(LowerTransport::Tcp));
        assert_eq!(t.interleaved.unwrap().high, Some(1));
    }

    #[test]
    fn round_trip_is_semantically_equivalent() {
        let original = "RTP/AVP;unicast;client_port=8000-8001;server_port=5541-5542";
        let parsed = TransportSpec::parse(original).unwrap();
        let rendered = parsed.to_string();
        assert_eq!(TransportSpec::parse(&rendered).unwrap(), parsed);
    }

    #[test]
    fn multicast_destination_and_ttl() {
        let t = TransportSpec::parse("RTP/AVP;multicast;destination=224.2.0.1;ttl=16").unwrap();
        assert_eq!(t.cast, Some(Cast::Multicast));
        assert_eq!(t.destination.as_deref(), Some("224.2.0.1"));
        assert_eq!(t.ttl, Some(16));
    }
}
