use std::fmt;

use crate::error::{Error, Result};

/// RTSP protocol version this core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1_0,
    V2_0,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "RTSP/1.0",
            Self::V2_0 => "RTSP/2.0",
        }
    }

    /// Parse the `RTSP/<major>.<minor>` token from a status or request
    /// line. Any unrecognized minor/major pair is a malformed status line
    /// rather than a silently-accepted version — the wire format this
    /// core speaks is exactly 1.0 and 2.0.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "RTSP/1.0" => Ok(Self::V1_0),
            "RTSP/2.0" => Ok(Self::V2_0),
            _ => Err(Error::MalformedStatusLine),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
