use std::fmt;

/// RTSP method (RFC 2326 §6.1 / RFC 7826 §13).
///
/// `PlayNotify` is an RTSP/2.0-only server-to-client request (RFC 7826
/// §13.5). `Unknown` is a sentinel for methods the codec parses but this
/// crate does not otherwise model — the caller still gets the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Describe,
    Setup,
    Play,
    Pause,
    Record,
    Teardown,
    GetParameter,
    SetParameter,
    Redirect,
    Announce,
    PlayNotify,
    Unknown(String),
}

impl Method {
    /// Canonical wire token for this method (RFC 2326 §6.1).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Options => "OPTIONS",
            Self::Describe => "DESCRIBE",
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Record => "RECORD",
            Self::Teardown => "TEARDOWN",
            Self::GetParameter => "GET_PARAMETER",
            Self::SetParameter => "SET_PARAMETER",
            Self::Redirect => "REDIRECT",
            Self::Announce => "ANNOUNCE",
            Self::PlayNotify => "PLAY_NOTIFY",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parse a wire method token. Unrecognized tokens become
    /// [`Method::Unknown`] rather than an error — the codec's job is to
    /// frame messages, not to validate method legality (that is the
    /// session's job).
    pub fn parse(token: &str) -> Self {
        match token {
            "OPTIONS" => Self::Options,
            "DESCRIBE" => Self::Describe,
            "SETUP" => Self::Setup,
            "PLAY" => Self::Play,
            "PAUSE" => Self::Pause,
            "RECORD" => Self::Record,
            "TEARDOWN" => Self::Teardown,
            "GET_PARAMETER" => Self::GetParameter,
            "SET_PARAMETER" => Self::SetParameter,
            "REDIRECT" => Self::Redirect,
            "ANNOUNCE" => Self::Announce,
            "PLAY_NOTIFY" => Self::PlayNotify,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
