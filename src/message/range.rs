//! Structured `Range` header (RFC 2326 §12.29).

use std::fmt;

use crate::error::{Error, Result};

/// SMPTE timecode subtype (RFC 2326 §3.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmpteType {
    Smpte30,
    Smpte25,
}

impl SmpteType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Smpte30 => "smpte",
            Self::Smpte25 => "smpte-25",
        }
    }
}

/// A structured `Range` header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Range {
    /// Normal play time, in seconds (RFC 2326 §3.6).
    Npt { start: f64, end: Option<f64> },
    /// SMPTE relative timestamp (RFC 2326 §3.5), `start`/`end` formatted as
    /// `HH:MM:SS[:FF]` strings since frame-rate-aware arithmetic is out of
    /// scope for this core.
    Smpte {
        kind: SmpteType,
        start: String,
        end: Option<String>,
    },
    /// Absolute UTC wall-clock time (RFC 2326 §3.7), `YYYYMMDDTHHMMSSZ`.
    Utc { start: String, end: Option<String> },
}

impl Range {
    /// `npt=0-` — "play from the beginning, open-ended", the common case.
    pub fn from_start() -> Self {
        Range::Npt {
            start: 0.0,
            end: None,
        }
    }

    pub fn parse(header: &str) -> Result<Self> {
        let (unit, value) = header
            .split_once('=')
            .ok_or(Error::MalformedHeaders("range missing '='".to_string()))?;

        match unit {
            "npt" => {
                let (start, end) = split_range(value);
                let start = parse_npt_time(start)?;
                let end = end.map(parse_npt_time).transpose()?;
                Ok(Range::Npt { start, end })
            }
            "smpte" | "smpte-25" => {
                let kind = if unit == "smpte" {
                    SmpteType::Smpte30
                } else {
                    SmpteType::Smpte25
                };
                let (start, end) = split_range(value);
                Ok(Range::Smpte {
                    kind,
                    start: start.to_string(),
                    end: end.map(str::to_string),
                })
            }
            "clock" => {
                let (start, end) = split_range(value);
                Ok(Range::Utc {
                    start: start.to_string(),
                    end: end.map(str::to_string),
                })
            }
            other => Err(Error::MalformedHeaders(format!(
                "unrecognized range unit '{other}'"
            ))),
        }
    }
}

/// Split `start[-end]`, where `start` itself may be empty (open-start
/// ranges are not used by this core but parsed defensively).
fn split_range(value: &str) -> (&str, Option<&str>) {
    match value.split_once('-') {
        Some((start, end)) if !end.is_empty() => (start, Some(end)),
        Some((start, _)) => (start, None),
        None => (value, None),
    }
}

fn parse_npt_time(s: &str) -> Result<f64> {
    if s.is_empty() {
        return Ok(0.0);
    }
    // H:MM:SS(.frac) or plain seconds.
    if let Some((h, rest)) = s.split_once(':') {
        let (m, sec) = rest
            .split_once(':')
            .ok_or(Error::MalformedHeaders(format!("bad npt time '{s}'")))?;
        let hours: f64 = h
            .parse()
            .map_err(|_| Error::MalformedHeaders(format!("bad npt time '{s}'")))?;
        let minutes: f64 = m
            .parse()
            .map_err(|_| Error::MalformedHeaders(format!("bad npt time '{s}'")))?;
        let seconds: f64 = sec
            .parse()
            .map_err(|_| Error::MalformedHeaders(format!("bad npt time '{s}'")))?;
        Ok(hours * 3600.0 + minutes * 60.0 + seconds)
    } else {
        s.parse()
            .map_err(|_| Error::MalformedHeaders(format!("bad npt time '{s}'")))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Npt { start, end } => match end {
                Some(end) => write!(f, "npt={start}-{end}"),
                None => write!(f, "npt={start}-"),
            },
            Range::Smpte { kind, start, end } => match end {
                Some(end) => write!(f, "{}={start}-{end}", kind.as_str()),
                None => write!(f, "{}={start}-", kind.as_str()),
            },
            Range::Utc { start, end } => match end {
                Some(end) => write!(f, "clock={start}-{end}"),
                None => write!(f, "clock={start}-"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_npt_open_ended() {
        let r = Range::parse("npt=0-").unwrap();
        assert_eq!(r, Range::Npt { start: 0.0, end: None });
        assert_eq!(r.to_string(), "npt=0-");
    }

    #[test]
    fn parse_npt_bounded_with_timecode() {
        let r = Range::parse("npt=10.5-25.2").unwrap();
        assert_eq!(
            r,
            Range::Npt {
                start: 10.5,
                end: Some(25.2)
            }
        );
    }

    #[test]
    fn parse_npt_hms_format() {
        let r = Range::parse("npt=00:01:30-").unwrap();
        assert_eq!(r, Range::Npt { start: 90.0, end: None });
    }

    #[test]
    fn parse_smpte() {
        let r = Range::parse("smpte=10:00:00:00-10:00:10:00").unwrap();
        assert!(matches!(r, Range::Smpte { kind: SmpteType::Smpte30, .. }));
        assert_eq!(r.to_string(), "smpte=10:00:00:00-10:00:10:00");
    }

    #[test]
    fn parse_utc_clock() {
        let r = Range::parse("clock=19960213T143205Z-19960213T143505Z").unwrap();
        assert_eq!(
            r.to_string(),
            "clock=19960213T143205Z-19960213T143505Z"
        );
    }

    #[test]
    fn unrecognized_unit_is_error() {
        assert!(Range::parse("furlongs=1-2").is_err());
    }
}
