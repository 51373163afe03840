//! Wire codec: serialize requests, frame and parse responses (and, for
//! RTSP/2.0, server-pushed requests) out of a streaming byte buffer.
//!
//! A persistent connection can deliver arbitrarily-split and
//! arbitrarily-concatenated byte chunks, so parsing here is a pure
//! function over a byte slice that reports how much it consumed, callable
//! again and again as more bytes arrive — the length-delimited framing is
//! the non-trivial part.

use crate::error::{Error, Result};
use crate::message::{HeaderMap, Method, ParsedMessage, Request, Response, Version};

/// Result of attempting to frame one message out of a buffer.
#[derive(Debug)]
pub enum ParseOutcome {
    /// A complete message was framed; `consumed` bytes should be dropped
    /// from the front of the buffer before parsing again.
    Complete {
        message: ParsedMessage,
        consumed: usize,
    },
    /// Not enough bytes buffered yet for even the header block, or for a
    /// `Content-Length`-declared body.
    NeedMore,
    /// The frame's boundaries are known (`consumed` bytes can be dropped
    /// and parsing can continue) but its content didn't parse. `consumed
    /// == None` means the header block itself could not be decoded as
    /// UTF-8 — the frame boundary can't be trusted, so the caller cannot
    /// resynchronize and the connection is not recoverable.
    Invalid { error: Error, consumed: Option<usize> },
}

/// Scan for the first occurrence of the four-byte header/body separator.
fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Attempt to frame and parse a single message from the front of `buf`.
pub fn parse(buf: &[u8]) -> ParseOutcome {
    let header_end = match find_header_terminator(buf) {
        Some(idx) => idx,
        None => return ParseOutcome::NeedMore,
    };

    let header_block = match std::str::from_utf8(&buf[..header_end]) {
        Ok(s) => s,
        Err(e) => {
            return ParseOutcome::Invalid {
                error: Error::MalformedHeaders(e.to_string()),
                consumed: None,
            };
        }
    };

    let mut lines = header_block.split("\r\n");
    let first_line = lines.next().unwrap_or("");

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        match line.find(':') {
            Some(idx) => {
                let name = line[..idx].trim();
                let value = line[idx + 1..].trim();
                headers.insert_first_wins(name, value.to_string());
            }
            None => {
                tracing::warn!(line, "skipping header line without a ':' separator");
            }
        }
    }

    let content_length = headers
        .get("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    if buf.len() < body_start + content_length {
        return ParseOutcome::NeedMore;
    }

    let body = if content_length > 0 {
        Some(buf[body_start..body_start + content_length].to_vec())
    } else {
        None
    };
    let consumed = body_start + content_length;

    if first_line.starts_with("RTSP/") {
        match parse_status_line(first_line) {
            Ok((version, status, reason)) => ParseOutcome::Complete {
                message: ParsedMessage::Response(Response {
                    version,
                    status,
                    reason,
                    headers,
                    body,
                }),
                consumed,
            },
            Err(error) => ParseOutcome::Invalid {
                error,
                consumed: Some(consumed),
            },
        }
    } else {
        match parse_request_line(first_line) {
            Ok((method, uri, version)) => ParseOutcome::Complete {
                message: ParsedMessage::Request(Request {
                    method,
                    uri,
                    version,
                    headers,
                    body,
                }),
                consumed,
            },
            Err(error) => ParseOutcome::Invalid {
                error,
                consumed: Some(consumed),
            },
        }
    }
}

fn parse_status_line(line: &str) -> Result<(Version, u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version_tok = parts.next().ok_or(Error::MalformedStatusLine)?;
    let status_tok = parts.next().ok_or(Error::MalformedStatusLine)?;
    let reason = parts.next().unwrap_or("").to_string();

    let version = Version::parse(version_tok)?;

    if status_tok.len() != 3 || !status_tok.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedStatusLine);
    }
    let status: u16 = status_tok.parse().map_err(|_| Error::MalformedStatusLine)?;
    if !(100..=599).contains(&status) {
        return Err(Error::MalformedStatusLine);
    }

    Ok((version, status, reason))
}

fn parse_request_line(line: &str) -> Result<(Method, String, Version)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(Error::MalformedStatusLine);
    }
    let method = Method::parse(parts[0]);
    let uri = parts[1].to_string();
    let version = Version::parse(parts[2])?;
    Ok((method, uri, version))
}

/// Serialize a request to its wire form.
///
/// `CSeq` is always emitted first, and `Content-Length` is computed from
/// the body rather than trusted from whatever the caller set on the
/// header map.
pub fn serialize_request(req: &Request) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(
        format!("{} {} {}\r\n", req.method, req.uri, req.version).as_bytes(),
    );

    if let Some(cseq) = req.headers.get("CSeq") {
        out.extend_from_slice(format!("CSeq: {cseq}\r\n").as_bytes());
    }

    for (name, value) in req.headers.iter() {
        if name.eq_ignore_ascii_case("CSeq") || name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }

    match &req.body {
        Some(body) => {
            out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
            out.extend_from_slice(body);
        }
        None => out.extend_from_slice(b"\r\n"),
    }

    out
}
