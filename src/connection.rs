//! Owns the byte-stream: feeds inbound bytes through the codec and
//! dispatches framed messages to the [`Correlator`], and serializes
//! outbound requests onto the wire.
//!
//! A stream is split into an owned write half and a `try_clone`d read half
//! handed to a background thread that frames and dispatches inbound bytes
//! while the caller's thread writes requests. The split is behind
//! [`ByteStream`]/[`Connector`] so an `rtsps://` caller can hand in an
//! already-TLS-wrapped stream without the core knowing anything about TLS.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::codec::{self, ParseOutcome};
use crate::correlator::{Correlator, ServerEvent};
use crate::error::{Error, Result};
use crate::message::{ParsedMessage, Request};
use crate::url::{RtspUrl, Scheme};

/// A duplex byte-stream the core can read from and write to, plus the two
/// operations it needs beyond plain `Read + Write`: splitting off an
/// independent read half, and a best-effort shutdown that wakes a reader
/// thread blocked in `read`.
pub trait ByteStream: Read + Write + Send + 'static {
    fn try_clone_stream(&self) -> std::io::Result<Box<dyn ByteStream>>;
    fn shutdown(&self) -> std::io::Result<()>;
}

impl ByteStream for TcpStream {
    fn try_clone_stream(&self) -> std::io::Result<Box<dyn ByteStream>> {
        Ok(Box::new(self.try_clone()?))
    }

    fn shutdown(&self) -> std::io::Result<()> {
        TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

/// Establishes the byte-stream for a URL's host/port. Implement this to
/// hand the core an already-negotiated TLS stream for `rtsps://` — the
/// core has no TLS configuration of its own.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ByteStream>>;

    /// Identifies plain, unencrypted TCP connectors so [`Connection::connect`]
    /// can refuse to pair one with an `rtsps://` URL. TLS-backed connectors
    /// never need to override this.
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Other
    }
}

/// Plain TCP connector, sufficient for `rtsp://` and (as a byte-stream
/// stand-in; the data plane itself is out of scope here) `rtspu://`.
#[derive(Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ByteStream>> {
        let stream = TcpStream::connect((host, port)).map_err(Error::TransportFailure)?;
        stream.set_nodelay(true).ok();
        Ok(Box::new(stream))
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::PlainTcp
    }
}

/// An owned connection to an RTSP server: one write-serialized byte-stream
/// plus a background thread framing inbound bytes through the codec.
pub struct Connection {
    writer: Mutex<Box<dyn ByteStream>>,
    correlator: Arc<Correlator>,
    running: Arc<AtomicBool>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    peer: String,
}

impl Connection {
    /// Open a connection to `url`'s host/port via `connector`. `rtsps://`
    /// callers are expected to pass a `Connector` that returns an
    /// already-TLS-wrapped stream — `rtsps://` with [`TcpConnector`] opens
    /// a plaintext socket, which is almost certainly not what's wanted, so
    /// it is rejected rather than silently downgrading security.
    pub fn connect(
        url: &RtspUrl,
        connector: &dyn Connector,
    ) -> Result<(Arc<Self>, Receiver<ServerEvent>)> {
        if url.scheme() == Scheme::Rtsps && connector.kind() == ConnectorKind::PlainTcp {
            return Err(Error::TransportFailure(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "rtsps:// requires a TLS-aware Connector, not TcpConnector",
            )));
        }

        let stream = connector.connect(url.host(), url.port())?;
        let reader_stream = stream.try_clone_stream().map_err(Error::TransportFailure)?;

        let (correlator, events_rx) = Correlator::new();
        let running = Arc::new(AtomicBool::new(true));
        let peer = format!("{}:{}", url.host(), url.port());

        let conn = Arc::new(Connection {
            writer: Mutex::new(stream),
            correlator: correlator.clone(),
            running: running.clone(),
            reader_handle: Mutex::new(None),
            peer: peer.clone(),
        });

        let loop_correlator = correlator;
        let loop_running = running;
        let handle = thread::spawn(move || {
            read_loop(reader_stream, &loop_correlator, &loop_running);
        });
        *conn.reader_handle.lock() = Some(handle);

        tracing::info!(peer, "connected");
        Ok((conn, events_rx))
    }

    /// Wrap an already-open stream directly — the path `Session` tests and
    /// embedders with their own connection management use, skipping the
    /// `Connector`/scheme check.
    pub fn from_stream(stream: Box<dyn ByteStream>, peer: impl Into<String>) -> Result<(Arc<Self>, Receiver<ServerEvent>)> {
        let reader_stream = stream.try_clone_stream().map_err(Error::TransportFailure)?;
        let (correlator, events_rx) = Correlator::new();
        let running = Arc::new(AtomicBool::new(true));
        let peer = peer.into();

        let conn = Arc::new(Connection {
            writer: Mutex::new(stream),
            correlator: correlator.clone(),
            running: running.clone(),
            reader_handle: Mutex::new(None),
            peer: peer.clone(),
        });

        let loop_correlator = correlator;
        let loop_running = running;
        let handle = thread::spawn(move || {
            read_loop(reader_stream, &loop_correlator, &loop_running);
        });
        *conn.reader_handle.lock() = Some(handle);

        tracing::info!(peer, "connected");
        Ok((conn, events_rx))
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    /// Serialize and write a request. The write side is mutex-guarded so
    /// pipelined requests from multiple callers never interleave on the
    /// wire.
    pub fn write_request(&self, request: &Request) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        let bytes = codec::serialize_request(request);
        let mut writer = self.writer.lock();
        writer.write_all(&bytes).map_err(Error::TransportFailure)?;
        tracing::debug!(
            peer = self.peer,
            method = %request.method,
            cseq = request.cseq(),
            "request written"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Idempotently tear the connection down: stop the reader loop, fail
    /// every pending request with [`Error::ConnectionClosed`], and shut
    /// down the byte-stream.
    pub fn close(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!(peer = self.peer, "closing connection");
            let _ = self.writer.lock().shutdown();
            self.correlator.cancel_all(Error::ConnectionClosed);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Which kind of byte-stream backs a `Connector`, used only to reject the
/// obviously-wrong `rtsps://` + [`TcpConnector`] combination before
/// opening a plaintext socket by mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    PlainTcp,
    Other,
}

/// Continuously read into an internal buffer, framing zero or more
/// messages per read and dispatching each to the correlator. On EOF or an
/// unrecoverable parse failure, cancels every pending request with
/// [`Error::ConnectionClosed`].
fn read_loop(mut stream: Box<dyn ByteStream>, correlator: &Arc<Correlator>, running: &Arc<AtomicBool>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match stream.read(&mut chunk) {
            Ok(0) => {
                tracing::info!("connection closed by peer");
                break;
            }
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if !drain_frames(&mut buf, correlator, running) {
                    break;
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "read error, closing connection");
                break;
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    correlator.cancel_all(Error::ConnectionClosed);
}

/// Repeatedly call the codec until it returns `NeedMore`, dispatching each
/// complete frame and dropping consumed bytes. Returns `false` if an
/// unrecoverable parse failure means the caller should stop reading.
/// A loop rather than recursion, since a burst of small frames in one
/// read would otherwise grow the call stack unboundedly.
fn drain_frames(buf: &mut Vec<u8>, correlator: &Arc<Correlator>, running: &Arc<AtomicBool>) -> bool {
    loop {
        match codec::parse(buf) {
            ParseOutcome::NeedMore => return true,
            ParseOutcome::Complete { message, consumed } => {
                buf.drain(0..consumed);
                match message {
                    ParsedMessage::Response(r) => correlator.dispatch(r),
                    ParsedMessage::Request(r) => correlator.dispatch_server_request(r),
                }
            }
            ParseOutcome::Invalid {
                error,
                consumed: Some(n),
            } => {
                tracing::warn!(%error, "discarding malformed frame");
                buf.drain(0..n);
            }
            ParseOutcome::Invalid {
                error,
                consumed: None,
            } => {
                tracing::error!(%error, "unrecoverable parse failure, closing connection");
                running.store(false, Ordering::SeqCst);
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    use crate::message::{Method, Version};

    /// Bind a loopback listener, spawn `server` to run against the
    /// accepted side, and return a [`Connection`] for the client side.
    fn connected_pair(server: impl FnOnce(TcpStream) + Send + 'static) -> (Arc<Connection>, Receiver<ServerEvent>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            server(stream);
        });

        let client_stream = TcpStream::connect(addr).unwrap();
        client_stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Connection::from_stream(Box::new(client_stream), addr.to_string()).unwrap()
    }

    #[test]
    fn write_request_then_receive_matched_response() {
        let (conn, _events) = connected_pair(|mut server_stream| {
            let mut buf = [0u8; 1024];
            let n = server_stream.read(&mut buf).unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("OPTIONS"));
            server_stream
                .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n")
                .unwrap();
        });

        let mut req = Request::new(Method::Options, "rtsp://host/", Version::V1_0);
        req.headers.set("CSeq", "1");
        let rx = conn.correlator().register(1).unwrap();
        conn.write_request(&req).unwrap();

        let resp = crate::correlator::wait(&rx, Some(Duration::from_secs(2))).unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn eof_cancels_pending_requests() {
        let (conn, _events) = connected_pair(|server_stream| {
            drop(server_stream);
        });

        let rx = conn.correlator().register(1).unwrap();
        let result = crate::correlator::wait(&rx, Some(Duration::from_secs(2)));
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[test]
    fn close_is_idempotent() {
        let (conn, _events) = connected_pair(|server_stream| {
            drop(server_stream);
        });
        conn.close();
        conn.close();
        assert!(!conn.is_running());
    }
}
