//! End-to-end handshake tests against a scripted loopback TCP server,
//! exercising the client side of the conversation.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use rtsp_client::message::{Method, PortRange, Range, TransportSpec};
use rtsp_client::{ClientConfig, Connection, Error, RtspUrl, Session, SessionState};

/// Bind a loopback listener, hand the accepted stream to `script`, and
/// return a [`Session`] wired up to the client side of that socket.
fn scripted_session(script: impl FnOnce(TcpStream) + Send + 'static) -> Session {
    scripted_session_with_timeout(ClientConfig::default().request_timeout, script)
}

/// Same as [`scripted_session`] but with an explicit default request
/// timeout, for tests that exercise `Session::send`'s fallback to it.
fn scripted_session_with_timeout(
    default_request_timeout: Duration,
    script: impl FnOnce(TcpStream) + Send + 'static,
) -> Session {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        script(stream);
    });

    let client_stream = TcpStream::connect(addr).unwrap();
    client_stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let (connection, _events) =
        Connection::from_stream(Box::new(client_stream), addr.to_string()).unwrap();
    let url = RtspUrl::parse(&format!("rtsp://{addr}/stream")).unwrap();
    let config = ClientConfig::default();
    Session::new(url, config.version, connection, default_request_timeout)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).unwrap();
    String::from_utf8_lossy(&buf[..n]).to_string()
}

#[test]
fn options_handshake_reports_public_methods() {
    let session = scripted_session(|mut stream| {
        let req = read_request(&mut stream);
        assert!(req.starts_with("OPTIONS"));
        assert!(req.contains("CSeq: 1"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nPublic: OPTIONS, DESCRIBE, SETUP, PLAY, PAUSE, TEARDOWN\r\n\r\n")
            .unwrap();
    });

    let response = session
        .send(session.options(), Some(Duration::from_secs(2)))
        .unwrap();
    assert!(response.is_success());
    assert!(response.public_methods().contains(&Method::Play));
}

#[test]
fn setup_establishes_session_id_and_transitions_to_ready() {
    let session = scripted_session(|mut stream| {
        let req = read_request(&mut stream);
        assert!(req.starts_with("SETUP"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nSession: abc123;timeout=60\r\nTransport: RTP/AVP;unicast;client_port=8000-8001;server_port=5000-5001\r\n\r\n")
            .unwrap();
    });

    let track = session.base_uri().with_path("track1");
    let transport = TransportSpec::rtp_avp_unicast(PortRange { low: 8000, high: Some(8001) });
    let response = session
        .send(session.setup(&track, &transport), Some(Duration::from_secs(2)))
        .unwrap();

    assert!(response.is_success());
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.session_id().as_deref(), Some("abc123"));
    assert_eq!(session.timeout_secs(), 60);
}

#[test]
fn play_then_pause_round_trip_and_illegal_play_from_init() {
    let session = scripted_session(|mut stream| {
        // SETUP
        let req = read_request(&mut stream);
        assert!(req.starts_with("SETUP"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nSession: s1\r\n\r\n")
            .unwrap();

        // PLAY
        let req = read_request(&mut stream);
        assert!(req.starts_with("PLAY"));
        assert!(req.contains("Session: s1"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 2\r\nSession: s1\r\nRange: npt=0-\r\n\r\n")
            .unwrap();

        // PAUSE
        let req = read_request(&mut stream);
        assert!(req.starts_with("PAUSE"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 3\r\nSession: s1\r\n\r\n")
            .unwrap();
    });

    // PLAY before SETUP is illegal and must not touch the wire.
    let early_play = session.play(None);
    assert!(matches!(
        session.send(early_play, Some(Duration::from_secs(2))),
        Err(Error::IllegalState { .. })
    ));

    let track = session.base_uri().with_path("track1");
    let transport = TransportSpec::rtp_avp_unicast(PortRange { low: 8000, high: None });
    session
        .send(session.setup(&track, &transport), Some(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    let play_response = session
        .send(session.play(Some(&Range::from_start())), Some(Duration::from_secs(2)))
        .unwrap();
    assert!(play_response.is_success());
    assert_eq!(session.state(), SessionState::Playing);

    session
        .send(session.pause(), Some(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn pipelined_describe_and_options_resolve_out_of_order() {
    let session = std::sync::Arc::new(scripted_session(|mut stream| {
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).unwrap();
        let both = String::from_utf8_lossy(&buf[..n]);
        assert!(both.contains("DESCRIBE"));
        assert!(both.contains("OPTIONS"));

        // Reply to CSeq 2 (OPTIONS) before CSeq 1 (DESCRIBE) — the two
        // calls below must still each get their own matching response.
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 2\r\nPublic: OPTIONS, DESCRIBE\r\n\r\n")
            .unwrap();
        let sdp = b"v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=stream\r\n";
        stream
            .write_all(
                format!(
                    "RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Type: application/sdp\r\nContent-Length: {}\r\n\r\n",
                    sdp.len()
                )
                .as_bytes(),
            )
            .unwrap();
        stream.write_all(sdp).unwrap();
    }));

    let describe_req = session.describe(None);
    let describe_cseq = describe_req.cseq().unwrap();
    let options_req = session.options();
    let options_cseq = options_req.cseq().unwrap();
    assert_eq!(options_cseq, describe_cseq + 1);

    // Fire both requests from separate threads before either response
    // arrives, so the two round trips genuinely overlap on the wire.
    let describe_session = session.clone();
    let describe_handle = thread::spawn(move || {
        describe_session.send(describe_req, Some(Duration::from_secs(2)))
    });
    let options_handle = thread::spawn(move || {
        session.send(options_req, Some(Duration::from_secs(2)))
    });

    let describe_response = describe_handle.join().unwrap().unwrap();
    let options_response = options_handle.join().unwrap().unwrap();
    assert_eq!(describe_response.cseq(), Some(describe_cseq));
    assert_eq!(options_response.cseq(), Some(options_cseq));
    assert!(describe_response.body.is_some());
}

#[test]
fn chunked_response_is_reassembled() {
    let session = scripted_session(|mut stream| {
        let _ = read_request(&mut stream);
        let body = b"v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=s\r\n";
        let head = format!(
            "RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        let mut full = head.into_bytes();
        full.extend_from_slice(body);

        for chunk in full.chunks(7) {
            stream.write_all(chunk).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(5));
        }
    });

    let response = session
        .send(session.describe(None), Some(Duration::from_secs(2)))
        .unwrap();
    assert!(response.is_success());
    assert!(response.body.is_some());
}

#[test]
fn teardown_closes_session_and_further_requests_are_illegal() {
    let session = scripted_session(|mut stream| {
        let req = read_request(&mut stream);
        assert!(req.starts_with("SETUP"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nSession: s1\r\n\r\n")
            .unwrap();
        let req = read_request(&mut stream);
        assert!(req.starts_with("TEARDOWN"));
        stream
            .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 2\r\nSession: s1\r\n\r\n")
            .unwrap();
    });

    let track = session.base_uri().with_path("track1");
    let transport = TransportSpec::rtp_avp_unicast(PortRange { low: 8000, high: None });
    session
        .send(session.setup(&track, &transport), Some(Duration::from_secs(2)))
        .unwrap();

    session
        .send(session.teardown(), Some(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    assert!(matches!(
        session.send(session.options(), Some(Duration::from_secs(2))),
        Err(Error::IllegalState { .. })
    ));
}

#[test]
fn teardown_from_init_is_a_local_no_op() {
    let session = scripted_session(|_stream| {
        // No bytes should ever be read by the server for this test.
    });

    let response = session
        .send(session.teardown(), Some(Duration::from_secs(2)))
        .unwrap();
    assert!(response.is_success());
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn unauthorized_response_carries_the_challenge_header() {
    let session = scripted_session(|mut stream| {
        let req = read_request(&mut stream);
        assert!(req.starts_with("DESCRIBE"));
        stream
            .write_all(b"RTSP/1.0 401 Unauthorized\r\nCSeq: 1\r\nWWW-Authenticate: Basic realm=\"stream\"\r\n\r\n")
            .unwrap();
    });

    let err = session
        .send(session.describe(None), Some(Duration::from_secs(2)))
        .unwrap_err();
    match err {
        Error::ProtocolError(response) => {
            assert_eq!(response.status, 401);
            assert_eq!(
                response.headers.get("WWW-Authenticate"),
                Some("Basic realm=\"stream\"")
            );
        }
        other => panic!("expected ProtocolError, got {other:?}"),
    }
    // A non-2xx response leaves session state untouched.
    assert_eq!(session.state(), SessionState::Init);
}

#[test]
fn send_falls_back_to_configured_default_timeout() {
    let session = scripted_session_with_timeout(Duration::from_millis(50), |mut stream| {
        // Never reply, but keep the connection open so the client's own
        // default timeout — not a connection-closed error — is what fires.
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_secs(1));
    });

    let started = std::time::Instant::now();
    let result = session.send(session.options(), None);
    assert!(matches!(result, Err(Error::Timeout)));
    assert!(started.elapsed() < Duration::from_millis(500));
}
