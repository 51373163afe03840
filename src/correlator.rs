//! Request/response correlator: assigns CSeqs, matches inbound responses
//! back to the caller that sent the request that earned them.
//!
//! A persistent client connection can have several requests in flight at
//! once, so matching can't rely on call-stack order the way a
//! request-at-a-time handler could. This registry is a
//! `parking_lot::Mutex`-guarded `HashMap` behind a small, clonable
//! handle, with `tracing` at every mutation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::message::{Request, Response};

/// An event the correlator (or connection) has nowhere else to deliver:
/// a response whose CSeq matches no pending request, or a server-pushed
/// request (`PLAY_NOTIFY`/`REDIRECT`, RTSP/2.0 only). Handling policy is
/// the caller's.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    UnsolicitedResponse(Response),
    ServerRequest(Request),
}

/// Assigns monotonically increasing CSeqs and routes responses back to
/// whichever caller registered that CSeq.
///
/// Pipelining is fully supported: `dispatch` matches purely by CSeq, so
/// responses may arrive in any order relative to the order requests were
/// sent.
pub struct Correlator {
    next_cseq: AtomicU32,
    pending: Mutex<HashMap<u32, SyncSender<Result<Response>>>>,
    events: SyncSender<ServerEvent>,
}

impl Correlator {
    /// Returns the new correlator alongside the receiving end of its
    /// out-of-band event channel.
    pub fn new() -> (Arc<Self>, Receiver<ServerEvent>) {
        let (events, events_rx) = mpsc::sync_channel(64);
        let correlator = Arc::new(Correlator {
            next_cseq: AtomicU32::new(1),
            pending: Mutex::new(HashMap::new()),
            events,
        });
        (correlator, events_rx)
    }

    /// Returns the next CSeq. CSeqs are strictly increasing and contiguous
    /// starting at 1.
    pub fn next_cseq(&self) -> u32 {
        self.next_cseq.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a pending slot for `cseq`, returning the receiving half a
    /// caller blocks on. Fails with [`Error::CSeqCollision`] if a slot for
    /// this CSeq is already registered.
    pub fn register(&self, cseq: u32) -> Result<Receiver<Result<Response>>> {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut pending = self.pending.lock();
        if pending.contains_key(&cseq) {
            return Err(Error::CSeqCollision(cseq));
        }
        pending.insert(cseq, tx);
        tracing::trace!(cseq, "registered pending request");
        Ok(rx)
    }

    /// Remove a pending slot without fulfilling it — used when a caller's
    /// timeout elapses before a response showed up. A response with this
    /// CSeq arriving afterward is delivered as
    /// [`ServerEvent::UnsolicitedResponse`] instead.
    pub fn cancel(&self, cseq: u32) {
        if self.pending.lock().remove(&cseq).is_some() {
            tracing::debug!(cseq, "cancelled pending request slot");
        }
    }

    /// Route a parsed response to its waiter by CSeq, or to the event
    /// channel if nothing is waiting for it.
    pub fn dispatch(&self, response: Response) {
        let Some(cseq) = response.cseq() else {
            tracing::warn!("response without a CSeq header, surfacing as unsolicited");
            self.emit(ServerEvent::UnsolicitedResponse(response));
            return;
        };

        let slot = self.pending.lock().remove(&cseq);
        match slot {
            Some(tx) => {
                tracing::trace!(cseq, status = response.status, "dispatched response");
                let _ = tx.send(Ok(response));
            }
            None => {
                tracing::debug!(cseq, "no pending request for this CSeq, surfacing as unsolicited");
                self.emit(ServerEvent::UnsolicitedResponse(response));
            }
        }
    }

    /// Route a server-pushed request (`PLAY_NOTIFY`/`REDIRECT`) straight
    /// to the event channel — these never correlate to anything this
    /// client sent.
    pub fn dispatch_server_request(&self, request: Request) {
        self.emit(ServerEvent::ServerRequest(request));
    }

    /// Fail every pending request with `error` and clear the map. Called
    /// on disconnect.
    pub fn cancel_all(&self, error: Error) {
        let mut pending = self.pending.lock();
        let count = pending.len();
        if count > 0 {
            tracing::info!(count, "cancelling all pending requests");
        }
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(clone_error(&error)));
        }
    }

    fn emit(&self, event: ServerEvent) {
        if self.events.try_send(event).is_err() {
            tracing::warn!("server event channel full or closed, dropping event");
        }
    }
}

/// [`Error`] doesn't implement `Clone` (it wraps `std::io::Error`), but
/// every caller failed by [`Correlator::cancel_all`] needs its own copy of
/// essentially the same error. Re-derive a fresh value with the same
/// meaning instead of deriving `Clone` on the whole enum for this one
/// call site.
fn clone_error(error: &Error) -> Error {
    match error {
        Error::ConnectionClosed => Error::ConnectionClosed,
        Error::Timeout => Error::Timeout,
        Error::TransportFailure(e) => {
            Error::TransportFailure(std::io::Error::new(e.kind(), e.to_string()))
        }
        other => {
            tracing::debug!(%other, "collapsing to ConnectionClosed for a cancelled waiter");
            Error::ConnectionClosed
        }
    }
}

/// Wait for a response with an optional timeout. Separated from
/// [`Correlator::register`] so callers (the session) can write the
/// request to the wire *between* registering and waiting, closing the
/// race where a response beats the caller to the wait call.
pub fn wait(rx: &Receiver<Result<Response>>, timeout: Option<Duration>) -> Result<Response> {
    match timeout {
        Some(d) => rx
            .recv_timeout(d)
            .map_err(|_| Error::Timeout)
            .and_then(|r| r),
        None => rx.recv().map_err(|_| Error::ConnectionClosed).and_then(|r| r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HeaderMap, Version};

    fn response_with_cseq(cseq: u32, status: u16) -> Response {
        let mut headers = HeaderMap::new();
        headers.set("CSeq", cseq.to_string());
        Response {
            version: Version::V1_0,
            status,
            reason: "OK".to_string(),
            headers,
            body: None,
        }
    }

    #[test]
    fn cseqs_are_contiguous_and_increasing() {
        let (correlator, _events) = Correlator::new();
        assert_eq!(correlator.next_cseq(), 1);
        assert_eq!(correlator.next_cseq(), 2);
        assert_eq!(correlator.next_cseq(), 3);
    }

    #[test]
    fn dispatch_delivers_to_registered_waiter() {
        let (correlator, _events) = Correlator::new();
        let cseq = correlator.next_cseq();
        let rx = correlator.register(cseq).unwrap();
        correlator.dispatch(response_with_cseq(cseq, 200));
        let resp = wait(&rx, None).unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn pipelined_out_of_order_delivery_matches_by_cseq() {
        let (correlator, _events) = Correlator::new();
        let cseq_a = correlator.next_cseq();
        let cseq_b = correlator.next_cseq();
        let rx_a = correlator.register(cseq_a).unwrap();
        let rx_b = correlator.register(cseq_b).unwrap();

        // Server replies to B before A.
        correlator.dispatch(response_with_cseq(cseq_b, 200));
        correlator.dispatch(response_with_cseq(cseq_a, 200));

        assert_eq!(wait(&rx_a, None).unwrap().cseq(), Some(cseq_a));
        assert_eq!(wait(&rx_b, None).unwrap().cseq(), Some(cseq_b));
    }

    #[test]
    fn unmatched_cseq_becomes_unsolicited_event() {
        let (correlator, events) = Correlator::new();
        correlator.dispatch(response_with_cseq(999, 200));
        match events.recv().unwrap() {
            ServerEvent::UnsolicitedResponse(r) => assert_eq!(r.cseq(), Some(999)),
            _ => panic!("expected an unsolicited response event"),
        }
    }

    #[test]
    fn cancel_all_fails_every_waiter() {
        let (correlator, _events) = Correlator::new();
        let cseq = correlator.next_cseq();
        let rx = correlator.register(cseq).unwrap();
        correlator.cancel_all(Error::ConnectionClosed);
        assert!(matches!(wait(&rx, None), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn duplicate_register_is_a_collision() {
        let (correlator, _events) = Correlator::new();
        let _rx = correlator.register(5).unwrap();
        assert!(matches!(correlator.register(5), Err(Error::CSeqCollision(5))));
    }

    #[test]
    fn cancelled_slot_response_becomes_unsolicited() {
        let (correlator, events) = Correlator::new();
        let cseq = correlator.next_cseq();
        let _rx = correlator.register(cseq).unwrap();
        correlator.cancel(cseq);
        correlator.dispatch(response_with_cseq(cseq, 200));
        match events.recv().unwrap() {
            ServerEvent::UnsolicitedResponse(r) => assert_eq!(r.cseq(), Some(cseq)),
            _ => panic!("expected an unsolicited response event"),
        }
    }
}
