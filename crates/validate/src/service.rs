//! Worker-thread wrapper around [`validate`](crate::validate).
//!
//! The worker owns no shared state: requests and replies travel over
//! channels, and every reply carries its request's sequence number. The
//! handle hands out monotonically increasing sequence numbers and
//! discards replies that are not for the latest submitted text, so a
//! slow validation of stale text can never overwrite a newer result.
//! There is no in-flight cancellation; supersession is entirely the
//! sequence-number discipline.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::Diagnostic;

struct Request {
    seq: u64,
    text: String,
}

struct Reply {
    seq: u64,
    diagnostics: Vec<Diagnostic>,
}

/// Caller-side handle to the validation worker.
///
/// Dropping the handle closes the request channel; the worker drains it
/// and exits.
pub struct ValidationService {
    requests: Option<Sender<Request>>,
    replies: Receiver<Reply>,
    latest: u64,
    worker: Option<JoinHandle<()>>,
}

impl ValidationService {
    pub fn new() -> Self {
        let (request_tx, request_rx) = unbounded::<Request>();
        let (reply_tx, reply_rx) = unbounded::<Reply>();
        let worker = thread::spawn(move || {
            for request in request_rx.iter() {
                let diagnostics = crate::validate(&request.text);
                if reply_tx
                    .send(Reply {
                        seq: request.seq,
                        diagnostics,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });
        ValidationService {
            requests: Some(request_tx),
            replies: reply_rx,
            latest: 0,
            worker: Some(worker),
        }
    }

    /// Queue a validation of `text` and return its sequence number.
    /// Every call supersedes all earlier ones.
    pub fn submit(&mut self, text: &str) -> u64 {
        self.latest += 1;
        if let Some(requests) = &self.requests {
            // A send failure means the worker is gone; the caller then
            // simply never receives a reply for this sequence number.
            let _ = requests.send(Request {
                seq: self.latest,
                text: text.to_owned(),
            });
        }
        self.latest
    }

    /// Drain available replies without blocking, keeping only the one
    /// for the latest submitted sequence number.
    pub fn try_latest(&mut self) -> Option<(u64, Vec<Diagnostic>)> {
        let mut newest = None;
        while let Ok(reply) = self.replies.try_recv() {
            if reply.seq == self.latest {
                newest = Some((reply.seq, reply.diagnostics));
            }
        }
        newest
    }

    /// Block until the reply for the latest submitted sequence number
    /// arrives, discarding stale replies along the way. `None` when the
    /// worker has exited.
    pub fn recv_latest(&mut self) -> Option<(u64, Vec<Diagnostic>)> {
        loop {
            match self.replies.recv() {
                Ok(reply) if reply.seq == self.latest => {
                    return Some((reply.seq, reply.diagnostics))
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ValidationService {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;

    #[test]
    fn replies_carry_their_request_sequence() {
        let mut service = ValidationService::new();
        let seq = service.submit("Scenario: S\n  When age >= 18\n  Then x = true\n");
        let (reply_seq, diagnostics) = service.recv_latest().expect("reply");
        assert_eq!(reply_seq, seq);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn stale_replies_are_discarded() {
        let mut service = ValidationService::new();
        // Stale text has an error; the latest text is clean. Whatever
        // order the worker finishes in, only the latest reply surfaces.
        service.submit("Scenario: S\n  When age >= 18\n");
        let latest = service.submit("Scenario: S\n  When age >= 18\n  Then x = true\n");
        let (seq, diagnostics) = service.recv_latest().expect("reply");
        assert_eq!(seq, latest);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn findings_flow_through_the_worker() {
        let mut service = ValidationService::new();
        service.submit("Scenario: S\n  When age >= 18\n");
        let (_, diagnostics) = service.recv_latest().expect("reply");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }
}
