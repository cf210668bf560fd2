//! Cancel-safe pending request queue
//!
//! A FIFO for requests that cannot be completed inline. A queued request can
//! be cancelled externally at any time; cancellation and normal dequeue race
//! under the queue mutex, and whichever path removes the request from the
//! queue first owns its completion. The loser observes the request already
//! gone and does nothing, so a request completes exactly once.
//!
//! The read/write fast path completes requests from transfer continuations
//! instead of parking them here; the queue is kept as a general-purpose
//! primitive for anything that must wait.

use crate::request::{IoRequest, RequestId};
use common::Error;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// FIFO of pending requests with cancellation integration
#[derive(Debug, Default)]
pub struct PendingQueue {
    inner: Mutex<VecDeque<IoRequest>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        PendingQueue::default()
    }

    /// Append a request to the tail
    pub fn insert(&self, request: IoRequest) {
        let mut queue = self.inner.lock().unwrap();
        queue.push_back(request);
    }

    /// Remove a request if it is still queued. Safe to call when the request
    /// already left the queue via the other path.
    pub fn remove_if_present(&self, id: RequestId) -> Option<IoRequest> {
        let mut queue = self.inner.lock().unwrap();
        let position = queue.iter().position(|r| r.id() == id)?;
        queue.remove(position)
    }

    /// The id following `after`, or the head when `after` is `None`, without
    /// removing anything
    pub fn peek_next(&self, after: Option<RequestId>) -> Option<RequestId> {
        let queue = self.inner.lock().unwrap();
        match after {
            None => queue.front().map(|r| r.id()),
            Some(id) => {
                let position = queue.iter().position(|r| r.id() == id)?;
                queue.get(position + 1).map(|r| r.id())
            }
        }
    }

    /// Pop the head of the queue for normal servicing
    pub fn take_next(&self) -> Option<IoRequest> {
        let mut queue = self.inner.lock().unwrap();
        queue.pop_front()
    }

    /// Cancel one queued request: remove it and complete it with a cancelled
    /// status and zero bytes. Returns false if it already left the queue.
    pub fn cancel(&self, id: RequestId) -> bool {
        match self.remove_if_present(id) {
            Some(request) => {
                debug!("Cancelling queued request {:?}", id);
                request.complete(Err(Error::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Cancel everything still queued. Used during device teardown.
    pub fn cancel_all(&self) {
        let drained: Vec<IoRequest> = {
            let mut queue = self.inner.lock().unwrap();
            queue.drain(..).collect()
        };
        for request in drained {
            request.complete(Err(Error::Cancelled));
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Operation;
    use std::sync::Arc;

    fn read_request(len: usize) -> (IoRequest, tokio::sync::oneshot::Receiver<crate::request::IoResult>) {
        IoRequest::new(Operation::Read { length: len })
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = PendingQueue::new();
        let (a, _rx_a) = read_request(1);
        let (b, _rx_b) = read_request(2);
        let (id_a, id_b) = (a.id(), b.id());
        queue.insert(a);
        queue.insert(b);

        assert_eq!(queue.peek_next(None), Some(id_a));
        assert_eq!(queue.peek_next(Some(id_a)), Some(id_b));
        assert_eq!(queue.peek_next(Some(id_b)), None);

        assert_eq!(queue.take_next().map(|r| r.id()), Some(id_a));
        assert_eq!(queue.take_next().map(|r| r.id()), Some(id_b));
    }

    #[tokio::test]
    async fn test_cancel_completes_with_cancelled_and_zero_bytes() {
        let queue = PendingQueue::new();
        let (request, rx) = read_request(16);
        let id = request.id();
        queue.insert(request);

        assert!(queue.cancel(id));
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_after_removal() {
        let queue = PendingQueue::new();
        let (request, _rx) = read_request(16);
        let id = request.id();
        queue.insert(request);

        let taken = queue.remove_if_present(id);
        assert!(taken.is_some());
        // The request already left the queue; cancellation must find nothing.
        assert!(!queue.cancel(id));
        assert!(queue.remove_if_present(id).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_cancel_and_completion_race() {
        // Property: exactly one terminal completion, never both, never neither.
        for _ in 0..64 {
            let queue = Arc::new(PendingQueue::new());
            let (request, rx) = read_request(8);
            let id = request.id();
            queue.insert(request);

            let cancel_queue = Arc::clone(&queue);
            let canceller = std::thread::spawn(move || cancel_queue.cancel(id));

            let complete_queue = Arc::clone(&queue);
            let completer = std::thread::spawn(move || {
                match complete_queue.remove_if_present(id) {
                    Some(request) => {
                        request.complete(Ok(crate::request::IoCompleted::with_data(vec![0u8; 8])));
                        true
                    }
                    None => false,
                }
            });

            let cancelled = canceller.join().unwrap();
            let completed = completer.join().unwrap();
            assert!(cancelled ^ completed, "exactly one path must win the race");

            let result = rx.await.unwrap();
            match result {
                Ok(done) => {
                    assert!(completed);
                    assert_eq!(done.information, 8);
                }
                Err(Error::Cancelled) => assert!(cancelled),
                Err(other) => panic!("unexpected outcome: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_all_drains_queue() {
        let queue = PendingQueue::new();
        let (a, rx_a) = read_request(1);
        let (b, rx_b) = read_request(2);
        queue.insert(a);
        queue.insert(b);

        queue.cancel_all();
        assert!(queue.is_empty());
        assert!(matches!(rx_a.await.unwrap(), Err(Error::Cancelled)));
        assert!(matches!(rx_b.await.unwrap(), Err(Error::Cancelled)));
    }
}
