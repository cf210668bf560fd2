//! Inbound I/O request model
//!
//! An [`IoRequest`] is the unit of work the dispatch layer routes. It carries
//! the operation, its buffers, and a oneshot completion slot. `complete`
//! consumes the request, so a request can be completed at most once and the
//! compiler enforces it; the originator holds the receiving end and observes
//! the status/byte-count pair there.

use crate::pnp::PnpMinor;
use common::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Identifies one in-flight request, process-wide unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Successful completion: transferred byte count plus any output data
#[derive(Debug, Clone, Default)]
pub struct IoCompleted {
    /// Bytes transferred (the "information" half of the result pair)
    pub information: usize,
    /// Output payload for getter control codes and reads
    pub data: Vec<u8>,
}

impl IoCompleted {
    pub fn empty() -> Self {
        IoCompleted::default()
    }

    pub fn with_data(data: Vec<u8>) -> Self {
        let information = data.len();
        IoCompleted { information, data }
    }
}

/// The status + information pair every request resolves to
pub type IoResult = Result<IoCompleted, Error>;

/// Operation classes the dispatch layer routes
#[derive(Debug)]
pub enum Operation {
    Create,
    Close,
    Read {
        length: usize,
    },
    Write {
        data: Vec<u8>,
    },
    DeviceControl {
        code: u32,
        input: Vec<u8>,
        /// Declared size of the caller's output buffer
        output_capacity: usize,
    },
    Power,
    SystemControl,
    Pnp(PnpMinor),
}

/// One inbound request with its completion slot
#[derive(Debug)]
pub struct IoRequest {
    id: RequestId,
    pub operation: Operation,
    completion: oneshot::Sender<IoResult>,
}

impl IoRequest {
    /// Create a request and the receiver its originator awaits
    pub fn new(operation: Operation) -> (Self, oneshot::Receiver<IoResult>) {
        let (tx, rx) = oneshot::channel();
        let request = IoRequest {
            id: RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)),
            operation,
            completion: tx,
        };
        (request, rx)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Finalize the request. Consumes it, so completion happens exactly once.
    pub fn complete(self, result: IoResult) {
        // The originator may have stopped listening; that is its business.
        let _ = self.completion.send(result);
    }
}
