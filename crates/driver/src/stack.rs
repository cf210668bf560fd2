//! Boundary traits for the host stack
//!
//! The core does not own the device stack below it or the power manager
//! above it; it talks to both through these seams. Production wires in
//! implementations backed by the bus worker, tests wire in recorders.

use crate::request::{IoCompleted, IoRequest};
use common::Result;
use tracing::debug;

/// The next-lower driver in the device stack
pub trait LowerStack: Send + Sync {
    /// Forward a start request down the stack and wait for its outcome
    fn forward_start(&self) -> Result<()>;

    /// Hand a request downward; completing it becomes the lower driver's
    /// responsibility
    fn forward(&self, request: IoRequest);

    /// Detach from the lower device during removal
    fn detach(&self);
}

/// Power-manager notification sink
///
/// Must be told the next power operation may proceed on every power dispatch,
/// including the failure path for a deleted device, or the system power state
/// machine stalls.
pub trait PowerManager: Send + Sync {
    fn start_next_power_op(&self);
}

/// Lower stack for a device whose bus is the worker thread: downward
/// requests have nothing below them to do, so they complete successfully.
#[derive(Debug, Default)]
pub struct BusLowerStack;

impl LowerStack for BusLowerStack {
    fn forward_start(&self) -> Result<()> {
        Ok(())
    }

    fn forward(&self, request: IoRequest) {
        debug!("Forwarded request {:?} completed by lower stack", request.id());
        request.complete(Ok(IoCompleted::empty()));
    }

    fn detach(&self) {
        debug!("Detached from lower stack");
    }
}

/// Power manager that only acknowledges
#[derive(Debug, Default)]
pub struct NoopPowerManager;

impl PowerManager for NoopPowerManager {
    fn start_next_power_op(&self) {}
}
