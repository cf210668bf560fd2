//! Dispatch layer
//!
//! Routes inbound requests to the lifecycle machine, the line-state store,
//! and the transfer bridge. Every entry point checks for the Deleted state
//! first and fails the request with "no such device" before touching anything
//! else; this is the single most important invariant in the driver. Reads
//! and writes never block here: non-empty ones go to the bridge's async path
//! and are completed from its continuation, never from this call stack.

use crate::device::DeviceContext;
use crate::ioctl;
use crate::pnp::{PnpMinor, PnpState};
use crate::request::{IoCompleted, IoRequest, Operation};
use common::Error;
use std::sync::Arc;
use tracing::{debug, warn};

/// What dispatch did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Completed (successfully or not) before returning
    Complete,
    /// Marked pending; a continuation completes it later
    Pending,
    /// Handed to the lower stack, which now owns its completion
    Forwarded,
}

impl DeviceContext {
    fn is_deleted(&self) -> bool {
        self.state() == PnpState::Deleted
    }

    /// Route one request by operation class
    pub async fn dispatch(self: &Arc<Self>, request: IoRequest) -> Disposition {
        match request.operation {
            Operation::Create | Operation::Close => self.dispatch_create_close(request),
            Operation::Read { .. } => self.dispatch_read(request),
            Operation::Write { .. } => self.dispatch_write(request),
            Operation::DeviceControl { .. } => self.dispatch_device_control(request).await,
            Operation::Power => self.dispatch_power(request),
            Operation::SystemControl => self.dispatch_system_control(request),
            Operation::Pnp(_) => self.dispatch_pnp(request).await,
        }
    }

    /// Opening or closing the port never touches hardware; bring-up happened
    /// at start time
    fn dispatch_create_close(&self, request: IoRequest) -> Disposition {
        if self.is_deleted() {
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        request.complete(Ok(IoCompleted::empty()));
        Disposition::Complete
    }

    fn dispatch_read(&self, request: IoRequest) -> Disposition {
        if self.is_deleted() {
            warn!("Read on deleted device");
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        let Operation::Read { length } = request.operation else {
            unreachable!("routed by operation class");
        };
        if length == 0 {
            request.complete(Ok(IoCompleted::empty()));
            return Disposition::Complete;
        }
        let Some(pipes) = self.pipes() else {
            request.complete(Err(Error::NotConfigured));
            return Disposition::Complete;
        };
        self.bridge().read_async(request, pipes.bulk_in, length);
        Disposition::Pending
    }

    fn dispatch_write(&self, mut request: IoRequest) -> Disposition {
        if self.is_deleted() {
            warn!("Write on deleted device");
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        let data = match &mut request.operation {
            Operation::Write { data } => std::mem::take(data),
            _ => unreachable!("routed by operation class"),
        };
        if data.is_empty() {
            request.complete(Ok(IoCompleted::empty()));
            return Disposition::Complete;
        }
        let Some(pipes) = self.pipes() else {
            request.complete(Err(Error::NotConfigured));
            return Disposition::Complete;
        };
        self.bridge().write_async(request, pipes.bulk_out, data);
        Disposition::Pending
    }

    async fn dispatch_device_control(&self, request: IoRequest) -> Disposition {
        if self.is_deleted() {
            warn!("Device control on deleted device");
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        ioctl::handle_device_control(self, request).await
    }

    /// Power requests notify the power manager that the next operation may
    /// proceed on both paths, then forward unless the device is gone
    fn dispatch_power(&self, request: IoRequest) -> Disposition {
        self.power().start_next_power_op();
        if self.is_deleted() {
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        self.lower().forward(request);
        Disposition::Forwarded
    }

    fn dispatch_system_control(&self, request: IoRequest) -> Disposition {
        if self.is_deleted() {
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        self.lower().forward(request);
        Disposition::Forwarded
    }

    async fn dispatch_pnp(self: &Arc<Self>, request: IoRequest) -> Disposition {
        if self.is_deleted() {
            warn!("PnP request on deleted device");
            request.complete(Err(Error::NoSuchDevice));
            return Disposition::Complete;
        }
        let Operation::Pnp(minor) = request.operation else {
            unreachable!("routed by operation class");
        };

        match minor {
            PnpMinor::StartDevice => {
                let outcome = match self.lower().forward_start() {
                    Ok(()) => self.start_device().await,
                    Err(e) => Err(e),
                };
                // The state only advances once bring-up fully succeeded.
                let outcome = outcome.and_then(|()| {
                    self.lifecycle()
                        .lock()
                        .unwrap()
                        .apply(PnpMinor::StartDevice)
                        .map_err(|e| Error::InvalidParameter(e.to_string()))
                });
                match outcome {
                    Ok(_) => {
                        debug!("Device started");
                        request.complete(Ok(IoCompleted::empty()));
                    }
                    Err(e) => {
                        warn!("Device start failed: {}", e);
                        request.complete(Err(e));
                    }
                }
                Disposition::Complete
            }

            PnpMinor::QueryStopDevice
            | PnpMinor::QueryRemoveDevice
            | PnpMinor::CancelStopDevice
            | PnpMinor::CancelRemoveDevice
            | PnpMinor::StopDevice => {
                let applied = self.lifecycle().lock().unwrap().apply(minor);
                match applied {
                    Ok(state) => {
                        debug!("PnP {:?} -> {:?}", minor, state);
                        self.lower().forward(request);
                        Disposition::Forwarded
                    }
                    Err(e) => {
                        warn!("PnP {:?} rejected: {}", minor, e);
                        request.complete(Err(Error::InvalidParameter(e.to_string())));
                        Disposition::Complete
                    }
                }
            }

            PnpMinor::SurpriseRemoval => {
                match self.lifecycle().lock().unwrap().apply(minor) {
                    Ok(state) => debug!("PnP {:?} -> {:?}", minor, state),
                    Err(e) => warn!("PnP {:?} rejected: {}", minor, e),
                }
                // The hardware is gone; only the host-side publication can
                // (and must) be torn down.
                self.unpublish_naming();
                self.queue().cancel_all();
                self.lower().forward(request);
                Disposition::Forwarded
            }

            PnpMinor::RemoveDevice => {
                let previous = {
                    let mut lifecycle = self.lifecycle().lock().unwrap();
                    match lifecycle.apply(minor) {
                        Ok(_) => lifecycle.previous(),
                        Err(e) => {
                            request.complete(Err(Error::InvalidParameter(e.to_string())));
                            return Disposition::Complete;
                        }
                    }
                };

                if previous != Some(PnpState::SurpriseRemovePending) {
                    self.unpublish_naming();
                    if let Err(e) = self.bridge().unconfigure().await {
                        warn!("Unconfigure during remove failed: {}", e);
                    }
                }

                self.lower().forward(request);
                self.lower().detach();
                self.release_resources();
                debug!("Device deleted");
                Disposition::Forwarded
            }

            PnpMinor::Other(code) => {
                debug!("Passing through unrecognized PnP minor {:#04x}", code);
                self.lower().forward(request);
                Disposition::Forwarded
            }
        }
    }
}
