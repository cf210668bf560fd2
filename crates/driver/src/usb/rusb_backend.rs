//! rusb-backed transfer executor
//!
//! Owns the libusb device handle and maps our transfer model onto rusb's
//! synchronous API. Runs only on the bus worker thread.

use crate::usb::worker::TransferExecutor;
use common::{
    ConfigurationInfo, EndpointInfo, EndpointKind, InterfaceInfo, TransferCompleted,
    TransferKind, UsbError,
};
use rusb::{Context, DeviceHandle, TransferType, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout applied to every transfer the backend executes
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

/// Map rusb::Error to our transport error vocabulary
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        rusb::Error::NoMem => UsbError::NoMem,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    }
}

fn map_transfer_type(kind: TransferType) -> EndpointKind {
    match kind {
        TransferType::Control => EndpointKind::Control,
        TransferType::Isochronous => EndpointKind::Isochronous,
        TransferType::Bulk => EndpointKind::Bulk,
        TransferType::Interrupt => EndpointKind::Interrupt,
    }
}

/// Executor over one opened rusb device
pub struct RusbExecutor {
    handle: DeviceHandle<Context>,
    claimed_interface: Option<u8>,
}

impl RusbExecutor {
    /// Enumerate the bus and open the first device matching vid:pid
    pub fn open(context: &Context, vendor_id: u16, product_id: u16) -> Result<Self, UsbError> {
        let devices = context.devices().map_err(map_rusb_error)?;
        for device in devices.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping device without readable descriptor: {}", e);
                    continue;
                }
            };
            if descriptor.vendor_id() != vendor_id || descriptor.product_id() != product_id {
                continue;
            }
            debug!(
                "Opening {:04x}:{:04x} at bus {} addr {}",
                vendor_id,
                product_id,
                device.bus_number(),
                device.address()
            );
            let handle = device.open().map_err(map_rusb_error)?;
            let _ = handle.set_auto_detach_kernel_driver(true);
            return Ok(RusbExecutor {
                handle,
                claimed_interface: None,
            });
        }
        Err(UsbError::NotFound)
    }

    fn control_in(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
    ) -> Result<TransferCompleted, UsbError> {
        let mut buffer = vec![0u8; len];
        let received = self
            .handle
            .read_control(request_type, request, value, index, &mut buffer, TRANSFER_TIMEOUT)
            .map_err(map_rusb_error)?;
        buffer.truncate(received);
        Ok(TransferCompleted::received(buffer))
    }

    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<TransferCompleted, UsbError> {
        let sent = self
            .handle
            .write_control(request_type, request, value, index, data, TRANSFER_TIMEOUT)
            .map_err(map_rusb_error)?;
        Ok(TransferCompleted::sent(sent))
    }
}

impl TransferExecutor for RusbExecutor {
    fn execute(&mut self, transfer: TransferKind) -> Result<TransferCompleted, UsbError> {
        match transfer {
            TransferKind::ControlIn {
                request_type,
                request,
                value,
                index,
                len,
            } => self.control_in(request_type, request, value, index, len),
            TransferKind::ControlOut {
                request_type,
                request,
                value,
                index,
                data,
            } => self.control_out(request_type, request, value, index, &data),
            TransferKind::BulkIn { endpoint, len } => {
                let mut buffer = vec![0u8; len];
                let received = self
                    .handle
                    .read_bulk(endpoint, &mut buffer, TRANSFER_TIMEOUT)
                    .map_err(map_rusb_error)?;
                buffer.truncate(received);
                Ok(TransferCompleted::received(buffer))
            }
            TransferKind::BulkOut { endpoint, data } => {
                let sent = self
                    .handle
                    .write_bulk(endpoint, &data, TRANSFER_TIMEOUT)
                    .map_err(map_rusb_error)?;
                Ok(TransferCompleted::sent(sent))
            }
            TransferKind::InterruptIn { endpoint, len } => {
                let mut buffer = vec![0u8; len];
                let received = self
                    .handle
                    .read_interrupt(endpoint, &mut buffer, TRANSFER_TIMEOUT)
                    .map_err(map_rusb_error)?;
                buffer.truncate(received);
                Ok(TransferCompleted::received(buffer))
            }
        }
    }

    fn configuration(&mut self) -> Result<ConfigurationInfo, UsbError> {
        let device = self.handle.device();
        let config = device.config_descriptor(0).map_err(map_rusb_error)?;

        let interfaces = config
            .interfaces()
            .map(|interface| {
                let endpoints = interface
                    .descriptors()
                    .flat_map(|desc| {
                        desc.endpoint_descriptors()
                            .map(|ep| EndpointInfo {
                                address: ep.address(),
                                kind: map_transfer_type(ep.transfer_type()),
                                max_packet_size: ep.max_packet_size(),
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect();
                InterfaceInfo {
                    number: interface.number(),
                    endpoints,
                }
            })
            .collect();

        Ok(ConfigurationInfo {
            value: config.number(),
            interfaces,
        })
    }

    fn select_configuration(&mut self, value: Option<u8>) -> Result<(), UsbError> {
        match value {
            Some(config) => {
                self.handle
                    .set_active_configuration(config)
                    .map_err(map_rusb_error)?;
                self.handle.claim_interface(0).map_err(map_rusb_error)?;
                self.claimed_interface = Some(0);
                Ok(())
            }
            None => {
                if let Some(interface) = self.claimed_interface.take() {
                    let _ = self.handle.release_interface(interface);
                }
                Ok(())
            }
        }
    }
}
