//! USB transfer and descriptor model
//!
//! These types describe one control/bulk/interrupt operation and its outcome,
//! plus the slice of the configuration descriptor the driver needs to resolve
//! its pipes. They are the request/response vocabulary of the lower bus
//! boundary: the dispatch side builds a `TransferKind`, the bus worker
//! answers with a `TransferCompleted` or a `UsbError`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One logical USB operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransferKind {
    /// Control transfer, device to host
    ControlIn {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        /// Receive buffer size
        len: usize,
    },
    /// Control transfer, host to device
    ControlOut {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    /// Bulk transfer, device to host
    BulkIn { endpoint: u8, len: usize },
    /// Bulk transfer, host to device
    BulkOut {
        endpoint: u8,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    /// Interrupt transfer, device to host
    InterruptIn { endpoint: u8, len: usize },
}

/// Outcome of a successful transfer
#[derive(Debug, Clone, Default)]
pub struct TransferCompleted {
    /// Data received (IN transfers), empty for OUT transfers
    pub data: Vec<u8>,
    /// Actual bytes transferred in either direction
    pub length: usize,
}

impl TransferCompleted {
    pub fn received(data: Vec<u8>) -> Self {
        let length = data.len();
        TransferCompleted { data, length }
    }

    pub fn sent(length: usize) -> Self {
        TransferCompleted {
            data: Vec::new(),
            length,
        }
    }
}

/// USB transport errors, mirroring the libusb error set
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsbError {
    #[error("Transfer timed out")]
    Timeout,
    #[error("Endpoint stalled")]
    Pipe,
    #[error("Device disconnected")]
    NoDevice,
    #[error("Device or endpoint not found")]
    NotFound,
    #[error("Device busy")]
    Busy,
    #[error("Buffer overflow")]
    Overflow,
    #[error("I/O error")]
    Io,
    #[error("Invalid parameter")]
    InvalidParam,
    #[error("Access denied")]
    Access,
    #[error("Out of memory")]
    NoMem,
    #[error("USB error: {message}")]
    Other { message: String },
}

/// Standard descriptor types the bridge knows how to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Device,
    Configuration,
}

impl DescriptorKind {
    /// Descriptor type byte as used in the GET_DESCRIPTOR wValue high byte
    pub fn type_code(self) -> u8 {
        match self {
            DescriptorKind::Device => 1,
            DescriptorKind::Configuration => 2,
        }
    }
}

/// Endpoint transfer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointKind {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// One endpoint of an interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Endpoint address including the direction bit (bit 7 set = IN)
    pub address: u8,
    pub kind: EndpointKind,
    pub max_packet_size: u16,
}

impl EndpointInfo {
    pub fn is_in(&self) -> bool {
        self.address & 0x80 != 0
    }
}

/// One interface of a configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub number: u8,
    pub endpoints: Vec<EndpointInfo>,
}

/// The slice of a configuration descriptor the driver cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationInfo {
    /// bConfigurationValue used with SET_CONFIGURATION
    pub value: u8,
    pub interfaces: Vec<InterfaceInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_direction() {
        let ep_in = EndpointInfo {
            address: 0x83,
            kind: EndpointKind::Bulk,
            max_packet_size: 64,
        };
        let ep_out = EndpointInfo {
            address: 0x02,
            kind: EndpointKind::Bulk,
            max_packet_size: 64,
        };
        assert!(ep_in.is_in());
        assert!(!ep_out.is_in());
    }

    #[test]
    fn test_transfer_completed_lengths() {
        let recv = TransferCompleted::received(vec![1, 2, 3]);
        assert_eq!(recv.length, 3);
        let sent = TransferCompleted::sent(5);
        assert_eq!(sent.length, 5);
        assert!(sent.data.is_empty());
    }

    #[test]
    fn test_descriptor_type_codes() {
        assert_eq!(DescriptorKind::Device.type_code(), 1);
        assert_eq!(DescriptorKind::Configuration.type_code(), 2);
    }
}
