//! Driver error taxonomy
//!
//! Every failure a dispatch entry point can produce collapses into one of
//! these stable statuses. Requests are completed with exactly one of them
//! (or a success outcome); there is no silent failure path.

use crate::usb::UsbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The device is gone (lifecycle state is Deleted, or it vanished)
    #[error("No such device")]
    NoSuchDevice,

    /// Allocation or capacity exhaustion, fully unwound
    #[error("Insufficient resources")]
    InsufficientResources,

    /// Caller buffer cannot hold the fixed-size structure
    #[error("Buffer too small: needed {needed}, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// A request parameter was outside its defined encoding
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Recognized-but-unimplemented or unrecognized control code
    #[error("Not implemented")]
    NotImplemented,

    /// The request was cancelled before completion
    #[error("Cancelled")]
    Cancelled,

    /// Transfers were attempted before pipes were configured
    #[error("Device not configured")]
    NotConfigured,

    /// Device configuration did not expose the required endpoints
    #[error("Configuration mismatch: {0}")]
    ConfigurationMismatch(&'static str),

    /// Hardware/transport failure, surfaced verbatim
    #[error("USB error: {0}")]
    Usb(UsbError),

    /// The bridge channel to the bus worker is closed
    #[error("Channel error: {0}")]
    Channel(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error from the naming/publication glue
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UsbError> for Error {
    fn from(err: UsbError) -> Self {
        match err {
            // The bus reporting memory exhaustion is the one resource
            // failure that can still reach us from below.
            UsbError::NoMem => Error::InsufficientResources,
            UsbError::NoDevice => Error::NoSuchDevice,
            other => Error::Usb(other),
        }
    }
}

impl From<protocol::ProtocolError> for Error {
    fn from(err: protocol::ProtocolError) -> Self {
        match err {
            protocol::ProtocolError::BufferTooSmall { needed, available } => {
                Error::BufferTooSmall { needed, available }
            }
            protocol::ProtocolError::InvalidField { field, value } => {
                Error::InvalidParameter(format!("{field} = {value}"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_too_small_maps_through() {
        let err: Error = protocol::ProtocolError::BufferTooSmall {
            needed: 4,
            available: 3,
        }
        .into();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_no_mem_becomes_insufficient_resources() {
        let err: Error = UsbError::NoMem.into();
        assert!(matches!(err, Error::InsufficientResources));
    }

    #[test]
    fn test_device_gone_maps_to_no_such_device() {
        let err: Error = UsbError::NoDevice.into();
        assert!(matches!(err, Error::NoSuchDevice));
    }
}
