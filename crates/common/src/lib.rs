//! Common utilities for rust-pl2303
//!
//! This crate provides shared functionality between the driver core and the
//! USB worker thread: the transfer request/outcome model, the async channel
//! bridge that carries transfers from the async dispatch side to the blocking
//! bus thread, error handling, and logging setup.

pub mod bridge;
pub mod error;
pub mod logging;
pub mod usb;

pub use bridge::{BusBridge, BusCommand, BusEvent, BusWorker, create_bus_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use usb::{
    ConfigurationInfo, DescriptorKind, EndpointInfo, EndpointKind, InterfaceInfo,
    TransferCompleted, TransferKind, UsbError,
};
