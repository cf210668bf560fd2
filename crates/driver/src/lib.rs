//! PL2303 USB-serial driver core
//!
//! Presents a virtual serial port backed by a Prolific PL2303 adapter,
//! translating serial-port semantics (baud rate, line control, DTR/RTS,
//! read/write) into USB control and bulk transfers. The crate is organized
//! around a device lifecycle state machine ([`pnp`]), a dispatch layer that
//! routes incoming requests ([`dispatch`], [`ioctl`]), a line-state store
//! serialized under one lock ([`line`]), a cancel-safe pending request queue
//! ([`queue`]), and the transfer bridge that turns logical USB operations
//! into bus-worker commands ([`usb`]).

pub mod config;
pub mod device;
pub mod dispatch;
pub mod ioctl;
pub mod line;
pub mod naming;
pub mod pnp;
pub mod queue;
pub mod request;
pub mod stack;
pub mod usb;

pub use device::DeviceContext;
pub use dispatch::Disposition;
pub use request::{IoCompleted, IoRequest, IoResult, Operation, RequestId};
