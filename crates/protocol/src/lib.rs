//! Serial port control surface for rust-pl2303
//!
//! This crate defines the device-control codes a virtual serial port accepts
//! and the fixed-size wire structures that travel with them: baud rate, line
//! control, special characters, handshake flow control, and the DTR/RTS mask.
//! Every structure has a stable wire size and an encode/decode pair that
//! reports `BufferTooSmall` before touching any data, so callers get the same
//! error for an undersized buffer no matter which code they issue.

pub mod codes;
pub mod error;
pub mod types;

pub use codes::ControlCode;
pub use error::{ProtocolError, Result};
pub use types::{
    BaudRate, DtrRts, Handflow, LineControl, Parity, SerialChars, StopBits,
};
