//! Control-surface error types

use thiserror::Error;

/// Errors produced while encoding or decoding control payloads
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Caller buffer cannot hold the fixed-size structure
    #[error("Buffer too small: needed {needed}, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// A field carried a value outside its defined encoding
    #[error("Invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: u32 },
}

/// Type alias for control-surface results
pub type Result<T> = std::result::Result<T, ProtocolError>;
