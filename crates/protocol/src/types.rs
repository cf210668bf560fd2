//! Wire structures for the serial control surface
//!
//! Each structure has a fixed little-endian wire layout. Decoding validates
//! the buffer size first and touches no data on failure; encoding into a
//! caller buffer enforces the same size contract, so getters and setters
//! share one stable `BufferTooSmall` outcome.

use crate::error::{ProtocolError, Result};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Stop-bit selection, encoded as the conventional small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StopBits {
    /// One stop bit
    One = 0,
    /// One and a half stop bits
    OnePointFive = 1,
    /// Two stop bits
    Two = 2,
}

impl StopBits {
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(StopBits::One),
            1 => Ok(StopBits::OnePointFive),
            2 => Ok(StopBits::Two),
            _ => Err(ProtocolError::InvalidField {
                field: "stop bits",
                value: raw as u32,
            }),
        }
    }
}

/// Parity selection, encoded as the conventional small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Parity {
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

impl Parity {
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(Parity::None),
            1 => Ok(Parity::Odd),
            2 => Ok(Parity::Even),
            3 => Ok(Parity::Mark),
            4 => Ok(Parity::Space),
            _ => Err(ProtocolError::InvalidField {
                field: "parity",
                value: raw as u32,
            }),
        }
    }
}

fn check_size(needed: usize, available: usize) -> Result<()> {
    if available < needed {
        return Err(ProtocolError::BufferTooSmall { needed, available });
    }
    Ok(())
}

/// Baud rate in bits per second (4-byte structure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaudRate(pub u32);

impl BaudRate {
    pub const WIRE_SIZE: usize = 4;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_size(Self::WIRE_SIZE, buf.len())?;
        Ok(BaudRate(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])))
    }

    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_size(Self::WIRE_SIZE, out.len())?;
        (&mut out[..Self::WIRE_SIZE]).put_u32_le(self.0);
        Ok(Self::WIRE_SIZE)
    }
}

/// Line control triple: stop bits, parity, word length (3-byte structure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineControl {
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub word_length: u8,
}

impl LineControl {
    pub const WIRE_SIZE: usize = 3;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_size(Self::WIRE_SIZE, buf.len())?;
        Ok(LineControl {
            stop_bits: StopBits::from_raw(buf[0])?,
            parity: Parity::from_raw(buf[1])?,
            word_length: buf[2],
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_size(Self::WIRE_SIZE, out.len())?;
        out[0] = self.stop_bits as u8;
        out[1] = self.parity as u8;
        out[2] = self.word_length;
        Ok(Self::WIRE_SIZE)
    }
}

impl Default for LineControl {
    /// 8N1, the usual serial default
    fn default() -> Self {
        LineControl {
            stop_bits: StopBits::One,
            parity: Parity::None,
            word_length: 8,
        }
    }
}

/// Special characters: XON/XOFF, EOF, error/break replacements, event
/// (6-byte structure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerialChars {
    pub eof_char: u8,
    pub error_char: u8,
    pub break_char: u8,
    pub event_char: u8,
    pub xon_char: u8,
    pub xoff_char: u8,
}

impl SerialChars {
    pub const WIRE_SIZE: usize = 6;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_size(Self::WIRE_SIZE, buf.len())?;
        Ok(SerialChars {
            eof_char: buf[0],
            error_char: buf[1],
            break_char: buf[2],
            event_char: buf[3],
            xon_char: buf[4],
            xoff_char: buf[5],
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_size(Self::WIRE_SIZE, out.len())?;
        out[..Self::WIRE_SIZE].copy_from_slice(&[
            self.eof_char,
            self.error_char,
            self.break_char,
            self.event_char,
            self.xon_char,
            self.xoff_char,
        ]);
        Ok(Self::WIRE_SIZE)
    }
}

/// Handshake flow-control descriptor (16-byte structure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Handflow {
    /// Control-line-controlled-flow bitmask
    pub control_handshake: u32,
    /// Character-replacement flow bitmask
    pub flow_replace: u32,
    /// Free space at which XON is sent
    pub xon_limit: i32,
    /// Used space at which XOFF is sent
    pub xoff_limit: i32,
}

impl Handflow {
    pub const WIRE_SIZE: usize = 16;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_size(Self::WIRE_SIZE, buf.len())?;
        let word = |i: usize| {
            u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
        };
        Ok(Handflow {
            control_handshake: word(0),
            flow_replace: word(4),
            xon_limit: word(8) as i32,
            xoff_limit: word(12) as i32,
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_size(Self::WIRE_SIZE, out.len())?;
        let mut rest = &mut out[..Self::WIRE_SIZE];
        rest.put_u32_le(self.control_handshake);
        rest.put_u32_le(self.flow_replace);
        rest.put_i32_le(self.xon_limit);
        rest.put_i32_le(self.xoff_limit);
        Ok(Self::WIRE_SIZE)
    }
}

/// DTR/RTS shadow state, a 2-bit mask reported as a 4-byte structure
///
/// SET_DTR/SET_RTS compose via OR, CLR_DTR/CLR_RTS via AND-NOT, so toggling
/// one line never disturbs the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DtrRts(u32);

impl DtrRts {
    pub const DTR: u32 = 0x01;
    pub const RTS: u32 = 0x02;
    pub const WIRE_SIZE: usize = 4;

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn dtr(self) -> bool {
        self.0 & Self::DTR != 0
    }

    pub fn rts(self) -> bool {
        self.0 & Self::RTS != 0
    }

    #[must_use]
    pub fn with_set(self, mask: u32) -> Self {
        DtrRts((self.0 | mask) & (Self::DTR | Self::RTS))
    }

    #[must_use]
    pub fn with_cleared(self, mask: u32) -> Self {
        DtrRts(self.0 & !mask)
    }

    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_size(Self::WIRE_SIZE, out.len())?;
        (&mut out[..Self::WIRE_SIZE]).put_u32_le(self.0);
        Ok(Self::WIRE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_rate_round_trip() {
        let baud = BaudRate(115_200);
        let mut buf = [0u8; BaudRate::WIRE_SIZE];
        assert_eq!(baud.encode(&mut buf).unwrap(), 4);
        assert_eq!(BaudRate::decode(&buf).unwrap(), baud);
    }

    #[test]
    fn test_baud_rate_short_buffer() {
        let short = [0u8; BaudRate::WIRE_SIZE - 1];
        assert_eq!(
            BaudRate::decode(&short),
            Err(ProtocolError::BufferTooSmall {
                needed: 4,
                available: 3
            })
        );
        let mut out = [0u8; BaudRate::WIRE_SIZE - 1];
        assert!(BaudRate(9600).encode(&mut out).is_err());
    }

    #[test]
    fn test_line_control_round_trip() {
        let lc = LineControl {
            stop_bits: StopBits::Two,
            parity: Parity::Even,
            word_length: 7,
        };
        let mut buf = [0u8; LineControl::WIRE_SIZE];
        lc.encode(&mut buf).unwrap();
        assert_eq!(LineControl::decode(&buf).unwrap(), lc);
    }

    #[test]
    fn test_line_control_rejects_bad_parity() {
        let buf = [0u8, 9, 8];
        assert_eq!(
            LineControl::decode(&buf),
            Err(ProtocolError::InvalidField {
                field: "parity",
                value: 9
            })
        );
    }

    #[test]
    fn test_chars_round_trip() {
        let chars = SerialChars {
            eof_char: 0x1A,
            error_char: 0,
            break_char: 0,
            event_char: 0,
            xon_char: 0x11,
            xoff_char: 0x13,
        };
        let mut buf = [0u8; SerialChars::WIRE_SIZE];
        chars.encode(&mut buf).unwrap();
        assert_eq!(SerialChars::decode(&buf).unwrap(), chars);
    }

    #[test]
    fn test_handflow_round_trip() {
        let flow = Handflow {
            control_handshake: 0x09,
            flow_replace: 0x80,
            xon_limit: 128,
            xoff_limit: -64,
        };
        let mut buf = [0u8; Handflow::WIRE_SIZE];
        flow.encode(&mut buf).unwrap();
        assert_eq!(Handflow::decode(&buf).unwrap(), flow);
    }

    #[test]
    fn test_dtr_rts_independence() {
        let lines = DtrRts::default()
            .with_set(DtrRts::DTR)
            .with_set(DtrRts::RTS);
        assert!(lines.dtr() && lines.rts());

        let cleared = lines.with_cleared(DtrRts::RTS);
        assert!(cleared.dtr());
        assert!(!cleared.rts());

        let cleared = lines.with_cleared(DtrRts::DTR);
        assert!(!cleared.dtr());
        assert!(cleared.rts());
    }

    #[test]
    fn test_dtr_rts_mask_stays_two_bits() {
        let lines = DtrRts::default().with_set(0xFF);
        assert_eq!(lines.bits(), DtrRts::DTR | DtrRts::RTS);
    }
}
