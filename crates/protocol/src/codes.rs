//! Serial device-control codes
//!
//! The numeric values follow the conventional serial-port control encoding
//! (device type 0x1B, buffered method) so traces remain comparable with
//! other serial stacks. `ControlCode::name` yields the symbolic name used
//! when logging unrecognized or unimplemented codes.

/// Control codes understood (or at least named) by the serial dispatch layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ControlCode {
    SetBaudRate = 0x001B_0004,
    SetQueueSize = 0x001B_0008,
    SetLineControl = 0x001B_000C,
    SetBreakOn = 0x001B_0010,
    SetBreakOff = 0x001B_0014,
    ImmediateChar = 0x001B_0018,
    SetTimeouts = 0x001B_001C,
    GetTimeouts = 0x001B_0020,
    SetDtr = 0x001B_0024,
    ClrDtr = 0x001B_0028,
    ResetDevice = 0x001B_002C,
    SetRts = 0x001B_0030,
    ClrRts = 0x001B_0034,
    SetXoff = 0x001B_0038,
    SetXon = 0x001B_003C,
    GetWaitMask = 0x001B_0040,
    SetWaitMask = 0x001B_0044,
    WaitOnMask = 0x001B_0048,
    Purge = 0x001B_004C,
    GetBaudRate = 0x001B_0050,
    GetLineControl = 0x001B_0054,
    GetChars = 0x001B_0058,
    SetChars = 0x001B_005C,
    GetHandflow = 0x001B_0060,
    SetHandflow = 0x001B_0064,
    GetModemStatus = 0x001B_0068,
    GetCommStatus = 0x001B_006C,
    XoffCounter = 0x001B_0070,
    GetProperties = 0x001B_0074,
    GetDtrRts = 0x001B_0078,
    LsrmstInsert = 0x001B_007C,
    ConfigSize = 0x001B_0080,
    GetStats = 0x001B_008C,
    ClearStats = 0x001B_0090,
    GetModemControl = 0x001B_0094,
    SetModemControl = 0x001B_0098,
    SetFifoControl = 0x001B_009C,
}

impl ControlCode {
    /// Decode a raw control code, if it is one we know by name
    pub fn from_raw(raw: u32) -> Option<Self> {
        use ControlCode::*;
        let code = match raw {
            0x001B_0004 => SetBaudRate,
            0x001B_0008 => SetQueueSize,
            0x001B_000C => SetLineControl,
            0x001B_0010 => SetBreakOn,
            0x001B_0014 => SetBreakOff,
            0x001B_0018 => ImmediateChar,
            0x001B_001C => SetTimeouts,
            0x001B_0020 => GetTimeouts,
            0x001B_0024 => SetDtr,
            0x001B_0028 => ClrDtr,
            0x001B_002C => ResetDevice,
            0x001B_0030 => SetRts,
            0x001B_0034 => ClrRts,
            0x001B_0038 => SetXoff,
            0x001B_003C => SetXon,
            0x001B_0040 => GetWaitMask,
            0x001B_0044 => SetWaitMask,
            0x001B_0048 => WaitOnMask,
            0x001B_004C => Purge,
            0x001B_0050 => GetBaudRate,
            0x001B_0054 => GetLineControl,
            0x001B_0058 => GetChars,
            0x001B_005C => SetChars,
            0x001B_0060 => GetHandflow,
            0x001B_0064 => SetHandflow,
            0x001B_0068 => GetModemStatus,
            0x001B_006C => GetCommStatus,
            0x001B_0070 => XoffCounter,
            0x001B_0074 => GetProperties,
            0x001B_0078 => GetDtrRts,
            0x001B_007C => LsrmstInsert,
            0x001B_0080 => ConfigSize,
            0x001B_008C => GetStats,
            0x001B_0090 => ClearStats,
            0x001B_0094 => GetModemControl,
            0x001B_0098 => SetModemControl,
            0x001B_009C => SetFifoControl,
            _ => return None,
        };
        Some(code)
    }

    /// The raw numeric value of this code
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Symbolic name for diagnostics
    pub fn name(self) -> &'static str {
        use ControlCode::*;
        match self {
            SetBaudRate => "IOCTL_SERIAL_SET_BAUD_RATE",
            SetQueueSize => "IOCTL_SERIAL_SET_QUEUE_SIZE",
            SetLineControl => "IOCTL_SERIAL_SET_LINE_CONTROL",
            SetBreakOn => "IOCTL_SERIAL_SET_BREAK_ON",
            SetBreakOff => "IOCTL_SERIAL_SET_BREAK_OFF",
            ImmediateChar => "IOCTL_SERIAL_IMMEDIATE_CHAR",
            SetTimeouts => "IOCTL_SERIAL_SET_TIMEOUTS",
            GetTimeouts => "IOCTL_SERIAL_GET_TIMEOUTS",
            SetDtr => "IOCTL_SERIAL_SET_DTR",
            ClrDtr => "IOCTL_SERIAL_CLR_DTR",
            ResetDevice => "IOCTL_SERIAL_RESET_DEVICE",
            SetRts => "IOCTL_SERIAL_SET_RTS",
            ClrRts => "IOCTL_SERIAL_CLR_RTS",
            SetXoff => "IOCTL_SERIAL_SET_XOFF",
            SetXon => "IOCTL_SERIAL_SET_XON",
            GetWaitMask => "IOCTL_SERIAL_GET_WAIT_MASK",
            SetWaitMask => "IOCTL_SERIAL_SET_WAIT_MASK",
            WaitOnMask => "IOCTL_SERIAL_WAIT_ON_MASK",
            Purge => "IOCTL_SERIAL_PURGE",
            GetBaudRate => "IOCTL_SERIAL_GET_BAUD_RATE",
            GetLineControl => "IOCTL_SERIAL_GET_LINE_CONTROL",
            GetChars => "IOCTL_SERIAL_GET_CHARS",
            SetChars => "IOCTL_SERIAL_SET_CHARS",
            GetHandflow => "IOCTL_SERIAL_GET_HANDFLOW",
            SetHandflow => "IOCTL_SERIAL_SET_HANDFLOW",
            GetModemStatus => "IOCTL_SERIAL_GET_MODEMSTATUS",
            GetCommStatus => "IOCTL_SERIAL_GET_COMMSTATUS",
            XoffCounter => "IOCTL_SERIAL_XOFF_COUNTER",
            GetProperties => "IOCTL_SERIAL_GET_PROPERTIES",
            GetDtrRts => "IOCTL_SERIAL_GET_DTRRTS",
            LsrmstInsert => "IOCTL_SERIAL_LSRMST_INSERT",
            ConfigSize => "IOCTL_SERIAL_CONFIG_SIZE",
            GetStats => "IOCTL_SERIAL_GET_STATS",
            ClearStats => "IOCTL_SERIAL_CLEAR_STATS",
            GetModemControl => "IOCTL_SERIAL_GET_MODEM_CONTROL",
            SetModemControl => "IOCTL_SERIAL_SET_MODEM_CONTROL",
            SetFifoControl => "IOCTL_SERIAL_SET_FIFO_CONTROL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_round_trip() {
        for code in [
            ControlCode::SetBaudRate,
            ControlCode::GetDtrRts,
            ControlCode::SetFifoControl,
        ] {
            assert_eq!(ControlCode::from_raw(code.raw()), Some(code));
        }
    }

    #[test]
    fn test_unknown_raw_code() {
        assert_eq!(ControlCode::from_raw(0xDEAD_BEEF), None);
    }

    #[test]
    fn test_names_are_distinct() {
        assert_ne!(
            ControlCode::SetDtr.name(),
            ControlCode::ClrDtr.name()
        );
    }
}
