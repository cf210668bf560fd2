//! Serial device-control handling
//!
//! Decodes the control code, pulls the typed payload out of the input buffer
//! or encodes one into the output buffer, and drives the line-state store.
//! Setters validate and decode the payload before any state changes, so a
//! short or malformed buffer leaves both the store and the hardware
//! untouched. Codes we know by name but do not implement are logged with
//! that name and fail as not implemented.

use crate::device::DeviceContext;
use crate::dispatch::Disposition;
use crate::request::{IoCompleted, IoRequest, Operation};
use common::Error;
use protocol::{BaudRate, ControlCode, DtrRts, Handflow, LineControl, SerialChars};
use tracing::{debug, warn};

/// Encode one wire value into a fresh buffer of the caller's declared size
fn encode_into<F>(capacity: usize, encode: F) -> Result<IoCompleted, Error>
where
    F: FnOnce(&mut [u8]) -> protocol::Result<usize>,
{
    let mut out = vec![0u8; capacity];
    let written = encode(&mut out)?;
    out.truncate(written);
    Ok(IoCompleted::with_data(out))
}

impl DeviceContext {
    async fn run_device_control(
        &self,
        code: ControlCode,
        input: &[u8],
        output_capacity: usize,
    ) -> Result<IoCompleted, Error> {
        match code {
            ControlCode::GetBaudRate => {
                encode_into(output_capacity, |out| self.line().baud_rate().encode(out))
            }
            ControlCode::SetBaudRate => {
                let baud = BaudRate::decode(input)?;
                self.line().set_baud_rate(self.bridge(), baud).await?;
                debug!("Baud rate set to {}", baud.0);
                Ok(IoCompleted::empty())
            }
            ControlCode::GetLineControl => {
                encode_into(output_capacity, |out| self.line().line_control().encode(out))
            }
            ControlCode::SetLineControl => {
                let line_control = LineControl::decode(input)?;
                self.line()
                    .set_line_control(self.bridge(), line_control)
                    .await?;
                Ok(IoCompleted::empty())
            }
            ControlCode::GetChars => {
                encode_into(output_capacity, |out| self.line().chars().encode(out))
            }
            ControlCode::SetChars => {
                self.line().set_chars(SerialChars::decode(input)?);
                Ok(IoCompleted::empty())
            }
            ControlCode::GetHandflow => {
                encode_into(output_capacity, |out| self.line().handflow().encode(out))
            }
            ControlCode::SetHandflow => {
                self.line().set_handflow(Handflow::decode(input)?);
                Ok(IoCompleted::empty())
            }
            ControlCode::SetDtr => {
                self.line()
                    .set_control_bits(self.bridge(), DtrRts::DTR)
                    .await?;
                Ok(IoCompleted::empty())
            }
            ControlCode::ClrDtr => {
                self.line()
                    .clear_control_bits(self.bridge(), DtrRts::DTR)
                    .await?;
                Ok(IoCompleted::empty())
            }
            ControlCode::SetRts => {
                self.line()
                    .set_control_bits(self.bridge(), DtrRts::RTS)
                    .await?;
                Ok(IoCompleted::empty())
            }
            ControlCode::ClrRts => {
                self.line()
                    .clear_control_bits(self.bridge(), DtrRts::RTS)
                    .await?;
                Ok(IoCompleted::empty())
            }
            ControlCode::GetDtrRts => {
                encode_into(output_capacity, |out| self.line().dtr_rts().encode(out))
            }
            other => {
                warn!("Unimplemented serial control {}", other.name());
                Err(Error::NotImplemented)
            }
        }
    }
}

/// Decode and execute a device-control request, completing it in place
pub(crate) async fn handle_device_control(
    device: &DeviceContext,
    mut request: IoRequest,
) -> Disposition {
    let (code, input, output_capacity) = match &mut request.operation {
        Operation::DeviceControl {
            code,
            input,
            output_capacity,
        } => (*code, std::mem::take(input), *output_capacity),
        _ => unreachable!("routed by operation class"),
    };

    let result = match ControlCode::from_raw(code) {
        Some(code) => device.run_device_control(code, &input, output_capacity).await,
        None => {
            warn!("Unrecognized serial control code {:#010x}", code);
            Err(Error::NotImplemented)
        }
    };
    request.complete(result);
    Disposition::Complete
}
