//! Transfer bridge: logical serial operations to bus commands
//!
//! Every operation here builds a [`TransferKind`], hands it to the bus worker
//! over the bridge channel, and delivers the result one of two ways:
//! `submit` awaits the response (the suspending primitive used for bring-up,
//! descriptor fetches, and line-state pushes), while `read_async` and
//! `write_async` return immediately and complete the originating request from
//! a spawned continuation, never on the dispatch call stack.
//!
//! No driver-level timeout is imposed on submissions; the transfer is bounded
//! only by the bus backend's own timeout behavior.

use crate::request::{IoCompleted, IoRequest};
use common::{
    BusCommand, ConfigurationInfo, DescriptorKind, EndpointKind, Error, Result,
    TransferCompleted, TransferKind,
};
use protocol::{BaudRate, DtrRts, LineControl};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Standard GET_DESCRIPTOR request fields
const REQUEST_TYPE_STANDARD_IN: u8 = 0x80;
const REQUEST_GET_DESCRIPTOR: u8 = 0x06;

/// PL2303 class requests (CDC-shaped, interface recipient)
const REQUEST_TYPE_CLASS_OUT: u8 = 0x21;
const REQUEST_SET_LINE: u8 = 0x20;
const REQUEST_SET_CONTROL: u8 = 0x22;

/// PL2303 vendor register access
const REQUEST_TYPE_VENDOR_IN: u8 = 0xC0;
const REQUEST_TYPE_VENDOR_OUT: u8 = 0x40;
const REQUEST_VENDOR: u8 = 0x01;

/// Wire size of the line-coding structure pushed with SET_LINE
const LINE_CODING_SIZE: usize = 7;

/// Pipe handles resolved at configuration time
///
/// All three are valid or the configuration failed; there is no partial set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipes {
    pub bulk_in: u8,
    pub bulk_out: u8,
    pub interrupt_in: u8,
}

/// Select the first bulk-in, first bulk-out, and first interrupt-in endpoint
/// across the configuration's interfaces. Missing any role fails the whole
/// configuration; no partial pipe set is ever produced.
fn resolve_pipes(config: &ConfigurationInfo) -> Result<Pipes> {
    let mut bulk_in = None;
    let mut bulk_out = None;
    let mut interrupt_in = None;

    for interface in &config.interfaces {
        for endpoint in &interface.endpoints {
            match (endpoint.kind, endpoint.is_in()) {
                (EndpointKind::Bulk, true) => {
                    bulk_in.get_or_insert(endpoint.address);
                }
                (EndpointKind::Bulk, false) => {
                    bulk_out.get_or_insert(endpoint.address);
                }
                (EndpointKind::Interrupt, true) => {
                    interrupt_in.get_or_insert(endpoint.address);
                }
                _ => {}
            }
        }
    }

    match (bulk_in, bulk_out, interrupt_in) {
        (Some(bulk_in), Some(bulk_out), Some(interrupt_in)) => Ok(Pipes {
            bulk_in,
            bulk_out,
            interrupt_in,
        }),
        _ => Err(Error::ConfigurationMismatch(
            "configuration lacks bulk-in, bulk-out, or interrupt-in endpoint",
        )),
    }
}

/// Handle for issuing USB operations from the dispatch side
#[derive(Clone)]
pub struct TransferBridge {
    cmd_tx: async_channel::Sender<BusCommand>,
}

impl TransferBridge {
    pub fn new(cmd_tx: async_channel::Sender<BusCommand>) -> Self {
        TransferBridge { cmd_tx }
    }

    /// Submit one transfer and wait for its completion
    pub async fn submit(&self, transfer: TransferKind) -> Result<TransferCompleted> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(BusCommand::Submit { transfer, response })
            .await
            .map_err(|_| Error::NoSuchDevice)?;
        let outcome = rx.await.map_err(|_| Error::NoSuchDevice)?;
        outcome.map_err(Error::from)
    }

    /// Fetch a standard descriptor of the caller-specified size
    ///
    /// On success the returned buffer holds exactly the bytes the device
    /// produced; on any failure the caller sees only the error, never a
    /// partial buffer.
    pub async fn get_descriptor(&self, kind: DescriptorKind, len: usize) -> Result<Vec<u8>> {
        let done = self
            .submit(TransferKind::ControlIn {
                request_type: REQUEST_TYPE_STANDARD_IN,
                request: REQUEST_GET_DESCRIPTOR,
                value: (kind.type_code() as u16) << 8,
                index: 0,
                len,
            })
            .await
            .inspect_err(|e| warn!("GET_DESCRIPTOR {:?} failed: {}", kind, e))?;
        Ok(done.data)
    }

    /// Single-byte vendor register read used during bring-up
    pub async fn vendor_read(&self, value: u16, index: u16) -> Result<u8> {
        let done = self
            .submit(TransferKind::ControlIn {
                request_type: REQUEST_TYPE_VENDOR_IN,
                request: REQUEST_VENDOR,
                value,
                index,
                len: 1,
            })
            .await?;
        Ok(done.data.first().copied().unwrap_or(0))
    }

    /// Zero-byte vendor register write used during bring-up
    pub async fn vendor_write(&self, value: u16, index: u16) -> Result<()> {
        self.submit(TransferKind::ControlOut {
            request_type: REQUEST_TYPE_VENDOR_OUT,
            request: REQUEST_VENDOR,
            value,
            index,
            data: Vec::new(),
        })
        .await?;
        Ok(())
    }

    /// Read the device's configuration layout
    pub async fn get_configuration(&self) -> Result<ConfigurationInfo> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(BusCommand::GetConfiguration { response })
            .await
            .map_err(|_| Error::NoSuchDevice)?;
        let info = rx.await.map_err(|_| Error::NoSuchDevice)?;
        info.map_err(Error::from)
    }

    /// Select the configuration and resolve the three pipe roles
    pub async fn configure(&self, config: &ConfigurationInfo) -> Result<Pipes> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(BusCommand::SelectConfiguration {
                value: Some(config.value),
                response,
            })
            .await
            .map_err(|_| Error::NoSuchDevice)?;
        rx.await.map_err(|_| Error::NoSuchDevice)?.map_err(Error::from)?;

        let pipes = resolve_pipes(config)?;
        debug!(
            "Configured: bulk-in {:#04x}, bulk-out {:#04x}, interrupt-in {:#04x}",
            pipes.bulk_in, pipes.bulk_out, pipes.interrupt_in
        );
        Ok(pipes)
    }

    /// Select the null configuration, releasing the pipes
    pub async fn unconfigure(&self) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(BusCommand::SelectConfiguration {
                value: None,
                response,
            })
            .await
            .map_err(|_| Error::NoSuchDevice)?;
        rx.await.map_err(|_| Error::NoSuchDevice)?.map_err(Error::from)
    }

    /// Push the line-coding structure (baud, stop bits, parity, word length)
    pub async fn set_line(&self, baud: BaudRate, line: LineControl) -> Result<()> {
        let mut coding = [0u8; LINE_CODING_SIZE];
        coding[..4].copy_from_slice(&baud.0.to_le_bytes());
        coding[4] = line.stop_bits as u8;
        coding[5] = line.parity as u8;
        coding[6] = line.word_length;

        debug!(
            "SET_LINE: {} baud, {:?}/{:?}/{} bits",
            baud.0, line.stop_bits, line.parity, line.word_length
        );
        self.submit(TransferKind::ControlOut {
            request_type: REQUEST_TYPE_CLASS_OUT,
            request: REQUEST_SET_LINE,
            value: 0,
            index: 0,
            data: coding.to_vec(),
        })
        .await?;
        Ok(())
    }

    /// Push the 2-bit DTR/RTS mask
    pub async fn set_control_lines(&self, lines: DtrRts) -> Result<()> {
        debug!("SET_CONTROL: mask {:#04x}", lines.bits());
        self.submit(TransferKind::ControlOut {
            request_type: REQUEST_TYPE_CLASS_OUT,
            request: REQUEST_SET_CONTROL,
            value: lines.bits() as u16,
            index: 0,
            data: Vec::new(),
        })
        .await?;
        Ok(())
    }

    /// Start a bulk-in transfer and return immediately; the continuation
    /// completes `request` with the received bytes
    pub fn read_async(&self, request: IoRequest, endpoint: u8, len: usize) {
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let (response, rx) = oneshot::channel();
            let submit = cmd_tx
                .send(BusCommand::Submit {
                    transfer: TransferKind::BulkIn { endpoint, len },
                    response,
                })
                .await;
            if submit.is_err() {
                request.complete(Err(Error::NoSuchDevice));
                return;
            }
            match rx.await {
                Ok(Ok(done)) => request.complete(Ok(IoCompleted::with_data(done.data))),
                Ok(Err(e)) => request.complete(Err(Error::from(e))),
                Err(_) => request.complete(Err(Error::NoSuchDevice)),
            }
        });
    }

    /// Start a bulk-out transfer and return immediately; the continuation
    /// completes `request` with the transmitted byte count
    pub fn write_async(&self, request: IoRequest, endpoint: u8, data: Vec<u8>) {
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let (response, rx) = oneshot::channel();
            let submit = cmd_tx
                .send(BusCommand::Submit {
                    transfer: TransferKind::BulkOut { endpoint, data },
                    response,
                })
                .await;
            if submit.is_err() {
                request.complete(Err(Error::NoSuchDevice));
                return;
            }
            match rx.await {
                Ok(Ok(done)) => request.complete(Ok(IoCompleted {
                    information: done.length,
                    data: Vec::new(),
                })),
                Ok(Err(e)) => request.complete(Err(Error::from(e))),
                Err(_) => request.complete(Err(Error::NoSuchDevice)),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{EndpointInfo, InterfaceInfo};

    fn endpoint(address: u8, kind: EndpointKind) -> EndpointInfo {
        EndpointInfo {
            address,
            kind,
            max_packet_size: 64,
        }
    }

    fn config(endpoints: Vec<EndpointInfo>) -> ConfigurationInfo {
        ConfigurationInfo {
            value: 1,
            interfaces: vec![InterfaceInfo {
                number: 0,
                endpoints,
            }],
        }
    }

    #[test]
    fn test_resolve_pipes_picks_first_of_each_role() {
        let info = config(vec![
            endpoint(0x81, EndpointKind::Interrupt),
            endpoint(0x83, EndpointKind::Bulk),
            endpoint(0x84, EndpointKind::Bulk),
            endpoint(0x02, EndpointKind::Bulk),
        ]);
        let pipes = resolve_pipes(&info).unwrap();
        assert_eq!(
            pipes,
            Pipes {
                bulk_in: 0x83,
                bulk_out: 0x02,
                interrupt_in: 0x81
            }
        );
    }

    #[test]
    fn test_resolve_pipes_requires_all_three_roles() {
        let info = config(vec![
            endpoint(0x83, EndpointKind::Bulk),
            endpoint(0x02, EndpointKind::Bulk),
        ]);
        assert!(matches!(
            resolve_pipes(&info),
            Err(Error::ConfigurationMismatch(_))
        ));
    }

    #[test]
    fn test_resolve_pipes_ignores_wrong_kinds() {
        let info = config(vec![
            endpoint(0x81, EndpointKind::Isochronous),
            endpoint(0x83, EndpointKind::Bulk),
            endpoint(0x02, EndpointKind::Bulk),
        ]);
        assert!(resolve_pipes(&info).is_err());
    }
}
