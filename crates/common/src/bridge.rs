//! Async channel bridge between the dispatch side and the bus worker thread
//!
//! The dispatch side runs on the Tokio runtime; the bus worker is a dedicated
//! blocking thread that owns the device handle. Commands flow down a bounded
//! channel and each carries a oneshot sender for its response, so a caller
//! that awaits the response gets synchronous semantics while the channel
//! itself never blocks the submitting task beyond backpressure.

use crate::usb::{ConfigurationInfo, TransferCompleted, TransferKind, UsbError};
use async_channel::{Receiver, Sender, bounded};

/// Commands from the dispatch side to the bus worker
#[derive(Debug)]
pub enum BusCommand {
    /// Execute one USB transfer
    Submit {
        transfer: TransferKind,
        response: tokio::sync::oneshot::Sender<Result<TransferCompleted, UsbError>>,
    },

    /// Read the device's configuration layout
    GetConfiguration {
        response: tokio::sync::oneshot::Sender<Result<ConfigurationInfo, UsbError>>,
    },

    /// Select a configuration; `None` selects the null configuration
    SelectConfiguration {
        value: Option<u8>,
        response: tokio::sync::oneshot::Sender<Result<(), UsbError>>,
    },

    /// Shut the bus worker down gracefully
    Shutdown,
}

/// Events from the bus worker back to whoever owns the device lifecycle
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// The device dropped off the bus mid-operation
    DeviceGone,
}

/// Handle for the async dispatch side
#[derive(Clone)]
pub struct BusBridge {
    cmd_tx: Sender<BusCommand>,
    event_rx: Receiver<BusEvent>,
}

impl BusBridge {
    /// Send a command to the bus worker
    pub async fn send_command(&self, cmd: BusCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the bus worker
    pub async fn recv_event(&self) -> crate::Result<BusEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// A clonable sender for components that submit transfers on their own
    pub fn command_sender(&self) -> Sender<BusCommand> {
        self.cmd_tx.clone()
    }
}

/// Handle for the blocking bus worker thread
pub struct BusWorker {
    cmd_rx: Receiver<BusCommand>,
    event_tx: Sender<BusEvent>,
}

impl BusWorker {
    /// Receive the next command, blocking until one arrives or all senders drop
    pub fn recv_command(&self) -> crate::Result<BusCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Send an event back to the lifecycle owner (blocking)
    pub fn send_event(&self, event: BusEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel pair between the dispatch side and the bus worker
pub fn create_bus_bridge() -> (BusBridge, BusWorker) {
    let (cmd_tx, cmd_rx) = bounded(256);
    let (event_tx, event_rx) = bounded(256);

    (
        BusBridge { cmd_tx, event_rx },
        BusWorker { cmd_rx, event_tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_reaches_worker() {
        let (bridge, worker) = create_bus_bridge();

        let handle = std::thread::spawn(move || {
            let cmd = worker.recv_command().unwrap();
            matches!(cmd, BusCommand::Shutdown)
        });

        bridge.send_command(BusCommand::Shutdown).await.unwrap();
        assert!(handle.join().unwrap());
    }

    #[tokio::test]
    async fn test_event_reaches_bridge() {
        let (bridge, worker) = create_bus_bridge();

        std::thread::spawn(move || {
            worker.send_event(BusEvent::DeviceGone).unwrap();
        });

        let event = bridge.recv_event().await.unwrap();
        assert!(matches!(event, BusEvent::DeviceGone));
    }
}
