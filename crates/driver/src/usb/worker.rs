//! Bus worker thread
//!
//! A dedicated blocking thread owns the device handle and executes transfers
//! one at a time, which is exactly the single-in-flight model the serial core
//! needs. Commands arrive over the bridge channel; each carries its response
//! slot. When the backend reports the device gone, a `DeviceGone` event is
//! emitted so the lifecycle owner can raise a surprise removal.

use common::{
    BusCommand, BusEvent, BusWorker, ConfigurationInfo, TransferCompleted, TransferKind,
    UsbError,
};
use tracing::{debug, info, warn};

/// Backend that actually executes transfers against a device
///
/// Implemented by the rusb backend in production and by scripted fakes in
/// tests.
pub trait TransferExecutor: Send {
    fn execute(&mut self, transfer: TransferKind) -> Result<TransferCompleted, UsbError>;
    fn configuration(&mut self) -> Result<ConfigurationInfo, UsbError>;
    fn select_configuration(&mut self, value: Option<u8>) -> Result<(), UsbError>;
}

/// The bus worker loop around one executor
pub struct BusWorkerThread<E: TransferExecutor> {
    executor: E,
    worker: BusWorker,
    device_gone: bool,
}

impl<E: TransferExecutor> BusWorkerThread<E> {
    pub fn new(executor: E, worker: BusWorker) -> Self {
        BusWorkerThread {
            executor,
            worker,
            device_gone: false,
        }
    }

    /// Run until a shutdown command arrives or all command senders drop
    pub fn run(mut self) {
        info!("Bus worker thread started");

        while let Ok(cmd) = self.worker.recv_command() {
            match cmd {
                BusCommand::Submit { transfer, response } => {
                    let outcome = self.executor.execute(transfer);
                    // One event per disappearance. Repeating it for every
                    // failing transfer could fill the bounded event channel
                    // once nobody is listening, wedging the worker before it
                    // sees Shutdown.
                    if let Err(UsbError::NoDevice) = &outcome {
                        if !self.device_gone {
                            self.device_gone = true;
                            warn!("Device gone during transfer");
                            let _ = self.worker.send_event(BusEvent::DeviceGone);
                        }
                    }
                    let _ = response.send(outcome);
                }
                BusCommand::GetConfiguration { response } => {
                    let _ = response.send(self.executor.configuration());
                }
                BusCommand::SelectConfiguration { value, response } => {
                    debug!("Selecting configuration {:?}", value);
                    let _ = response.send(self.executor.select_configuration(value));
                }
                BusCommand::Shutdown => {
                    info!("Bus worker shutting down");
                    break;
                }
            }
        }

        info!("Bus worker thread stopped");
    }
}

/// Spawn the bus worker on its own OS thread
pub fn spawn_bus_worker<E: TransferExecutor + 'static>(
    executor: E,
    worker: BusWorker,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("bus-worker".to_string())
        .spawn(move || BusWorkerThread::new(executor, worker).run())
        .expect("Failed to spawn bus worker thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::create_bus_bridge;

    struct EchoExecutor;

    impl TransferExecutor for EchoExecutor {
        fn execute(&mut self, transfer: TransferKind) -> Result<TransferCompleted, UsbError> {
            match transfer {
                TransferKind::BulkIn { len, .. } => {
                    Ok(TransferCompleted::received(vec![0xAB; len]))
                }
                TransferKind::BulkOut { data, .. } => Ok(TransferCompleted::sent(data.len())),
                _ => Ok(TransferCompleted::default()),
            }
        }

        fn configuration(&mut self) -> Result<ConfigurationInfo, UsbError> {
            Err(UsbError::NotFound)
        }

        fn select_configuration(&mut self, _value: Option<u8>) -> Result<(), UsbError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let (bridge, worker) = create_bus_bridge();
        let handle = spawn_bus_worker(EchoExecutor, worker);

        let (response, rx) = tokio::sync::oneshot::channel();
        bridge
            .send_command(BusCommand::Submit {
                transfer: TransferKind::BulkIn {
                    endpoint: 0x83,
                    len: 4,
                },
                response,
            })
            .await
            .unwrap();
        let done = rx.await.unwrap().unwrap();
        assert_eq!(done.data, vec![0xAB; 4]);

        bridge.send_command(BusCommand::Shutdown).await.unwrap();
        handle.join().unwrap();
    }

    struct GoneExecutor;

    impl TransferExecutor for GoneExecutor {
        fn execute(&mut self, _transfer: TransferKind) -> Result<TransferCompleted, UsbError> {
            Err(UsbError::NoDevice)
        }

        fn configuration(&mut self) -> Result<ConfigurationInfo, UsbError> {
            Err(UsbError::NoDevice)
        }

        fn select_configuration(&mut self, _value: Option<u8>) -> Result<(), UsbError> {
            Err(UsbError::NoDevice)
        }
    }

    #[tokio::test]
    async fn test_device_gone_emitted_once_and_worker_stays_responsive() {
        let (bridge, worker) = create_bus_bridge();
        let handle = spawn_bus_worker(GoneExecutor, worker);

        // More failing transfers than the event channel can hold, with
        // nobody draining events. The worker must keep answering and still
        // honor Shutdown afterwards.
        for _ in 0..300 {
            let (response, rx) = tokio::sync::oneshot::channel();
            bridge
                .send_command(BusCommand::Submit {
                    transfer: TransferKind::BulkIn {
                        endpoint: 0x83,
                        len: 1,
                    },
                    response,
                })
                .await
                .unwrap();
            assert!(matches!(rx.await.unwrap(), Err(UsbError::NoDevice)));
        }

        bridge.send_command(BusCommand::Shutdown).await.unwrap();
        handle.join().unwrap();

        // Exactly one event was queued; the next receive finds the channel
        // closed by the worker's exit.
        assert!(matches!(
            bridge.recv_event().await,
            Ok(BusEvent::DeviceGone)
        ));
        assert!(bridge.recv_event().await.is_err());
    }
}
