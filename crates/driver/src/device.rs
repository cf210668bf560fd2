//! Per-device context
//!
//! One `DeviceContext` exists per attached adapter. It owns the lifecycle
//! state pair, the line-state store, the pending queue, and the resolved pipe
//! handles, and holds the boundary collaborators (lower stack, power manager,
//! link publisher) for the device's lifetime. Pipe handles are written once
//! by a successful configuration and cleared at removal; identity strings are
//! allocated at attach and released at removal.

use crate::config::NamingSettings;
use crate::line::{LineState, LineStateStore};
use crate::naming::{self, LinkPublisher};
use crate::pnp::{Lifecycle, PnpState};
use crate::queue::PendingQueue;
use crate::stack::{LowerStack, PowerManager};
use crate::usb::bridge::{Pipes, TransferBridge};
use crate::usb::pl2303::{self, ChipVariant, DEVICE_DESCRIPTOR_SIZE};
use common::{DescriptorKind, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Identity strings owned by the device context
#[derive(Debug, Clone)]
pub struct PortNames {
    /// Internal device name, unique per attached port
    pub device_name: String,
    /// COM-port name; `None` when external naming is suppressed
    pub com_port: Option<String>,
    /// Interface link returned by the publisher at attach time
    pub interface_link: String,
}

pub struct DeviceContext {
    bridge: TransferBridge,
    lower: Arc<dyn LowerStack>,
    power: Arc<dyn PowerManager>,
    publisher: Arc<dyn LinkPublisher>,
    lifecycle: Mutex<Lifecycle>,
    line: LineStateStore,
    queue: PendingQueue,
    pipes: Mutex<Option<Pipes>>,
    chip: Mutex<Option<ChipVariant>>,
    names: Mutex<Option<PortNames>>,
}

impl DeviceContext {
    /// Attach a new device: claim a port number, register the interface, and
    /// build the context in the NotStarted state
    pub fn add(
        bridge: TransferBridge,
        lower: Arc<dyn LowerStack>,
        power: Arc<dyn PowerManager>,
        publisher: Arc<dyn LinkPublisher>,
        naming: &NamingSettings,
    ) -> Result<Arc<Self>> {
        let port_number = naming::allocate_port_number();
        let device_name = format!("pl2303-{port_number}");

        let interface_link = match publisher.register_interface(&device_name) {
            Ok(link) => link,
            Err(e) => {
                naming::release_port_number();
                return Err(e);
            }
        };

        let com_port = if naming.skip_external_naming {
            None
        } else {
            Some(
                naming
                    .port_name
                    .clone()
                    .unwrap_or_else(|| format!("COM{port_number}")),
            )
        };

        info!(
            "Attached {} (com port {:?}, {} active)",
            device_name,
            com_port,
            naming::active_port_count()
        );

        Ok(Arc::new(DeviceContext {
            bridge,
            lower,
            power,
            publisher,
            lifecycle: Mutex::new(Lifecycle::new()),
            line: LineStateStore::new(),
            queue: PendingQueue::new(),
            pipes: Mutex::new(None),
            chip: Mutex::new(None),
            names: Mutex::new(Some(PortNames {
                device_name,
                com_port,
                interface_link,
            })),
        }))
    }

    pub fn state(&self) -> PnpState {
        self.lifecycle.lock().unwrap().state()
    }

    pub(crate) fn lifecycle(&self) -> &Mutex<Lifecycle> {
        &self.lifecycle
    }

    pub(crate) fn bridge(&self) -> &TransferBridge {
        &self.bridge
    }

    pub(crate) fn lower(&self) -> &Arc<dyn LowerStack> {
        &self.lower
    }

    pub(crate) fn power(&self) -> &Arc<dyn PowerManager> {
        &self.power
    }

    pub fn line(&self) -> &LineStateStore {
        &self.line
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Resolved pipes, present only after a successful configuration
    pub fn pipes(&self) -> Option<Pipes> {
        *self.pipes.lock().unwrap()
    }

    pub fn chip(&self) -> Option<ChipVariant> {
        *self.chip.lock().unwrap()
    }

    pub fn names(&self) -> Option<PortNames> {
        self.names.lock().unwrap().clone()
    }

    /// Device bring-up, run during StartDevice after the lower stack accepted
    /// the start: descriptor enumeration, configuration, vendor init, initial
    /// line push, then naming publication. Any failing step aborts the whole
    /// bring-up; no partial pipe set survives.
    pub(crate) async fn start_device(&self) -> Result<()> {
        let descriptor = self
            .bridge
            .get_descriptor(DescriptorKind::Device, DEVICE_DESCRIPTOR_SIZE)
            .await?;
        let variant = ChipVariant::detect(&descriptor)?;

        let config = self.bridge.get_configuration().await?;
        let pipes = self.bridge.configure(&config).await?;

        pl2303::run_init_sequence(&self.bridge, variant).await?;

        let LineState { baud, line_control, .. } = self.line.snapshot();
        self.bridge.set_line(baud, line_control).await?;

        self.publish_naming()?;

        *self.pipes.lock().unwrap() = Some(pipes);
        *self.chip.lock().unwrap() = Some(variant);
        Ok(())
    }

    /// Enable the device interface and create the COM symlink (unless naming
    /// was suppressed)
    fn publish_naming(&self) -> Result<()> {
        let Some(names) = self.names() else {
            return Ok(());
        };
        self.publisher
            .set_interface_state(&names.interface_link, true)?;
        if let Some(com_port) = &names.com_port {
            self.publisher
                .create_symbolic_link(com_port, &names.device_name)?;
        }
        Ok(())
    }

    /// Disable the interface and drop the COM symlink, tolerating failures
    pub(crate) fn unpublish_naming(&self) {
        let Some(names) = self.names() else {
            return;
        };
        if let Err(e) = self
            .publisher
            .set_interface_state(&names.interface_link, false)
        {
            warn!("Failed to disable interface {}: {}", names.interface_link, e);
        }
        if let Some(com_port) = &names.com_port {
            if let Err(e) = self.publisher.delete_symbolic_link(com_port) {
                warn!("Failed to delete symbolic link {}: {}", com_port, e);
            }
        }
    }

    /// Final resource release during RemoveDevice
    pub(crate) fn release_resources(&self) {
        self.queue.cancel_all();
        *self.pipes.lock().unwrap() = None;
        *self.chip.lock().unwrap() = None;
        if let Some(names) = self.names.lock().unwrap().take() {
            debug!("Releasing {}", names.device_name);
            naming::release_port_number();
        }
    }
}
