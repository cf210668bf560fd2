//! pl2303d
//!
//! User-space driver daemon for Prolific PL2303 USB-serial adapters. Opens
//! the adapter, runs it through device start, and keeps it published as a
//! virtual serial port until the device disappears or the daemon is asked
//! to stop.

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use common::{BusCommand, BusEvent, create_bus_bridge, setup_logging};
use driver::config::DriverConfig;
use driver::naming::FsLinkPublisher;
use driver::pnp::PnpMinor;
use driver::stack::{BusLowerStack, NoopPowerManager};
use driver::usb::bridge::TransferBridge;
use driver::usb::rusb_backend::RusbExecutor;
use driver::usb::spawn_bus_worker;
use driver::{DeviceContext, IoRequest, Operation};
use rusb::UsbContext;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "pl2303d")]
#[command(author, version, about = "PL2303 USB-serial driver daemon")]
#[command(long_about = "
User-space driver for Prolific PL2303 USB-to-serial adapters.

EXAMPLES:
    # Run against the default adapter (067b:2303)
    pl2303d

    # Run with a custom config
    pl2303d --config /path/to/config.toml

    # List USB devices without starting the driver
    pl2303d --list-devices

    # Run with debug logging
    pl2303d --log-level debug

CONFIGURATION:
    The daemon looks for configuration in the following order:
    1. Path specified with --config
    2. /etc/pl2303d/config.toml
    3. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = DriverConfig::default();
        let path = DriverConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config =
        DriverConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("pl2303d v{}", env!("CARGO_PKG_VERSION"));

    let usb_context = rusb::Context::new().context("Failed to initialize USB context")?;

    if args.list_devices {
        return list_devices_mode(&usb_context);
    }

    let executor = RusbExecutor::open(
        &usb_context,
        config.device.vendor_id,
        config.device.product_id,
    )
    .map_err(|e| {
        anyhow!(
            "Failed to open device {:04x}:{:04x}: {}",
            config.device.vendor_id,
            config.device.product_id,
            e
        )
    })?;

    let (bus_bridge, worker) = create_bus_bridge();
    let worker_handle = spawn_bus_worker(executor, worker);

    let bridge = TransferBridge::new(bus_bridge.command_sender());
    let publisher = FsLinkPublisher::new(config.naming.link_dir.clone())
        .context("Failed to prepare link directory")?;

    let device = DeviceContext::add(
        bridge,
        Arc::new(BusLowerStack),
        Arc::new(NoopPowerManager),
        Arc::new(publisher),
        &config.naming,
    )
    .context("Failed to attach device")?;

    let result = run(&device, &bus_bridge).await;

    info!("Shutting down bus worker...");
    if let Err(e) = bus_bridge.send_command(BusCommand::Shutdown).await {
        error!("Error shutting down bus worker: {:#}", e);
    }
    if worker_handle.join().is_err() {
        error!("Bus worker thread panicked");
    }

    result
}

/// Start the device, then run until a shutdown signal or surprise removal
async fn run(device: &Arc<DeviceContext>, bus_bridge: &common::BusBridge) -> Result<()> {
    send_pnp(device, PnpMinor::StartDevice)
        .await
        .context("Device start failed")?;
    info!("Device started; serial port is live");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        event = bus_bridge.recv_event() => {
            match event {
                Ok(BusEvent::DeviceGone) => {
                    warn!("Device dropped off the bus");
                    if let Err(e) = send_pnp(device, PnpMinor::SurpriseRemoval).await {
                        warn!("Surprise removal handling failed: {:#}", e);
                    }
                }
                Err(e) => warn!("Bus event channel closed: {:#}", e),
            }
        }
    }

    send_pnp(device, PnpMinor::RemoveDevice)
        .await
        .context("Device removal failed")?;
    info!("Device removed");
    Ok(())
}

/// Dispatch one PnP request and wait for its completion
async fn send_pnp(device: &Arc<DeviceContext>, minor: PnpMinor) -> Result<()> {
    let (request, completion) = IoRequest::new(Operation::Pnp(minor));
    device.dispatch(request).await;
    completion
        .await
        .context("Request dropped without completion")??;
    Ok(())
}

/// List USB devices and exit
fn list_devices_mode(context: &rusb::Context) -> Result<()> {
    let devices = context.devices().context("Failed to enumerate USB bus")?;

    if devices.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("Found {} USB device(s):\n", devices.len());
    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                warn!("Skipping unreadable device: {}", e);
                continue;
            }
        };
        println!(
            "  Bus {:03} Device {:03}: {:04x}:{:04x}",
            device.bus_number(),
            device.address(),
            descriptor.vendor_id(),
            descriptor.product_id(),
        );
    }
    Ok(())
}
