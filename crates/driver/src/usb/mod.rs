//! USB subsystem
//!
//! The transfer bridge turns logical serial operations into bus commands;
//! the worker thread executes them against a [`TransferExecutor`] backend
//! (rusb in production, a scripted fake in tests). Pipe handles are resolved
//! once at configuration time and are read-only thereafter.

pub mod bridge;
pub mod pl2303;
pub mod rusb_backend;
pub mod worker;

pub use bridge::{Pipes, TransferBridge};
pub use pl2303::ChipVariant;
pub use worker::{BusWorkerThread, TransferExecutor, spawn_bus_worker};
