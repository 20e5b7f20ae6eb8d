//! Device port: anything the device manager can hold, run and close.
//!
//! A device owns its hardware connection. The manager only drives the
//! lifecycle; everything a device produces flows out through its own
//! channels or side effects.

use std::future::Future;

use dtsgate_domain::device::{DeviceKind, DeviceStatus, Status};
use dtsgate_domain::error::GatewayError;

use crate::scheduler::Scheduler;

/// A managed device.
///
/// Implementations live in this crate (`DtsController`) and in adapter
/// crates (e.g. the HTTP relay board). The binary crate wraps them in a
/// closed enum so the manager can hold them side by side.
pub trait Device: Send + Sync + 'static {
    /// Stable identifier, unique within a manager (e.g. `dts-<host>`).
    fn id(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    /// Current connection status.
    fn status(&self) -> Status;

    /// Open the hardware connection and start background work.
    fn run(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Stop background work and release the hardware connection.
    fn close(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Hand the device the scheduler it must use for periodic jobs.
    fn set_scheduler(&self, scheduler: Scheduler);

    /// Status row for reporting.
    fn snapshot(&self) -> DeviceStatus {
        DeviceStatus {
            id: self.id().to_string(),
            kind: self.kind(),
            status: self.status(),
        }
    }
}
