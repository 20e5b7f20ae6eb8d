//! DTS controller: owns the connection to one physical DTS host.
//!
//! ## Lifecycle
//! 1. [`run`](DtsController::run) opens the SDK handle; the SDK reports the
//!    outcome through connection hooks that drive the [`Status`] machine.
//! 2. Once `Connected` is observed on the status channel, the caller runs
//!    [`sync_zones`](DtsController::sync_zones) then
//!    [`register`](DtsController::register) (see [`follow_connections`]).
//! 3. Subscribed notifications go through dedup, screening and zone
//!    resolution, then onto the per-kind output channels.
//! 4. [`close`](DtsController::close) cancels everything and closes the
//!    output channels after a grace delay.
//!
//! A closed controller cannot be run again; build a new one instead.

mod config;
mod lifecycle;
mod pipeline;
mod registration;
mod zones;

#[cfg(test)]
mod fake;

use std::collections::HashMap;
use std::future::{self, Future};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use dtsgate_domain::device::{DeviceKind, Status};
use dtsgate_domain::error::GatewayError;
use dtsgate_domain::id::{JobId, ZoneId};
use dtsgate_domain::notification::{ChannelEvent, ChannelSignal, ZonesAlarm, ZonesTemp};
use dtsgate_domain::state::AlarmState;
use dtsgate_domain::zone::Zone;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use config::DtsConfig;
pub use lifecycle::follow_connections;

use crate::dedup::DedupWindow;
use crate::outlet::Outlet;
use crate::ports::{Device, DtsSdk};
use crate::scheduler::Scheduler;

pub const ALARM_CAPACITY: usize = 10;
pub const TEMPERATURE_CAPACITY: usize = 30;
pub const SIGNAL_CAPACITY: usize = 30;
pub const EVENT_CAPACITY: usize = 10;
pub const STATUS_CAPACITY: usize = 10;

/// Handle to one DTS host. Cloning shares the same controller.
pub struct DtsController<S: DtsSdk> {
    inner: Arc<Inner<S>>,
}

impl<S: DtsSdk> Clone for DtsController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S: DtsSdk> {
    id: String,
    config: DtsConfig,
    sdk: Arc<S>,
    state: Mutex<State>,
    client: Mutex<Option<Arc<S::Client>>>,
    windows: Windows,
    outlets: Outlets,
    cancel: CancellationToken,
    scheduler: Mutex<Option<Scheduler>>,
    resync_job: Mutex<Option<JobId>>,
    destroyed: AtomicBool,
}

#[derive(Default)]
struct State {
    status: Status,
    zones: HashMap<ZoneId, Zone>,
}

struct Windows {
    /// Keyed by `<device>-<zone id>`, remembers the alarm state.
    alarm: DedupWindow<AlarmState>,
    /// Keyed by device id.
    temperature: DedupWindow,
    /// Keyed by `<device>-<channel>`.
    signal: DedupWindow,
}

struct Outlets {
    alarm: Outlet<ZonesAlarm>,
    temperature: Outlet<ZonesTemp>,
    signal: Outlet<ChannelSignal>,
    event: Outlet<ChannelEvent>,
    status: Outlet<Status>,
}

impl<S: DtsSdk> DtsController<S> {
    #[must_use]
    pub fn new(config: DtsConfig, sdk: Arc<S>) -> Self {
        let windows = Windows {
            alarm: DedupWindow::new(config.alarm_window()),
            temperature: DedupWindow::new(config.temperature_window()),
            signal: DedupWindow::new(config.signal_window()),
        };
        let outlets = Outlets {
            alarm: Outlet::new("alarm", ALARM_CAPACITY),
            temperature: Outlet::new("temperature", TEMPERATURE_CAPACITY),
            signal: Outlet::new("signal", SIGNAL_CAPACITY),
            event: Outlet::new("event", EVENT_CAPACITY),
            status: Outlet::new("status", STATUS_CAPACITY),
        };
        Self {
            inner: Arc::new(Inner {
                id: config.device_key(),
                config,
                sdk,
                state: Mutex::new(State::default()),
                client: Mutex::new(None),
                windows,
                outlets,
                cancel: CancellationToken::new(),
                scheduler: Mutex::new(None),
                resync_job: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Manager key, `dts-<host>`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn config(&self) -> &DtsConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.state.lock().status
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Copy of one zone, with its latest snapshots.
    #[must_use]
    pub fn zone(&self, id: ZoneId) -> Option<Zone> {
        self.inner.state.lock().zones.get(&id).cloned()
    }

    /// Copy of every known zone, ordered by id.
    #[must_use]
    pub fn zones(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self.inner.state.lock().zones.values().cloned().collect();
        zones.sort_by_key(|zone| zone.id);
        zones
    }

    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.inner.state.lock().zones.len()
    }

    /// Alarm batches. Only the first call gets the receiver.
    pub fn take_alarm_receiver(&self) -> Option<mpsc::Receiver<ZonesAlarm>> {
        self.inner.outlets.alarm.take_receiver()
    }

    /// Temperature snapshots. Only the first call gets the receiver.
    pub fn take_temperature_receiver(&self) -> Option<mpsc::Receiver<ZonesTemp>> {
        self.inner.outlets.temperature.take_receiver()
    }

    /// Channel signal traces. Only the first call gets the receiver.
    pub fn take_signal_receiver(&self) -> Option<mpsc::Receiver<ChannelSignal>> {
        self.inner.outlets.signal.take_receiver()
    }

    /// Fiber events. Only the first call gets the receiver.
    pub fn take_event_receiver(&self) -> Option<mpsc::Receiver<ChannelEvent>> {
        self.inner.outlets.event.take_receiver()
    }

    /// Status changes, best effort. Only the first call gets the receiver.
    pub fn take_status_receiver(&self) -> Option<mpsc::Receiver<Status>> {
        self.inner.outlets.status.take_receiver()
    }

    /// Hand the controller the scheduler used for zone re-sync.
    pub fn set_scheduler(&self, scheduler: Scheduler) {
        *self.inner.scheduler.lock() = Some(scheduler);
    }
}

impl<S: DtsSdk> Device for DtsController<S> {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Dts
    }

    fn status(&self) -> Status {
        Self::status(self)
    }

    fn run(&self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        future::ready(Self::run(self))
    }

    fn close(&self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        Self::close(self);
        future::ready(Ok(()))
    }

    fn set_scheduler(&self, scheduler: Scheduler) {
        Self::set_scheduler(self, scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeSdk;
    use super::*;

    #[test]
    fn should_start_unconnected_without_zones() {
        let controller = DtsController::new(DtsConfig::default(), Arc::new(FakeSdk::default()));
        assert_eq!(controller.status(), Status::Unconnected);
        assert_eq!(controller.zone_count(), 0);
        assert_eq!(controller.id(), "dts-127.0.0.1");
        assert_eq!(Device::kind(&controller), DeviceKind::Dts);
    }

    #[test]
    fn should_hand_out_each_receiver_once() {
        let controller = DtsController::new(DtsConfig::default(), Arc::new(FakeSdk::default()));
        assert!(controller.take_alarm_receiver().is_some());
        assert!(controller.take_alarm_receiver().is_none());
        assert!(controller.take_temperature_receiver().is_some());
        assert!(controller.take_signal_receiver().is_some());
        assert!(controller.take_event_receiver().is_some());
        assert!(controller.take_status_receiver().is_some());
        assert!(controller.take_status_receiver().is_none());
    }

    #[tokio::test]
    async fn should_report_snapshot_through_device_trait() {
        let sdk = Arc::new(FakeSdk::default());
        let controller = DtsController::new(DtsConfig::default(), Arc::clone(&sdk));

        Device::run(&controller).await.unwrap();
        sdk.connected();

        let row = controller.snapshot();
        assert_eq!(row.id, "dts-127.0.0.1");
        assert_eq!(row.status, Status::Connected);
    }
}
