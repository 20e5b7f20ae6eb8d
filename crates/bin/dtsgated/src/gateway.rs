//! Device manager wiring: lifecycle handlers, output consumers and
//! alarm routing to relay boards.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dtsgate_adapter_relay_http::{RelayConfig, RelayDevice, RelayError};
use dtsgate_adapter_simulated::SimulatedSdk;
use dtsgate_app::controller::{DtsConfig, DtsController, follow_connections};
use dtsgate_app::device_manager::{DeviceManager, ManagerConfig};
use dtsgate_app::ports::Device;
use dtsgate_domain::device::DeviceEventType;
use dtsgate_domain::id::JobId;
use dtsgate_domain::notification::ZonesAlarm;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::device::{Controller, GatewayDevice};

pub type Manager = DeviceManager<GatewayDevice>;

/// The running gateway: a device manager with its handlers installed.
pub struct Gateway {
    manager: Arc<Manager>,
}

impl Gateway {
    /// Create the manager and install the lifecycle handlers.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(config: &ManagerConfig) -> Self {
        let manager = Arc::new(DeviceManager::new(config));
        install_handlers(&manager);
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// Add every configured device, relay boards first.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Client`] when a relay HTTP client cannot be built.
    pub fn add_devices(&self, config: &Config) -> Result<(), RelayError> {
        for relay in &config.relay {
            self.add_relay(relay.clone())?;
        }
        for dts in &config.dts {
            self.add_dts(dts.clone(), SimulatedSdk::new(config.simulator_for(dts)));
        }
        Ok(())
    }

    /// Add a DTS controller backed by `sdk`; the `Add` handler starts it.
    pub fn add_dts(&self, config: DtsConfig, sdk: SimulatedSdk) -> Arc<GatewayDevice> {
        let controller = DtsController::new(config, Arc::new(sdk));
        self.manager.add(controller.into())
    }

    /// Add a relay board; the `Add` handler starts it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Client`] when the HTTP client cannot be built.
    pub fn add_relay(&self, config: RelayConfig) -> Result<Arc<GatewayDevice>, RelayError> {
        let relay = RelayDevice::new(config)?;
        Ok(self.manager.add(relay.into()))
    }

    /// Log the status of every device on the shared scheduler.
    pub fn report_status_every(&self, period: Duration) -> JobId {
        let weak = Arc::downgrade(&self.manager);
        self.manager
            .scheduler()
            .every("status report", period, move || {
                let weak = weak.clone();
                async move {
                    if let Some(manager) = weak.upgrade() {
                        log_status(&manager);
                    }
                }
            })
    }

    /// Close every device, then stop the manager and the scheduler.
    pub async fn shutdown(&self) {
        for device in self.manager.devices() {
            if let Err(err) = device.close().await {
                tracing::warn!(device = %device.id(), error = %err, "device did not close cleanly");
            }
        }
        self.manager.shutdown();
        tracing::info!("gateway stopped");
    }
}

fn install_handlers(manager: &Arc<Manager>) {
    let weak = Arc::downgrade(manager);

    let on_add = weak.clone();
    manager.register(DeviceEventType::Add, move |event| {
        start(on_add.clone(), event.device)
    });
    let on_run = weak.clone();
    manager.register(DeviceEventType::Run, move |event| {
        start(on_run.clone(), event.device)
    });
    manager.register(DeviceEventType::Update, move |event| {
        let manager = weak.clone();
        async move {
            if let Some(previous) = event.previous {
                stop(previous).await;
            }
            start(manager, event.device).await;
        }
    });
    manager.register(DeviceEventType::Close, |event| stop(event.device));
    manager.register(DeviceEventType::Delete, |event| stop(event.device));
    manager.register(DeviceEventType::Error, |event| async move {
        tracing::error!(
            device = %event.device.id(),
            detail = event.detail.as_deref().unwrap_or_default(),
            "device reported an error"
        );
    });
}

async fn start(manager: Weak<Manager>, device: Arc<GatewayDevice>) {
    if let Some(controller) = device.as_dts() {
        spawn_consumers(controller, &manager);
        if let Some(statuses) = controller.take_status_receiver() {
            tokio::spawn(follow_connections(controller.clone(), statuses));
        }
    }
    match device.run().await {
        Ok(()) => tracing::info!(device = %device.id(), kind = %device.kind(), "device started"),
        Err(err) => {
            tracing::warn!(device = %device.id(), error = %err, "device failed to start");
            if let Some(manager) = manager.upgrade() {
                if let Err(err) = manager.report_error(device.id(), err.to_string()) {
                    tracing::debug!(error = %err, "error not reported");
                }
            }
        }
    }
}

async fn stop(device: Arc<GatewayDevice>) {
    match device.close().await {
        Ok(()) => tracing::info!(device = %device.id(), "device closed"),
        Err(err) => tracing::warn!(device = %device.id(), error = %err, "device did not close cleanly"),
    }
}

fn spawn_consumers(controller: &Controller, manager: &Weak<Manager>) {
    if let Some(alarms) = controller.take_alarm_receiver() {
        tokio::spawn(consume_alarms(alarms, manager.clone()));
    }
    if let Some(temperatures) = controller.take_temperature_receiver() {
        tokio::spawn(consume("temperature", temperatures));
    }
    if let Some(signals) = controller.take_signal_receiver() {
        tokio::spawn(consume("signal", signals));
    }
    if let Some(events) = controller.take_event_receiver() {
        tokio::spawn(consume("event", events));
    }
}

async fn consume<T: Serialize>(kind: &'static str, mut records: mpsc::Receiver<T>) {
    while let Some(record) = records.recv().await {
        log_record(kind, &record);
    }
    tracing::debug!(kind, "output closed");
}

async fn consume_alarms(mut alarms: mpsc::Receiver<ZonesAlarm>, manager: Weak<Manager>) {
    while let Some(alarm) = alarms.recv().await {
        log_record("alarm", &alarm);
        if let Some(manager) = manager.upgrade() {
            route_alarm(&manager, &alarm);
        }
    }
    tracing::debug!(kind = "alarm", "output closed");
}

/// Switch on the relay outputs mapped to every zone in alarm.
///
/// Zones whose state is only a warning, or that carry no relay mapping,
/// are left alone. Returns the number of zones routed to a relay board.
pub fn route_alarm(manager: &Manager, alarm: &ZonesAlarm) -> usize {
    let mut routed = 0;
    for zone in &alarm.zones {
        let (Some(relay), Some(snapshot)) = (&zone.relay, &zone.alarm) else {
            continue;
        };
        if !snapshot.state.is_alarm() {
            continue;
        }
        let id = format!("relay-{}", relay.group);
        let Some(board) = manager.get(&id).and_then(|device| device.as_relay().cloned()) else {
            tracing::debug!(zone_id = %zone.id, relay = %id, "no relay board for zone");
            continue;
        };
        let outputs = relay.outputs.clone();
        tokio::spawn(async move {
            board.alarms(&outputs).await;
        });
        routed += 1;
    }
    routed
}

fn log_record<T: Serialize>(kind: &str, record: &T) {
    match serde_json::to_string(record) {
        Ok(json) => tracing::info!(kind, record = %json, "output"),
        Err(err) => tracing::warn!(kind, error = %err, "output record not serializable"),
    }
}

fn log_status(manager: &Manager) {
    let mut rows = manager.status();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    match serde_json::to_string(&rows) {
        Ok(json) => tracing::info!(devices = rows.len(), status = %json, "device status"),
        Err(err) => tracing::warn!(error = %err, "device status not serializable"),
    }
}
