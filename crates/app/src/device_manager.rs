//! Device manager: registry of running devices and their lifecycle bus.
//!
//! The manager only records intent. `add`, `run`, `close`… enqueue an
//! event; the handler registered for that event type decides what to do
//! with the device. Events are drained by one dispatcher task, in enqueue
//! order, and every handler invocation runs on its own task, so handlers
//! for different events may overlap.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use dtsgate_domain::device::{DeviceEventType, DeviceStatus};
use dtsgate_domain::error::{GatewayError, NotFoundError};
use dtsgate_domain::id::EventId;
use dtsgate_domain::time::{Timestamp, now};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::ports::Device;
use crate::scheduler::Scheduler;

/// Device manager settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Events buffered on the bus before new ones are dropped.
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { event_capacity: 30 }
    }
}

/// A lifecycle event, as seen by handlers.
#[derive(Debug)]
pub struct DeviceEvent<D> {
    pub id: EventId,
    pub kind: DeviceEventType,
    pub device: Arc<D>,
    /// Device replaced by an `Update`, if one was registered under the same id.
    pub previous: Option<Arc<D>>,
    /// Free-form context, set on `Error` events.
    pub detail: Option<String>,
    pub at: Timestamp,
}

type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Handler<D> = Arc<dyn Fn(DeviceEvent<D>) -> HandlerFuture + Send + Sync>;

/// Registry of heterogeneous devices plus the event bus driving them.
pub struct DeviceManager<D> {
    devices: DashMap<String, Arc<D>>,
    handlers: Arc<DashMap<DeviceEventType, Handler<D>>>,
    sender: mpsc::Sender<DeviceEvent<D>>,
    scheduler: Scheduler,
    cancel: CancellationToken,
}

impl<D: Device> DeviceManager<D> {
    /// Create a manager and start its dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(config: &ManagerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.event_capacity.max(1));
        let handlers = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();
        tokio::spawn(dispatch(receiver, Arc::clone(&handlers), cancel.clone()));
        Self {
            devices: DashMap::new(),
            handlers,
            sender,
            scheduler: Scheduler::new(),
            cancel,
        }
    }

    /// Install the handler for one event type, replacing any previous one.
    pub fn register<F, Fut>(&self, kind: DeviceEventType, handler: F)
    where
        F: Fn(DeviceEvent<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler<D> =
            Arc::new(move |event| -> HandlerFuture { Box::pin(handler(event)) });
        if self.handlers.insert(kind, handler).is_some() {
            tracing::debug!(%kind, "event handler replaced");
        }
    }

    /// Insert a device, overwriting any device with the same id, and emit `Add`.
    pub fn add(&self, device: D) -> Arc<D> {
        let device = Arc::new(device);
        device.set_scheduler(self.scheduler.clone());
        self.devices
            .insert(device.id().to_string(), Arc::clone(&device));
        self.emit(DeviceEventType::Add, Arc::clone(&device), None, None);
        device
    }

    /// [`add`](Self::add) several devices, one `Add` event each.
    pub fn adds(&self, devices: impl IntoIterator<Item = D>) {
        for device in devices {
            self.add(device);
        }
    }

    /// Replace the device registered under the same id and emit `Update`.
    pub fn update(&self, device: D) -> Arc<D> {
        let device = Arc::new(device);
        device.set_scheduler(self.scheduler.clone());
        let previous = self
            .devices
            .insert(device.id().to_string(), Arc::clone(&device));
        self.emit(DeviceEventType::Update, Arc::clone(&device), previous, None);
        device
    }

    /// Remove a device from the registry and emit `Delete`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when no device has this id.
    pub fn delete(&self, id: &str) -> Result<Arc<D>, GatewayError> {
        let (_, device) = self.devices.remove(id).ok_or_else(|| not_found(id))?;
        self.emit(DeviceEventType::Delete, Arc::clone(&device), None, None);
        Ok(device)
    }

    /// Emit `Close` for a registered device. The device stays registered.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when no device has this id.
    pub fn close(&self, id: &str) -> Result<(), GatewayError> {
        let device = self.get(id).ok_or_else(|| not_found(id))?;
        self.emit(DeviceEventType::Close, device, None, None);
        Ok(())
    }

    /// Emit `Run` for a registered device.
    ///
    /// The manager never calls [`Device::run`] itself; the `Run` handler does.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when no device has this id.
    pub fn run(&self, id: &str) -> Result<(), GatewayError> {
        let device = self.get(id).ok_or_else(|| not_found(id))?;
        self.emit(DeviceEventType::Run, device, None, None);
        Ok(())
    }

    /// Emit `Error` for a registered device.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when no device has this id.
    pub fn report_error(&self, id: &str, detail: impl Into<String>) -> Result<(), GatewayError> {
        let device = self.get(id).ok_or_else(|| not_found(id))?;
        self.emit(DeviceEventType::Error, device, None, Some(detail.into()));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<D>> {
        self.devices.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Every registered device, in no particular order.
    #[must_use]
    pub fn devices(&self) -> Vec<Arc<D>> {
        self.devices
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Point-in-time status of every registered device.
    #[must_use]
    pub fn status(&self) -> Vec<DeviceStatus> {
        self.devices
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The scheduler shared with every device.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Stop the dispatcher and every scheduled job. Devices are not closed.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.scheduler.shutdown();
    }

    fn emit(
        &self,
        kind: DeviceEventType,
        device: Arc<D>,
        previous: Option<Arc<D>>,
        detail: Option<String>,
    ) {
        let event = DeviceEvent {
            id: EventId::new(),
            kind,
            device,
            previous,
            detail,
            at: now(),
        };
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(%kind, device = event.device.id(), "event bus full, event dropped");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(%kind, device = event.device.id(), "event bus stopped, event dropped");
            }
        }
    }
}

fn not_found(id: &str) -> GatewayError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

async fn dispatch<D: Device>(
    mut receiver: mpsc::Receiver<DeviceEvent<D>>,
    handlers: Arc<DashMap<DeviceEventType, Handler<D>>>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            event = receiver.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let handler = handlers.get(&event.kind).map(|entry| Arc::clone(entry.value()));
        match handler {
            Some(handler) => {
                tokio::spawn(handler(event));
            }
            None => {
                tracing::debug!(kind = %event.kind, device = event.device.id(), "no handler for event");
            }
        }
    }
    tracing::debug!("device event dispatcher stopped");
}
