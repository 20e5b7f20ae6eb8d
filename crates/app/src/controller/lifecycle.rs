//! Connection state machine: run, hooks, close, destroy.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use dtsgate_domain::device::Status;
use dtsgate_domain::error::GatewayError;
use tokio::sync::mpsc;

use super::{DtsController, Inner};
use crate::ports::dts_sdk::{ConnectionCallback, ConnectionHooks, DtsClient};
use crate::ports::DtsSdk;

impl<S: DtsSdk> DtsController<S> {
    /// Open the hardware handle and start following its connection.
    ///
    /// Returns once the handle exists; the connection outcome arrives on the
    /// status channel.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::AlreadyRunning`] while `Connecting` or `Connected`;
    ///   nothing is changed in that case.
    /// - [`GatewayError::Closed`] after [`close`](Self::close).
    /// - [`GatewayError::Hardware`] when the SDK cannot create a handle;
    ///   the controller is left `Disconnected`.
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub fn run(&self) -> Result<(), GatewayError> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Err(GatewayError::Closed {
                id: inner.id.clone(),
            });
        }
        {
            let mut state = inner.state.lock();
            if state.status.is_running() {
                return Err(GatewayError::AlreadyRunning {
                    id: inner.id.clone(),
                });
            }
            state.status = Status::Connecting;
        }
        inner.outlets.status.push(Status::Connecting);

        match inner.sdk.connect(&inner.config.host, self.hooks()) {
            Ok(client) => {
                let previous = inner.client.lock().replace(Arc::new(client));
                if let Some(previous) = previous {
                    previous.close();
                }
                tracing::info!(host = %inner.config.host, "DTS connection opened");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(host = %inner.config.host, error = %err, "cannot open DTS connection");
                inner.force_status(Status::Disconnected);
                Err(err.into())
            }
        }
    }

    /// Stop the controller for good.
    ///
    /// Releases the hardware handle, removes scheduled jobs and leaves the
    /// controller `Disconnected`. The output channels are closed by
    /// [`destroy`](Self::destroy) once the grace delay has passed, so values
    /// pushed just before still reach consumers.
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            tracing::debug!("DTS controller already closed");
            return;
        }
        inner.cancel.cancel();

        let client = inner.client.lock().take();
        if let Some(client) = client {
            client.close();
        }
        let job = inner.resync_job.lock().take();
        let scheduler = inner.scheduler.lock().clone();
        if let (Some(job), Some(scheduler)) = (job, scheduler) {
            scheduler.remove(job);
        }
        inner.force_status(Status::Disconnected);
        tracing::info!(host = %inner.config.host, "DTS controller closed");

        let grace = inner.config.destroy_grace();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let controller = self.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(grace).await;
                    controller.destroy();
                });
            }
            Err(_) => self.destroy(),
        }
    }

    /// Close every output channel and forget the zone table.
    ///
    /// Safe to call more than once; only the first call has an effect.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.outlets.alarm.close();
        inner.outlets.temperature.close();
        inner.outlets.signal.close();
        inner.outlets.event.close();
        inner.outlets.status.close();
        inner.state.lock().zones.clear();
        tracing::debug!(device = %inner.id, "DTS controller destroyed");
    }

    fn hooks(&self) -> ConnectionHooks {
        let hook = |next: Status| -> ConnectionCallback {
            let weak = Arc::downgrade(&self.inner);
            Arc::new(move |host: &str| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_connection_change(host, next);
                }
            })
        };
        ConnectionHooks {
            on_connected: hook(Status::Connected),
            on_timeout: hook(Status::Connecting),
            on_disconnected: hook(Status::Disconnected),
        }
    }
}

impl<S: DtsSdk> Inner<S> {
    fn on_connection_change(&self, host: &str, next: Status) {
        if self.cancel.is_cancelled() {
            tracing::debug!(host, %next, "connection change after close ignored");
            return;
        }
        match next {
            Status::Connected => {
                if self.status() == Status::Disconnected {
                    self.transition(Status::Connecting);
                }
                if self.transition(Status::Connected) {
                    tracing::info!(host, "DTS connected");
                }
            }
            Status::Connecting => {
                if self.transition(Status::Connecting) {
                    tracing::warn!(host, "DTS connection timed out, retrying");
                }
            }
            Status::Disconnected => {
                if self.transition(Status::Disconnected) {
                    tracing::warn!(host, "DTS disconnected");
                }
            }
            Status::Unconnected => {}
        }
    }

    fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Move to `next` if the state machine allows it and announce it.
    fn transition(&self, next: Status) -> bool {
        {
            let mut state = self.state.lock();
            if !state.status.can_transition_to(next) {
                tracing::warn!(device = %self.id, from = %state.status, to = %next, "illegal status transition ignored");
                return false;
            }
            state.status = next;
        }
        self.outlets.status.push(next);
        true
    }

    fn force_status(&self, next: Status) {
        self.state.lock().status = next;
        self.outlets.status.push(next);
    }
}

/// Sync zones then register callbacks every time the controller connects.
///
/// Runs until the status channel closes, which happens when the
/// controller is destroyed.
pub async fn follow_connections<S: DtsSdk>(
    controller: DtsController<S>,
    mut statuses: mpsc::Receiver<Status>,
) {
    while let Some(status) = statuses.recv().await {
        if status != Status::Connected || controller.is_closed() {
            continue;
        }
        let zones = controller.sync_zones().await;
        tracing::info!(device = %controller.id(), zones, "zone table synced after connect");
        if let Err(err) = controller.register().await {
            tracing::warn!(device = %controller.id(), error = %err, "callbacks not registered");
        }
    }
    tracing::debug!(device = %controller.id(), "stopped following connections");
}
