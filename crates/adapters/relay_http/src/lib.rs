//! # dtsgate-adapter-relay-http
//!
//! HTTP relay board adapter: drives alarm outputs of a relay board
//! through its REST API.
//!
//! ## Responsibilities
//!
//! - Switch outputs on (`/api/on`, `/api/on-point`) and off (`/api/off`,
//!   `/api/off-all`)
//! - Track reachability with a periodic `/api/ping` on the shared scheduler
//! - Implement the [`Device`] port so the device manager can hold boards
//!   next to DTS controllers
//!
//! ## Dependency rule
//!
//! Depends on `dtsgate-app` (for the [`Device`] port and the scheduler)
//! and `dtsgate-domain`.

pub mod config;
pub mod error;

use std::future::Future;
use std::sync::Arc;

use dtsgate_app::ports::Device;
use dtsgate_app::scheduler::Scheduler;
use dtsgate_domain::device::{DeviceKind, Status};
use dtsgate_domain::error::GatewayError;
use dtsgate_domain::id::JobId;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub use config::RelayConfig;
pub use error::RelayError;

/// Highest output index a board accepts.
pub const MAX_BRANCH: u32 = 32;

/// An HTTP relay board.
///
/// Every request updates the status: `Connected` on `200 OK`,
/// `Disconnected` otherwise.
#[derive(Clone)]
pub struct RelayDevice {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    config: RelayConfig,
    http: reqwest::Client,
    status: Mutex<Status>,
    scheduler: Mutex<Option<Scheduler>>,
    ping_job: Mutex<Option<JobId>>,
    cancel: CancellationToken,
}

impl RelayDevice {
    /// Build a relay device from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Client`] when the HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RelayError::Client)?;
        Ok(Self {
            inner: Arc::new(Inner {
                id: config.device_id(),
                config,
                http,
                status: Mutex::new(Status::Unconnected),
                scheduler: Mutex::new(None),
                ping_job: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Check that the board answers.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] when the board is unreachable or unhappy.
    pub async fn ping(&self) -> Result<(), RelayError> {
        self.inner.ping().await
    }

    /// Switch one output on.
    ///
    /// With `reset_secs` configured the board switches it off again on
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] when the request fails or the device is
    /// closed.
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub async fn alarm(&self, branch: u32) -> Result<(), RelayError> {
        let path = match self.inner.config.reset_secs {
            Some(secs) => format!("/api/on-point/{branch}/{}", secs.saturating_mul(1000)),
            None => format!("/api/on/{branch}"),
        };
        self.inner.call(&path).await
    }

    /// Switch on every valid output of a comma-separated list.
    ///
    /// Entries that are not integers in `1..=32` are skipped. Requests run
    /// concurrently; returns the number of outputs switched on.
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub async fn alarms(&self, branches: &str) -> usize {
        let mut tasks = JoinSet::new();
        for branch in parse_branches(branches) {
            let device = self.clone();
            tasks.spawn(async move { device.alarm(branch).await });
        }
        let mut switched = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(())) => switched += 1,
                Ok(Err(err)) => tracing::warn!(error = %err, "relay output not switched on"),
                Err(err) => tracing::error!(error = %err, "relay task failed"),
            }
        }
        switched
    }

    /// Switch one output off, or every output when `branch` is `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] when the request fails or the device is
    /// closed.
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub async fn reset(&self, branch: Option<u32>) -> Result<(), RelayError> {
        let path = match branch {
            Some(branch) => format!("/api/off/{branch}"),
            None => "/api/off-all".to_string(),
        };
        self.inner.call(&path).await
    }

    /// Ping now, then every `ping_interval_secs` on the shared scheduler.
    ///
    /// An unreachable board is not an error: the status says so and the
    /// periodic ping keeps checking.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Closed`] after [`close`](Self::close).
    pub async fn run(&self) -> Result<(), GatewayError> {
        if self.is_closed() {
            return Err(RelayError::Closed {
                id: self.inner.id.clone(),
            }
            .into());
        }
        if let Err(err) = self.inner.ping().await {
            tracing::warn!(device = %self.inner.id, error = %err, "relay unreachable");
        }
        self.schedule_ping();
        Ok(())
    }

    /// Stop the periodic ping and mark the device unconnected.
    pub fn close(&self) {
        self.inner.cancel.cancel();
        let job = self.inner.ping_job.lock().take();
        if let (Some(job), Some(scheduler)) = (job, self.inner.scheduler.lock().as_ref()) {
            scheduler.remove(job);
        }
        *self.inner.status.lock() = Status::Unconnected;
        tracing::info!(device = %self.inner.id, "relay closed");
    }

    fn schedule_ping(&self) {
        let Some(period) = self.inner.config.ping_interval() else {
            return;
        };
        let Some(scheduler) = self.inner.scheduler.lock().clone() else {
            tracing::debug!(device = %self.inner.id, "no scheduler set, periodic ping disabled");
            return;
        };
        let mut job = self.inner.ping_job.lock();
        if job.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let id = scheduler.every(format!("{} ping", self.inner.id), period, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    if let Err(err) = inner.ping().await {
                        tracing::warn!(device = %inner.id, error = %err, "relay ping failed");
                    }
                }
            }
        });
        *job = Some(id);
    }
}

impl Inner {
    async fn ping(&self) -> Result<(), RelayError> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::Closed {
                id: self.id.clone(),
            });
        }
        *self.status.lock() = Status::Connecting;
        self.call("/api/ping").await
    }

    async fn call(&self, path: &str) -> Result<(), RelayError> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::Closed {
                id: self.id.clone(),
            });
        }
        let url = format!("{}{path}", self.config.base_url());
        let result = match self.http.get(&url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => Ok(()),
            Ok(response) => Err(RelayError::Status {
                url,
                status: response.status().as_u16(),
            }),
            Err(source) => Err(RelayError::Request { url, source }),
        };
        if !self.cancel.is_cancelled() {
            *self.status.lock() = if result.is_ok() {
                Status::Connected
            } else {
                Status::Disconnected
            };
        }
        result
    }
}

/// Valid output indices of a comma-separated list, in order.
#[must_use]
pub fn parse_branches(branches: &str) -> Vec<u32> {
    branches
        .split(',')
        .filter_map(|branch| branch.trim().parse::<u32>().ok())
        .filter(|branch| (1..=MAX_BRANCH).contains(branch))
        .collect()
}

impl Device for RelayDevice {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Relay
    }

    fn status(&self) -> Status {
        *self.inner.status.lock()
    }

    fn run(&self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        Self::run(self)
    }

    fn close(&self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        Self::close(self);
        std::future::ready(Ok(()))
    }

    fn set_scheduler(&self, scheduler: Scheduler) {
        *self.inner.scheduler.lock() = Some(scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_skip_invalid_branches_when_parsing() {
        assert_eq!(parse_branches("1, 2,x,0,33,32,-4,"), vec![1, 2, 32]);
        assert!(parse_branches("").is_empty());
    }

    #[test]
    fn should_start_unconnected() {
        let device = RelayDevice::new(RelayConfig::default()).unwrap();
        assert_eq!(device.id(), "relay-A");
        assert_eq!(device.kind(), DeviceKind::Relay);
        assert_eq!(Device::status(&device), Status::Unconnected);
    }

    #[tokio::test]
    async fn should_refuse_run_when_closed() {
        let device = RelayDevice::new(RelayConfig::default()).unwrap();
        device.close();

        let err = device.run().await.unwrap_err();

        assert!(matches!(err, GatewayError::Closed { .. }));
        assert!(matches!(
            device.alarm(1).await,
            Err(RelayError::Closed { .. })
        ));
    }
}
