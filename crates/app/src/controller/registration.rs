//! Callback registration with bounded retry.

use std::sync::Arc;

use dtsgate_domain::device::CallType;
use dtsgate_domain::error::GatewayError;
use tokio::time::Instant;

use super::DtsController;
use crate::ports::dts_sdk::{DtsClient, NotificationCallback};
use crate::ports::DtsSdk;

impl<S: DtsSdk> DtsController<S> {
    /// Subscribe to every configured notification kind.
    ///
    /// Kinds that fail are retried, every `register_retry_secs`, until
    /// `register_deadline_secs` have passed since the call started. Kinds
    /// already subscribed are not subscribed again. On success the zone
    /// re-sync job is scheduled when enabled.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RegistrationTimedOut`] listing the kinds still
    ///   missing at the deadline. The controller keeps running without them.
    /// - [`GatewayError::Closed`] when the controller is closed meanwhile.
    /// - [`GatewayError::NotConnected`] before [`run`](Self::run).
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub async fn register(&self) -> Result<(), GatewayError> {
        let config = &self.inner.config;
        let deadline = Instant::now() + config.register_deadline();
        let mut pending = config.subscriptions();
        let mut attempt = 0_u32;

        loop {
            if self.is_closed() {
                return Err(GatewayError::Closed {
                    id: self.inner.id.clone(),
                });
            }
            attempt += 1;
            let client = self.inner.client()?;
            let mut failed: Vec<CallType> = Vec::new();
            for kind in pending {
                match client.subscribe(kind, self.notification_callback()).await {
                    Ok(()) => tracing::info!(%kind, "notification callback registered"),
                    Err(err) => {
                        tracing::warn!(%kind, attempt, error = %err, "notification callback registration failed");
                        failed.push(kind);
                    }
                }
            }
            if failed.is_empty() {
                self.schedule_resync();
                return Ok(());
            }
            pending = failed;

            if Instant::now() >= deadline {
                tracing::error!(?pending, attempt, "giving up on notification callback registration");
                return Err(GatewayError::RegistrationTimedOut { pending });
            }
            tokio::select! {
                () = self.inner.cancel.cancelled() => {
                    return Err(GatewayError::Closed {
                        id: self.inner.id.clone(),
                    });
                }
                () = tokio::time::sleep(config.register_retry()) => {}
            }
        }
    }

    fn notification_callback(&self) -> NotificationCallback {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |notification| {
            if let Some(inner) = weak.upgrade() {
                inner.handle(notification);
            }
        })
    }

    /// Schedule the zone re-sync job once, if enabled and a scheduler is set.
    fn schedule_resync(&self) {
        let Some(period) = self.inner.config.zone_resync() else {
            return;
        };
        let Some(scheduler) = self.inner.scheduler.lock().clone() else {
            tracing::debug!("no scheduler set, zone re-sync disabled");
            return;
        };
        let mut job = self.inner.resync_job.lock();
        if job.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let id = scheduler.every(format!("{} zone resync", self.inner.id), period, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    DtsController { inner }.sync_zones().await;
                }
            }
        });
        *job = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::DtsConfig;
    use super::super::fake::{FakeSdk, row};
    use super::*;
    use crate::scheduler::Scheduler;

    fn controller(config: DtsConfig, sdk: FakeSdk) -> (DtsController<FakeSdk>, Arc<FakeSdk>) {
        let sdk = Arc::new(sdk);
        let controller = DtsController::new(config, Arc::clone(&sdk));
        controller.run().unwrap();
        sdk.connected();
        (controller, sdk)
    }

    #[tokio::test]
    async fn should_subscribe_every_configured_kind() {
        let (controller, sdk) = controller(DtsConfig::default(), FakeSdk::default());

        controller.register().await.unwrap();

        assert_eq!(sdk.subscribed(), CallType::ALL.to_vec());
        assert_eq!(sdk.subscribe_calls(), 4);
    }

    #[tokio::test]
    async fn should_subscribe_only_requested_kinds() {
        let config = DtsConfig {
            call_types: vec![CallType::Alarm, CallType::Event],
            ..DtsConfig::default()
        };
        let (controller, sdk) = controller(config, FakeSdk::default());

        controller.register().await.unwrap();

        assert_eq!(sdk.subscribed(), vec![CallType::Alarm, CallType::Event]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_failed_kinds_when_subscription_fails() {
        let (controller, sdk) = controller(DtsConfig::default(), FakeSdk::default());
        sdk.fail_subscriptions(2);

        controller.register().await.unwrap();

        assert_eq!(sdk.subscribed(), CallType::ALL.to_vec());
        assert_eq!(sdk.subscribe_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn should_give_up_when_deadline_passes() {
        let (controller, sdk) = controller(DtsConfig::default(), FakeSdk::default());
        sdk.fail_subscriptions(usize::MAX);
        let started = Instant::now();

        let err = controller.register().await.unwrap_err();

        match err {
            GatewayError::RegistrationTimedOut { pending } => {
                assert_eq!(pending, CallType::ALL.to_vec());
            }
            other => panic!("unexpected error: {other}"),
        }
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(60), "{waited:?}");
        assert!(waited <= Duration::from_secs(62), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_retrying_when_closed() {
        let (controller, sdk) = controller(DtsConfig::default(), FakeSdk::default());
        sdk.fail_subscriptions(usize::MAX);
        let closer = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            closer.close();
        });

        let err = controller.register().await.unwrap_err();

        assert!(matches!(err, GatewayError::Closed { .. }));
    }

    #[tokio::test]
    async fn should_require_connection_when_registering() {
        let controller = DtsController::new(DtsConfig::default(), Arc::new(FakeSdk::default()));

        let err = controller.register().await.unwrap_err();

        assert!(matches!(err, GatewayError::NotConnected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn should_resync_zones_periodically_when_enabled() {
        let config = DtsConfig {
            channel_num: 1,
            zone_resync_secs: 300,
            ..DtsConfig::default()
        };
        let sdk = FakeSdk::default().with_table(1, vec![row(1, 1, 0.0, 5.0, "")]);
        let (controller, _sdk) = controller(config, sdk);
        let scheduler = Scheduler::new();
        controller.set_scheduler(scheduler.clone());

        controller.register().await.unwrap();
        controller.register().await.unwrap();
        assert_eq!(scheduler.len(), 1);
        assert_eq!(controller.zone_count(), 0);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(controller.zone_count(), 1);

        controller.close();
        assert!(scheduler.is_empty());
    }
}
