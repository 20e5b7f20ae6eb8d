//! # dtsgate-adapter-simulated
//!
//! Simulated DTS SDK: an in-process stand-in for the vendor library.
//!
//! ## Responsibilities
//!
//! - Serve generated zone tables with relay and warehouse tags
//! - Report connection changes through the installed hooks
//! - Emit temperature, alarm, signal and device event notifications on
//!   configurable periods
//! - Expose hooks to inject notifications and connection changes, for
//!   tests and demos
//!
//! ## Dependency rule
//!
//! Depends on `dtsgate-app` (for the [`DtsSdk`] port) and `dtsgate-domain`.

pub mod config;
pub mod table;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dtsgate_app::ports::dts_sdk::{
    ConnectionCallback, ConnectionHooks, DefenceZoneResponse, DeviceEventNotify, DtsClient, DtsSdk,
    Notification, NotificationCallback, RawZoneAlarm, RawZoneTemp, SdkError, TempSignalNotify,
    ZoneAlarmNotify, ZoneTempNotify,
};
use dtsgate_domain::device::CallType;
use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub use config::SimulatorConfig;

/// Alarm states the alarm emitter cycles through: fixed temperature
/// alarm, temperature rise warning, back to normal.
const ALARM_CYCLE: [i32; 3] = [6, 2, 0];

/// Fiber states the event emitter cycles through: unplugged, plugged, ok.
const EVENT_CYCLE: [i32; 3] = [1, 2, 0];

/// Simulated vendor SDK.
///
/// Each [`connect`](DtsSdk::connect) opens a session that lives until its
/// [`SimulatedClient`] is closed. The most recent session is the target of
/// the injection helpers.
#[derive(Clone)]
pub struct SimulatedSdk {
    config: Arc<SimulatorConfig>,
    current: Arc<Mutex<Option<Arc<Session>>>>,
    subscribe_failures: Arc<AtomicUsize>,
}

/// Connection handle returned by [`SimulatedSdk`].
pub struct SimulatedClient {
    config: Arc<SimulatorConfig>,
    session: Arc<Session>,
    subscribe_failures: Arc<AtomicUsize>,
}

struct Session {
    host: String,
    hooks: ConnectionHooks,
    callbacks: Mutex<HashMap<CallType, NotificationCallback>>,
    cancel: CancellationToken,
    started: Instant,
    epoch_millis: i64,
}

impl Session {
    /// Millisecond timestamp that follows the runtime clock.
    fn timestamp(&self) -> i64 {
        let elapsed = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.epoch_millis.saturating_add(elapsed)
    }

    fn deliver(&self, notification: Notification) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let callback = self
            .callbacks
            .lock()
            .get(&notification.call_type())
            .cloned();
        match callback {
            Some(callback) => {
                callback(notification);
                true
            }
            None => false,
        }
    }

    fn fire(&self, pick: impl Fn(&ConnectionHooks) -> &ConnectionCallback) {
        if !self.cancel.is_cancelled() {
            pick(&self.hooks)(&self.host);
        }
    }
}

impl SimulatedSdk {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config: Arc::new(config),
            current: Arc::new(Mutex::new(None)),
            subscribe_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Make the next `count` subscriptions fail.
    pub fn fail_subscriptions(&self, count: usize) {
        self.subscribe_failures.store(count, Ordering::SeqCst);
    }

    /// Kinds subscribed on the current session, sorted.
    #[must_use]
    pub fn subscribed(&self) -> Vec<CallType> {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let mut kinds: Vec<CallType> = session.callbacks.lock().keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Deliver `notification` on the current session.
    ///
    /// Returns `false` when no open session subscribed to its kind.
    pub fn inject(&self, notification: Notification) -> bool {
        self.session()
            .is_some_and(|session| session.deliver(notification))
    }

    pub fn fire_connected(&self) {
        if let Some(session) = self.session() {
            session.fire(|hooks| &hooks.on_connected);
        }
    }

    pub fn fire_timeout(&self) {
        if let Some(session) = self.session() {
            session.fire(|hooks| &hooks.on_timeout);
        }
    }

    pub fn fire_disconnected(&self) {
        if let Some(session) = self.session() {
            session.fire(|hooks| &hooks.on_disconnected);
        }
    }

    fn session(&self) -> Option<Arc<Session>> {
        self.current.lock().clone()
    }

    fn spawn_connect(&self, session: &Arc<Session>) {
        let delay = self.config.connect_delay();
        let session = Arc::clone(session);
        tokio::spawn(async move {
            tokio::select! {
                () = session.cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    tracing::debug!(host = %session.host, "simulated connection established");
                    session.fire(|hooks| &hooks.on_connected);
                }
            }
        });
    }

    fn spawn_emitters(&self, session: &Arc<Session>) {
        let config = &self.config;
        if let Some(period) = config.temperature_interval() {
            spawn_emitter(session, Arc::clone(config), period, temperature_notification);
        }
        if let Some(period) = config.signal_interval() {
            spawn_emitter(session, Arc::clone(config), period, signal_notifications);
        }
        if let Some(period) = config.alarm_interval() {
            spawn_emitter(session, Arc::clone(config), period, alarm_notifications);
        }
    }
}

impl DtsSdk for SimulatedSdk {
    type Client = SimulatedClient;

    #[tracing::instrument(skip(self, hooks))]
    fn connect(&self, host: &str, hooks: ConnectionHooks) -> Result<SimulatedClient, SdkError> {
        if host.trim().is_empty() {
            return Err(SdkError::Connect {
                host: host.to_string(),
                reason: "empty host".to_string(),
            });
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SdkError::Connect {
                host: host.to_string(),
                reason: "no async runtime".to_string(),
            });
        }

        let session = Arc::new(Session {
            host: host.to_string(),
            hooks,
            callbacks: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            started: Instant::now(),
            epoch_millis: dtsgate_domain::time::now().timestamp_millis(),
        });
        if let Some(previous) = self.current.lock().replace(Arc::clone(&session)) {
            previous.cancel.cancel();
        }
        self.spawn_connect(&session);
        self.spawn_emitters(&session);
        tracing::info!(%host, "simulated connection handle opened");

        Ok(SimulatedClient {
            config: Arc::clone(&self.config),
            session,
            subscribe_failures: Arc::clone(&self.subscribe_failures),
        })
    }
}

impl DtsClient for SimulatedClient {
    async fn defence_zones(&self, channel_id: u8) -> Result<DefenceZoneResponse, SdkError> {
        if self.session.cancel.is_cancelled() {
            return Err(SdkError::Request("connection handle closed".to_string()));
        }
        let rows = table::zone_rows(&self.config, channel_id);
        if rows.is_empty() {
            return Ok(DefenceZoneResponse {
                success: false,
                error_message: format!("channel {channel_id} has no zone table"),
                rows,
            });
        }
        Ok(DefenceZoneResponse {
            success: true,
            error_message: String::new(),
            rows,
        })
    }

    async fn subscribe(
        &self,
        call_type: CallType,
        callback: NotificationCallback,
    ) -> Result<(), SdkError> {
        let failed = self
            .subscribe_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed || self.session.cancel.is_cancelled() {
            return Err(SdkError::Subscribe(call_type));
        }
        self.session.callbacks.lock().insert(call_type, callback);
        Ok(())
    }

    fn close(&self) {
        self.session.cancel.cancel();
        self.session.callbacks.lock().clear();
        tracing::debug!(host = %self.session.host, "simulated connection handle closed");
    }
}

fn spawn_emitter<F>(session: &Arc<Session>, config: Arc<SimulatorConfig>, period: Duration, build: F)
where
    F: Fn(&SimulatorConfig, u64, i64) -> Vec<Notification> + Send + 'static,
{
    let session = Arc::clone(session);
    let first = Instant::now() + period;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = 0_u64;
        loop {
            tokio::select! {
                () = session.cancel.cancelled() => break,
                _ = interval.tick() => {
                    for notification in build(&config, tick, session.timestamp()) {
                        session.deliver(notification);
                    }
                    tick += 1;
                }
            }
        }
    });
}

fn temperature_notification(config: &SimulatorConfig, tick: u64, timestamp: i64) -> Vec<Notification> {
    let zones = table::all_zone_ids(config)
        .into_iter()
        .map(|id| {
            let avg = table::reading(config, tick, id);
            RawZoneTemp {
                id,
                max: avg + 0.5,
                avg,
                min: avg - 0.5,
            }
        })
        .collect();
    vec![Notification::ZoneTemp(ZoneTempNotify {
        device_id: config.device_id,
        timestamp,
        zones,
    })]
}

fn signal_notifications(config: &SimulatorConfig, tick: u64, timestamp: i64) -> Vec<Notification> {
    (1..=config.channel_num)
        .map(|channel_id| {
            Notification::TempSignal(TempSignalNotify {
                device_id: config.device_id,
                channel_id,
                timestamp,
                real_length: table::channel_length(config),
                signal: table::signal_trace(config, tick, channel_id),
            })
        })
        .collect()
}

/// One alarm on a rotating zone, plus a fiber event on its channel every
/// third tick.
#[allow(clippy::cast_possible_truncation)]
fn alarm_notifications(config: &SimulatorConfig, tick: u64, timestamp: i64) -> Vec<Notification> {
    let ids = table::all_zone_ids(config);
    if ids.is_empty() {
        return Vec::new();
    }
    let index = (tick % ids.len() as u64) as usize;
    let id = ids[index];
    let channel_id = u8::try_from(index as u32 / config.zones_per_channel.max(1) + 1).unwrap_or(1);
    let avg = table::reading(config, tick, id) + 40.0;
    let state = ALARM_CYCLE[(tick % ALARM_CYCLE.len() as u64) as usize];

    let mut notifications = vec![Notification::ZoneAlarm(ZoneAlarmNotify {
        device_id: config.device_id,
        timestamp,
        zones: vec![RawZoneAlarm {
            id,
            max: avg + 1.0,
            avg,
            min: avg - 1.0,
            location: config.zone_length / 2.0,
            state,
        }],
    })];
    if tick % 3 == 2 {
        let event = EVENT_CYCLE[((tick / 3) % EVENT_CYCLE.len() as u64) as usize];
        notifications.push(Notification::DeviceEvent(DeviceEventNotify {
            device_id: config.device_id,
            channel_id,
            timestamp,
            event_type: event,
            channel_length: table::channel_length(config),
        }));
    }
    notifications
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    #[derive(Default)]
    struct Probe {
        connected: AtomicUsize,
        timeouts: AtomicUsize,
        disconnected: AtomicBool,
        received: Mutex<Vec<Notification>>,
    }

    fn hooks(probe: &Arc<Probe>) -> ConnectionHooks {
        let on_connected = Arc::clone(probe);
        let on_timeout = Arc::clone(probe);
        let on_disconnected = Arc::clone(probe);
        ConnectionHooks {
            on_connected: Arc::new(move |_| {
                on_connected.connected.fetch_add(1, Ordering::SeqCst);
            }),
            on_timeout: Arc::new(move |_| {
                on_timeout.timeouts.fetch_add(1, Ordering::SeqCst);
            }),
            on_disconnected: Arc::new(move |_| {
                on_disconnected.disconnected.store(true, Ordering::SeqCst);
            }),
        }
    }

    fn recorder(probe: &Arc<Probe>) -> NotificationCallback {
        let probe = Arc::clone(probe);
        Arc::new(move |notification| probe.received.lock().push(notification))
    }

    fn quiet() -> SimulatorConfig {
        SimulatorConfig {
            temperature_interval_secs: 0,
            signal_interval_secs: 0,
            alarm_interval_secs: 0,
            ..SimulatorConfig::default()
        }
    }

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_connected_after_delay() {
        let sdk = SimulatedSdk::new(quiet());
        let probe = Arc::new(Probe::default());

        let _client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();
        assert_eq!(probe.connected.load(Ordering::SeqCst), 0);

        settle(Duration::from_millis(250)).await;
        assert_eq!(probe.connected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_refuse_connection_when_host_empty() {
        let sdk = SimulatedSdk::new(quiet());
        let probe = Arc::new(Probe::default());

        let err = sdk.connect("  ", hooks(&probe)).err().unwrap();

        assert!(matches!(err, SdkError::Connect { .. }));
    }

    #[test]
    fn should_refuse_connection_when_no_runtime() {
        let sdk = SimulatedSdk::new(quiet());
        let probe = Arc::new(Probe::default());

        assert!(sdk.connect("10.0.0.5", hooks(&probe)).is_err());
    }

    #[tokio::test]
    async fn should_serve_zone_table_when_channel_exists() {
        let sdk = SimulatedSdk::new(quiet());
        let client = sdk.connect("10.0.0.5", hooks(&Arc::new(Probe::default()))).unwrap();

        let response = client.defence_zones(1).await.unwrap();
        assert!(response.success);
        assert_eq!(response.rows.len(), 8);

        let response = client.defence_zones(9).await.unwrap();
        assert!(!response.success);
        assert!(response.error_message.contains('9'));
    }

    #[tokio::test]
    async fn should_fail_requested_subscriptions() {
        let sdk = SimulatedSdk::new(quiet());
        let probe = Arc::new(Probe::default());
        let client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();
        sdk.fail_subscriptions(1);

        assert!(client.subscribe(CallType::Alarm, recorder(&probe)).await.is_err());
        assert!(client.subscribe(CallType::Alarm, recorder(&probe)).await.is_ok());
        assert_eq!(sdk.subscribed(), vec![CallType::Alarm]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_emit_temperature_for_every_zone() {
        let config = SimulatorConfig {
            temperature_interval_secs: 10,
            ..quiet()
        };
        let sdk = SimulatedSdk::new(config);
        let probe = Arc::new(Probe::default());
        let client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();
        client
            .subscribe(CallType::Temperature, recorder(&probe))
            .await
            .unwrap();

        settle(Duration::from_secs(21)).await;

        let received = probe.received.lock();
        assert_eq!(received.len(), 2);
        let (Notification::ZoneTemp(first), Notification::ZoneTemp(second)) =
            (&received[0], &received[1])
        else {
            panic!("unexpected notifications: {received:?}");
        };
        assert_eq!(first.zones.len(), 16);
        assert!(second.timestamp - first.timestamp >= 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn should_emit_alarm_and_event_on_alarm_period() {
        let config = SimulatorConfig {
            alarm_interval_secs: 5,
            ..quiet()
        };
        let sdk = SimulatedSdk::new(config);
        let probe = Arc::new(Probe::default());
        let client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();
        client.subscribe(CallType::Alarm, recorder(&probe)).await.unwrap();
        client.subscribe(CallType::Event, recorder(&probe)).await.unwrap();

        settle(Duration::from_secs(16)).await;

        let received = probe.received.lock();
        let alarms = received
            .iter()
            .filter(|n| n.call_type() == CallType::Alarm)
            .count();
        let events = received
            .iter()
            .filter(|n| n.call_type() == CallType::Event)
            .count();
        assert_eq!((alarms, events), (3, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_everything_when_client_closed() {
        let config = SimulatorConfig {
            temperature_interval_secs: 1,
            ..quiet()
        };
        let sdk = SimulatedSdk::new(config);
        let probe = Arc::new(Probe::default());
        let client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();
        client
            .subscribe(CallType::Temperature, recorder(&probe))
            .await
            .unwrap();

        client.close();
        settle(Duration::from_secs(5)).await;

        assert!(probe.received.lock().is_empty());
        assert_eq!(probe.connected.load(Ordering::SeqCst), 0);
        sdk.fire_disconnected();
        assert!(!probe.disconnected.load(Ordering::SeqCst));
        assert!(client.defence_zones(1).await.is_err());
    }

    #[tokio::test]
    async fn should_route_injected_connection_changes_to_hooks() {
        let sdk = SimulatedSdk::new(quiet());
        let probe = Arc::new(Probe::default());
        let _client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();

        sdk.fire_timeout();
        sdk.fire_disconnected();
        sdk.fire_connected();

        assert_eq!(probe.timeouts.load(Ordering::SeqCst), 1);
        assert!(probe.disconnected.load(Ordering::SeqCst));
        assert_eq!(probe.connected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_inject_only_subscribed_kinds() {
        let sdk = SimulatedSdk::new(quiet());
        let probe = Arc::new(Probe::default());
        let client = sdk.connect("10.0.0.5", hooks(&probe)).unwrap();
        client.subscribe(CallType::Event, recorder(&probe)).await.unwrap();
        let event = Notification::DeviceEvent(DeviceEventNotify {
            device_id: 1,
            channel_id: 1,
            timestamp: 0,
            event_type: 3,
            channel_length: 80.0,
        });
        let temperature = temperature_notification(sdk.config(), 0, 0).remove(0);

        assert!(sdk.inject(event));
        assert!(!sdk.inject(temperature));
        assert_eq!(probe.received.lock().len(), 1);
    }
}
