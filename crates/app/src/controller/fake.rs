//! In-memory SDK driven by controller tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dtsgate_domain::device::CallType;
use parking_lot::Mutex;

use crate::ports::dts_sdk::{
    ConnectionCallback, ConnectionHooks, DefenceZoneResponse, DefenceZoneRow, DtsClient, DtsSdk,
    Notification, NotificationCallback, SdkError,
};

#[derive(Default)]
pub(crate) struct FakeSdk {
    state: Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
    hooks: Mutex<Option<ConnectionHooks>>,
    callbacks: Mutex<HashMap<CallType, NotificationCallback>>,
    tables: Mutex<HashMap<u8, DefenceZoneResponse>>,
    subscribe_failures: Mutex<usize>,
    subscribe_calls: AtomicUsize,
    connects: AtomicUsize,
    client_closed: AtomicBool,
    refuse_connect: AtomicBool,
}

pub(crate) struct FakeClient {
    state: Arc<FakeState>,
}

pub(crate) fn row(id: u32, channel_id: u8, start: f32, finish: f32, tag: &str) -> DefenceZoneRow {
    DefenceZoneRow {
        id,
        name: format!("zone {id}"),
        channel_id,
        start,
        finish,
        tag: tag.to_string(),
    }
}

impl FakeSdk {
    pub(crate) fn with_table(self, channel_id: u8, rows: Vec<DefenceZoneRow>) -> Self {
        self.state.tables.lock().insert(
            channel_id,
            DefenceZoneResponse {
                success: true,
                error_message: String::new(),
                rows,
            },
        );
        self
    }

    pub(crate) fn with_rejected_table(self, channel_id: u8, message: &str) -> Self {
        self.state.tables.lock().insert(
            channel_id,
            DefenceZoneResponse {
                success: false,
                error_message: message.to_string(),
                rows: Vec::new(),
            },
        );
        self
    }

    pub(crate) fn refusing_connections(self) -> Self {
        self.state.refuse_connect.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn set_table(&self, channel_id: u8, rows: Vec<DefenceZoneRow>) {
        self.state.tables.lock().insert(
            channel_id,
            DefenceZoneResponse {
                success: true,
                error_message: String::new(),
                rows,
            },
        );
    }

    pub(crate) fn fail_subscriptions(&self, count: usize) {
        *self.state.subscribe_failures.lock() = count;
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.state.subscribe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn client_closed(&self) -> bool {
        self.state.client_closed.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribed(&self) -> Vec<CallType> {
        let mut kinds: Vec<CallType> = self.state.callbacks.lock().keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    pub(crate) fn connected(&self) {
        self.fire(|hooks| &hooks.on_connected);
    }

    pub(crate) fn timeout(&self) {
        self.fire(|hooks| &hooks.on_timeout);
    }

    pub(crate) fn disconnected(&self) {
        self.fire(|hooks| &hooks.on_disconnected);
    }

    /// Deliver a notification to the subscribed callback, if any.
    pub(crate) fn notify(&self, notification: Notification) -> bool {
        let callback = self
            .state
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
        let hooks = self.state.hooks.lock().clone();
        if let Some(hooks) = hooks {
            pick(&hooks)("127.0.0.1");
        }
    }
}

impl DtsSdk for FakeSdk {
    type Client = FakeClient;

    fn connect(&self, host: &str, hooks: ConnectionHooks) -> Result<FakeClient, SdkError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.refuse_connect.load(Ordering::SeqCst) {
            return Err(SdkError::Connect {
                host: host.to_string(),
                reason: "refused".to_string(),
            });
        }
        *self.state.hooks.lock() = Some(hooks);
        Ok(FakeClient {
            state: Arc::clone(&self.state),
        })
    }
}

impl DtsClient for FakeClient {
    async fn defence_zones(&self, channel_id: u8) -> Result<DefenceZoneResponse, SdkError> {
        self.state
            .tables
            .lock()
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| SdkError::Request(format!("no zone table for channel {channel_id}")))
    }

    async fn subscribe(
        &self,
        call_type: CallType,
        callback: NotificationCallback,
    ) -> Result<(), SdkError> {
        self.state.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.state.subscribe_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(SdkError::Subscribe(call_type));
            }
        }
        self.state.callbacks.lock().insert(call_type, callback);
        Ok(())
    }

    fn close(&self) {
        self.state.client_closed.store(true, Ordering::SeqCst);
    }
}
