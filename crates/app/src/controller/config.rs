//! Settings of one DTS controller.

use std::time::Duration;

use dtsgate_domain::device::CallType;
use serde::Deserialize;

/// One `[[dts]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DtsConfig {
    /// Address of the DTS host.
    pub host: String,
    /// Vendor device id, used to compose zone ids.
    pub device_id: u32,
    /// Channels are numbered `1..=channel_num`.
    pub channel_num: u8,
    /// Decode the `relay` tag of every zone.
    pub enable_relay: bool,
    /// Decode the warehouse coordinate tags of every zone.
    pub enable_warehouse: bool,
    /// Notification kinds subscribed by `register()`.
    pub call_types: Vec<CallType>,
    pub alarm_window_secs: u64,
    pub temperature_window_secs: u64,
    pub signal_window_secs: u64,
    /// Overall budget of one `register()` call.
    pub register_deadline_secs: u64,
    /// Pause between two registration attempts.
    pub register_retry_secs: u64,
    /// Delay between `close()` and closing the output channels.
    pub destroy_grace_secs: u64,
    /// Period of the zone table re-sync job; `0` disables it.
    pub zone_resync_secs: u64,
}

impl Default for DtsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            device_id: 1,
            channel_num: 4,
            enable_relay: false,
            enable_warehouse: false,
            call_types: CallType::ALL.to_vec(),
            alarm_window_secs: 20,
            temperature_window_secs: 60,
            signal_window_secs: 60,
            register_deadline_secs: 60,
            register_retry_secs: 1,
            destroy_grace_secs: 3,
            zone_resync_secs: 0,
        }
    }
}

impl DtsConfig {
    /// Device identifier used by the device manager.
    #[must_use]
    pub fn device_key(&self) -> String {
        format!("dts-{}", self.host)
    }

    #[must_use]
    pub fn alarm_window(&self) -> Duration {
        Duration::from_secs(self.alarm_window_secs)
    }

    #[must_use]
    pub fn temperature_window(&self) -> Duration {
        Duration::from_secs(self.temperature_window_secs)
    }

    #[must_use]
    pub fn signal_window(&self) -> Duration {
        Duration::from_secs(self.signal_window_secs)
    }

    #[must_use]
    pub fn register_deadline(&self) -> Duration {
        Duration::from_secs(self.register_deadline_secs)
    }

    #[must_use]
    pub fn register_retry(&self) -> Duration {
        Duration::from_secs(self.register_retry_secs)
    }

    #[must_use]
    pub fn destroy_grace(&self) -> Duration {
        Duration::from_secs(self.destroy_grace_secs)
    }

    /// Period of the zone re-sync job, if enabled.
    #[must_use]
    pub fn zone_resync(&self) -> Option<Duration> {
        (self.zone_resync_secs > 0).then(|| Duration::from_secs(self.zone_resync_secs))
    }

    /// Subscribed kinds, without duplicates, in declaration order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<CallType> {
        let mut kinds = self.call_types.clone();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }
}
