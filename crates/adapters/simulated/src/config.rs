//! Simulator settings, the `[simulator]` section.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Vendor device id stamped on every notification.
    pub device_id: u32,
    /// Channels with a zone table, `1..=channel_num`.
    pub channel_num: u8,
    pub zones_per_channel: u32,
    /// Fiber length covered by each zone.
    pub zone_length: f32,
    /// Delay before the connected hook fires.
    pub connect_delay_ms: u64,
    /// `0` disables the periodic emitter.
    pub temperature_interval_secs: u64,
    /// `0` disables the periodic emitter.
    pub signal_interval_secs: u64,
    /// `0` disables the periodic emitter.
    pub alarm_interval_secs: u64,
    /// Points in each signal trace.
    pub signal_points: usize,
    /// Temperature every generated reading is centered on.
    pub base_temperature: f32,
    /// Add a `relay=<letter><outputs>` tag to every zone.
    pub relay_tags: bool,
    /// Add warehouse coordinate tags to every zone.
    pub warehouse_tags: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device_id: 1,
            channel_num: 2,
            zones_per_channel: 8,
            zone_length: 10.0,
            connect_delay_ms: 200,
            temperature_interval_secs: 10,
            signal_interval_secs: 60,
            alarm_interval_secs: 45,
            signal_points: 200,
            base_temperature: 22.0,
            relay_tags: true,
            warehouse_tags: true,
        }
    }
}

impl SimulatorConfig {
    #[must_use]
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    #[must_use]
    pub fn temperature_interval(&self) -> Option<Duration> {
        secs(self.temperature_interval_secs)
    }

    #[must_use]
    pub fn signal_interval(&self) -> Option<Duration> {
        secs(self.signal_interval_secs)
    }

    #[must_use]
    pub fn alarm_interval(&self) -> Option<Duration> {
        secs(self.alarm_interval_secs)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_disable_emitter_when_interval_is_zero() {
        let config: SimulatorConfig = toml::from_str(
            r"
            alarm_interval_secs = 0
            signal_interval_secs = 15
            ",
        )
        .unwrap();
        assert!(config.alarm_interval().is_none());
        assert_eq!(config.signal_interval(), Some(Duration::from_secs(15)));
        assert_eq!(config.temperature_interval(), Some(Duration::from_secs(10)));
        assert_eq!(config.connect_delay(), Duration::from_millis(200));
    }
}
