//! Notification pipeline: dedup, screening, zone resolution, fan-out.
//!
//! Runs on SDK callback threads. Nothing in here waits: the zone table
//! lock is held only to copy zones out and every push is drop-on-full.

use dtsgate_domain::id::ZoneId;
use dtsgate_domain::notification::{ChannelEvent, ChannelSignal, ZonesAlarm, ZonesTemp};
use dtsgate_domain::quality::is_zero_glitch;
use dtsgate_domain::state::{AlarmState, FiberState};
use dtsgate_domain::time::from_millis;
use dtsgate_domain::zone::{AlarmSnapshot, Temperature, Zone};

use super::Inner;
use crate::ports::DtsSdk;
use crate::ports::dts_sdk::{
    DeviceEventNotify, Notification, TempSignalNotify, ZoneAlarmNotify, ZoneTempNotify,
};

impl<S: DtsSdk> Inner<S> {
    pub(super) fn handle(&self, notification: Notification) {
        if self.cancel.is_cancelled() {
            return;
        }
        match notification {
            Notification::ZoneAlarm(notify) => self.on_alarm(&notify),
            Notification::ZoneTemp(notify) => self.on_temperature(&notify),
            Notification::TempSignal(notify) => self.on_signal(notify),
            Notification::DeviceEvent(notify) => self.on_event(&notify),
        }
    }

    fn on_alarm(&self, notify: &ZoneAlarmNotify) {
        let device_id = notify.device_id;
        let created_at = from_millis(notify.timestamp);

        let fresh: Vec<_> = notify
            .zones
            .iter()
            .filter(|raw| {
                let zone_id = ZoneId::compose(device_id, raw.id);
                let admitted = self.windows.alarm.admit(
                    format!("{device_id}-{zone_id}"),
                    created_at,
                    AlarmState::from(raw.state),
                );
                if !admitted {
                    tracing::debug!(device_id, %zone_id, "alarm suppressed inside window");
                }
                admitted
            })
            .collect();

        if fresh.is_empty() {
            tracing::error!(device_id, received = notify.zones.len(), "alarm notification empty after filtering, discarded");
            return;
        }
        if is_zero_glitch(&fresh, |raw| raw.avg) {
            tracing::error!(device_id, zones = fresh.len(), "alarm batch sampled all zero, discarded");
            return;
        }

        let zones: Vec<Zone> = {
            let mut state = self.state.lock();
            fresh
                .iter()
                .filter_map(|raw| {
                    let zone_id = ZoneId::compose(device_id, raw.id);
                    let Some(zone) = state.zones.get_mut(&zone_id) else {
                        tracing::warn!(device_id, %zone_id, "alarm for unknown zone skipped");
                        return None;
                    };
                    zone.temperature = Some(Temperature {
                        max: raw.max,
                        avg: raw.avg,
                        min: raw.min,
                        at: created_at,
                    });
                    zone.alarm = Some(AlarmSnapshot {
                        location: raw.location,
                        at: created_at,
                        state: AlarmState::from(raw.state),
                    });
                    Some(zone.clone())
                })
                .collect()
        };
        if zones.is_empty() {
            tracing::warn!(device_id, "no alarm zone resolved, batch discarded");
            return;
        }

        tracing::info!(device_id, zones = zones.len(), "alarm batch ready");
        self.outlets.alarm.push(ZonesAlarm {
            device_id,
            host: self.config.host.clone(),
            created_at,
            zones,
        });
    }

    fn on_temperature(&self, notify: &ZoneTempNotify) {
        let device_id = notify.device_id;
        let created_at = from_millis(notify.timestamp);

        if !self
            .windows
            .temperature
            .admit(device_id.to_string(), created_at, ())
        {
            tracing::debug!(device_id, "temperature snapshot suppressed inside window");
            return;
        }

        let zones: Vec<Zone> = {
            let mut state = self.state.lock();
            notify
                .zones
                .iter()
                .filter_map(|raw| {
                    let temperature = Temperature {
                        max: raw.max,
                        avg: raw.avg,
                        min: raw.min,
                        at: created_at,
                    };
                    if temperature.is_blank() {
                        return None;
                    }
                    let zone_id = ZoneId::compose(device_id, raw.id);
                    let Some(zone) = state.zones.get_mut(&zone_id) else {
                        tracing::warn!(device_id, %zone_id, "temperature for unknown zone skipped");
                        return None;
                    };
                    zone.temperature = Some(temperature);
                    Some(zone.clone())
                })
                .collect()
        };
        if zones.is_empty() {
            tracing::error!(device_id, received = notify.zones.len(), "temperature notification empty after filtering, discarded");
            return;
        }

        self.outlets.temperature.push(ZonesTemp {
            device_id,
            host: self.config.host.clone(),
            created_at,
            zones,
        });
    }

    fn on_signal(&self, notify: TempSignalNotify) {
        let TempSignalNotify {
            device_id,
            channel_id,
            timestamp,
            real_length,
            signal,
        } = notify;
        let created_at = from_millis(timestamp);

        if signal.is_empty() {
            tracing::error!(device_id, channel_id, "empty signal discarded");
            return;
        }
        if is_zero_glitch(&signal, |value| *value) {
            tracing::error!(device_id, channel_id, points = signal.len(), "signal sampled all zero, discarded");
            return;
        }
        if !self
            .windows
            .signal
            .admit(format!("{device_id}-{channel_id}"), created_at, ())
        {
            tracing::debug!(device_id, channel_id, "signal suppressed inside window");
            return;
        }

        self.outlets.signal.push(ChannelSignal {
            device_id,
            channel_id,
            host: self.config.host.clone(),
            created_at,
            real_length,
            signal,
        });
    }

    fn on_event(&self, notify: &DeviceEventNotify) {
        let event_type = FiberState::from(notify.event_type);
        tracing::info!(
            device_id = notify.device_id,
            channel_id = notify.channel_id,
            %event_type,
            "fiber event"
        );
        self.outlets.event.push(ChannelEvent {
            device_id: notify.device_id,
            channel_id: notify.channel_id,
            host: self.config.host.clone(),
            created_at: from_millis(notify.timestamp),
            event_type,
            channel_length: notify.channel_length,
        });
    }
}
