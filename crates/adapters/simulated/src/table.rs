//! Generated zone tables and readings.
//!
//! Everything is a pure function of the config and a tick counter, so
//! the simulator is reproducible without a random source.

use dtsgate_app::ports::dts_sdk::DefenceZoneRow;

use crate::config::SimulatorConfig;

/// Highest relay output index a relay board accepts.
const RELAY_OUTPUTS: u32 = 32;

/// Vendor zone id of the `index`-th zone (0-based) of a channel.
#[must_use]
pub fn raw_zone_id(config: &SimulatorConfig, channel_id: u8, index: u32) -> u32 {
    u32::from(channel_id.saturating_sub(1)) * config.zones_per_channel + index + 1
}

/// Zone ids of every channel, in channel order.
#[must_use]
pub fn all_zone_ids(config: &SimulatorConfig) -> Vec<u32> {
    (1..=config.channel_num)
        .flat_map(|channel_id| {
            (0..config.zones_per_channel).map(move |index| raw_zone_id(config, channel_id, index))
        })
        .collect()
}

/// Zone table of one channel; empty for a channel that does not exist.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn zone_rows(config: &SimulatorConfig, channel_id: u8) -> Vec<DefenceZoneRow> {
    if channel_id == 0 || channel_id > config.channel_num {
        return Vec::new();
    }
    (0..config.zones_per_channel)
        .map(|index| {
            let start = index as f32 * config.zone_length;
            DefenceZoneRow {
                id: raw_zone_id(config, channel_id, index),
                name: format!("CH{channel_id}-Z{:02}", index + 1),
                channel_id,
                start,
                finish: start + config.zone_length,
                tag: zone_tag(config, channel_id, index),
            }
        })
        .collect()
}

fn zone_tag(config: &SimulatorConfig, channel_id: u8, index: u32) -> String {
    let mut tag = String::new();
    if config.warehouse_tags {
        tag.push_str(&format!(
            "warehouse=W{channel_id};group=G{};row={};column={};layer=1;",
            index / 4 + 1,
            index / 4 + 1,
            index % 4 + 1,
        ));
    }
    if config.relay_tags {
        let group = char::from(b'A' + (channel_id.saturating_sub(1) % 26));
        let output = index % (RELAY_OUTPUTS - 1) + 1;
        tag.push_str(&format!("relay={group}{output},{};", output + 1));
    }
    tag
}

/// Temperature of `zone` at `tick`, within 3°C above the base.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reading(config: &SimulatorConfig, tick: u64, zone: u32) -> f32 {
    config.base_temperature + ((tick + u64::from(zone)) % 7) as f32 * 0.5
}

/// Signal trace of one channel at `tick`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn signal_trace(config: &SimulatorConfig, tick: u64, channel_id: u8) -> Vec<f32> {
    (0..config.signal_points)
        .map(|point| {
            let wave = ((point as u64 + tick + u64::from(channel_id)) % 11) as f32 * 0.2;
            config.base_temperature + wave
        })
        .collect()
}

/// Length of fiber covered by a channel's zones.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn channel_length(config: &SimulatorConfig) -> f32 {
    config.zones_per_channel as f32 * config.zone_length
}
