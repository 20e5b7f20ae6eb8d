//! Outbound notifications fanned out to downstream consumers.
//!
//! Each record is produced by the DTS controller after dedup, validity
//! screening and zone resolution, and travels on its own bounded channel.

use serde::{Deserialize, Serialize};

use crate::state::FiberState;
use crate::time::{Timestamp, seconds_format};
use crate::zone::Zone;

/// Temperature snapshot of every resolvable zone of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonesTemp {
    pub device_id: u32,
    pub host: String,
    #[serde(with = "seconds_format")]
    pub created_at: Timestamp,
    pub zones: Vec<Zone>,
}

/// Batch of zones that raised an alarm in one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonesAlarm {
    pub device_id: u32,
    pub host: String,
    #[serde(with = "seconds_format")]
    pub created_at: Timestamp,
    pub zones: Vec<Zone>,
}

/// Fiber temperature trace of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSignal {
    pub device_id: u32,
    pub channel_id: u8,
    pub host: String,
    #[serde(with = "seconds_format")]
    pub created_at: Timestamp,
    /// Measured fiber length the trace covers.
    pub real_length: f32,
    pub signal: Vec<f32>,
}

/// Physical state change of one fiber channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub device_id: u32,
    pub channel_id: u8,
    pub host: String,
    #[serde(with = "seconds_format")]
    pub created_at: Timestamp,
    pub event_type: FiberState,
    pub channel_length: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_millis;

    #[test]
    fn should_serialize_channel_event_with_readable_time() {
        let event = ChannelEvent {
            device_id: 1,
            channel_id: 2,
            host: "10.0.0.5".to_string(),
            created_at: from_millis(0),
            event_type: FiberState::Broken,
            channel_length: 1200.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["created_at"], "1970-01-01 00:00:00");
        assert_eq!(json["event_type"], "broken");
        assert_eq!(json["channel_id"], 2);
    }

    #[test]
    fn should_roundtrip_zones_temp_without_zones() {
        let temp = ZonesTemp {
            device_id: 9,
            host: "h".to_string(),
            created_at: from_millis(1_000),
            zones: Vec::new(),
        };
        let json = serde_json::to_string(&temp).unwrap();
        let back: ZonesTemp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, temp);
    }
}
