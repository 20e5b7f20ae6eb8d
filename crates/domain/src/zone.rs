//! Zone: a physical sensing segment on one channel of one DTS device.
//!
//! Zones are rebuilt wholesale every time a channel's zone table is synced
//! from hardware. The only in-place mutation is attaching the latest
//! [`Temperature`] or [`AlarmSnapshot`] when a notification arrives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ZoneId;
use crate::state::AlarmState;
use crate::tag::Tags;
use crate::time::{Timestamp, seconds_format};

/// Relay output mapping carried by a zone's `relay` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    /// Relay group letter; selects the relay board (`relay-<group>`).
    pub group: char,
    /// Comma-separated output indices on that board, e.g. `"1,2,3"`.
    pub outputs: String,
}

impl Relay {
    #[must_use]
    pub fn new(group: char, outputs: impl Into<String>) -> Self {
        Self {
            group,
            outputs: outputs.into(),
        }
    }

    /// Output indices that parse as integers.
    #[must_use]
    pub fn output_indices(&self) -> Vec<u32> {
        self.outputs
            .split(',')
            .filter_map(|output| output.trim().parse().ok())
            .collect()
    }
}

/// Spatial location of a zone inside a warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub warehouse: String,
    pub group: String,
    pub row: i32,
    pub column: i32,
    pub layer: i32,
}

/// Temperature reading of one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub max: f32,
    pub avg: f32,
    pub min: f32,
    #[serde(with = "seconds_format")]
    pub at: Timestamp,
}

impl Temperature {
    /// Whether all three readings are exactly zero, which the hardware
    /// uses for "no data" rather than a genuine reading.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.max == 0.0 && self.avg == 0.0 && self.min == 0.0
    }
}

/// Latest alarm raised on a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmSnapshot {
    /// Offset along the fiber where the alarm was located.
    pub location: f32,
    #[serde(with = "seconds_format")]
    pub at: Timestamp,
    pub state: AlarmState,
}

/// A configured fiber segment, resolved from a DTS zone table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub channel_id: u8,
    pub host: String,
    /// Start of the segment along the fiber, in length units.
    pub start: f32,
    /// End of the segment (exclusive).
    pub finish: f32,
    /// Raw tag string as stored on the device.
    pub raw_tag: String,
    pub tags: Tags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<Relay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm: Option<AlarmSnapshot>,
}

impl Zone {
    /// Create a builder for constructing a [`Zone`].
    #[must_use]
    pub fn builder() -> ZoneBuilder {
        ZoneBuilder::default()
    }

    /// Whether `position` falls inside `[start, finish)`.
    #[must_use]
    pub fn contains(&self, position: f32) -> bool {
        position >= self.start && position < self.finish
    }

    /// Serialize to a JSON string, for log lines and downstream writers.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Zone [id: {}, name: {}, host: {}, channel: {}, start: {:.3}, finish: {:.3}, tags:",
            self.id, self.name, self.host, self.channel_id, self.start, self.finish
        )?;
        for (key, value) in &self.tags {
            write!(f, " [{key}: {value}]")?;
        }
        f.write_str("]")
    }
}

/// Step-by-step builder for [`Zone`].
#[derive(Debug, Default)]
pub struct ZoneBuilder {
    id: Option<ZoneId>,
    name: Option<String>,
    channel_id: u8,
    host: Option<String>,
    start: f32,
    finish: f32,
    raw_tag: Option<String>,
    tags: Tags,
    relay: Option<Relay>,
    coordinate: Option<Coordinate>,
}

impl ZoneBuilder {
    #[must_use]
    pub fn id(mut self, id: ZoneId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn channel_id(mut self, channel_id: u8) -> Self {
        self.channel_id = channel_id;
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn span(mut self, start: f32, finish: f32) -> Self {
        self.start = start;
        self.finish = finish;
        self
    }

    /// Keep the raw tag string alongside its decoded form.
    #[must_use]
    pub fn tags(mut self, raw: impl Into<String>, tags: Tags) -> Self {
        self.raw_tag = Some(raw.into());
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn relay(mut self, relay: Option<Relay>) -> Self {
        self.relay = relay;
        self
    }

    #[must_use]
    pub fn coordinate(mut self, coordinate: Option<Coordinate>) -> Self {
        self.coordinate = coordinate;
        self
    }

    /// Consume the builder and return a [`Zone`] without snapshots attached.
    #[must_use]
    pub fn build(self) -> Zone {
        Zone {
            id: self.id.unwrap_or(ZoneId::from_raw(0)),
            name: self.name.unwrap_or_default(),
            channel_id: self.channel_id,
            host: self.host.unwrap_or_default(),
            start: self.start,
            finish: self.finish,
            raw_tag: self.raw_tag.unwrap_or_default(),
            tags: self.tags,
            relay: self.relay,
            coordinate: self.coordinate,
            temperature: None,
            alarm: None,
        }
    }
}
