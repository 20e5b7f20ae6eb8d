//! Device vocabulary: kinds, connection status, lifecycle events and
//! hardware notification kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of device held by the device manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Dts,
    Relay,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dts => f.write_str("DTS"),
            Self::Relay => f.write_str("relay"),
        }
    }
}

/// Connection status of a device.
///
/// ```text
/// Unconnected ──► Connecting ──► Connected
///                   ▲   │  ▲         │
///                   │   ▼  └─timeout─┘
///                 Disconnected ◄─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unconnected,
    Connecting,
    Connected,
    Disconnected,
}

impl Status {
    /// Whether a connection attempt is in progress or established.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Whether the hardware may move a device from `self` to `next`.
    ///
    /// Repeated timeouts keep a device in `Connecting`; nothing returns to
    /// `Unconnected`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unconnected | Self::Disconnected, Self::Connecting)
                | (
                    Self::Connecting,
                    Self::Connecting | Self::Connected | Self::Disconnected
                )
                | (Self::Connected, Self::Connecting | Self::Disconnected)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => f.write_str("unconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Point-in-time status row reported by the device manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub id: String,
    pub kind: DeviceKind,
    pub status: Status,
}

/// Lifecycle events travelling on the device manager bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceEventType {
    Error,
    Add,
    Run,
    Update,
    Close,
    Delete,
}

impl fmt::Display for DeviceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Add => f.write_str("add"),
            Self::Run => f.write_str("run"),
            Self::Update => f.write_str("update"),
            Self::Close => f.write_str("close"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Hardware notification kinds a DTS controller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Alarm,
    Temperature,
    Signal,
    Event,
}

impl CallType {
    /// Every notification kind, in subscription order.
    pub const ALL: [Self; 4] = [Self::Alarm, Self::Temperature, Self::Signal, Self::Event];
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alarm => f.write_str("alarm"),
            Self::Temperature => f.write_str("temperature"),
            Self::Signal => f.write_str("signal"),
            Self::Event => f.write_str("event"),
        }
    }
}
