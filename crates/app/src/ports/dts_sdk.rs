//! DTS SDK port: the vendor hardware collaborator.
//!
//! The SDK owns the wire protocol. It opens a connection handle per host,
//! reports connection changes through [`ConnectionHooks`] and delivers
//! notifications through subscribed [`NotificationCallback`]s. Both kinds
//! of callback fire on threads the SDK owns, so implementations of the
//! callbacks must never block.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dtsgate_domain::device::CallType;
use dtsgate_domain::error::GatewayError;

/// Connection-level callback, called with the host that changed.
pub type ConnectionCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Notification callback installed by a subscription.
pub type NotificationCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// The three connection callbacks installed when a handle is opened.
#[derive(Clone)]
pub struct ConnectionHooks {
    pub on_connected: ConnectionCallback,
    /// Not fatal: the SDK keeps retrying after a timeout.
    pub on_timeout: ConnectionCallback,
    pub on_disconnected: ConnectionCallback,
}

impl fmt::Debug for ConnectionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHooks").finish_non_exhaustive()
    }
}

/// Errors raised by SDK implementations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("cannot open connection to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("hardware request failed: {0}")]
    Request(String),

    #[error("subscription to {0} notifications failed")]
    Subscribe(CallType),
}

impl From<SdkError> for GatewayError {
    fn from(err: SdkError) -> Self {
        Self::Hardware(Box::new(err))
    }
}

/// One row of a channel's zone table.
#[derive(Debug, Clone, PartialEq)]
pub struct DefenceZoneRow {
    /// Vendor zone id, unique within the device.
    pub id: u32,
    pub name: String,
    pub channel_id: u8,
    pub start: f32,
    pub finish: f32,
    /// Raw `k1=v1;k2=v2;` tag string.
    pub tag: String,
}

/// Answer to a zone table query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefenceZoneResponse {
    pub success: bool,
    pub error_message: String,
    pub rows: Vec<DefenceZoneRow>,
}

/// Temperature of one zone, as reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawZoneTemp {
    pub id: u32,
    pub max: f32,
    pub avg: f32,
    pub min: f32,
}

/// Alarm on one zone, as reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawZoneAlarm {
    pub id: u32,
    pub max: f32,
    pub avg: f32,
    pub min: f32,
    /// Offset along the fiber where the alarm was located.
    pub location: f32,
    /// Vendor alarm state code.
    pub state: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTempNotify {
    pub device_id: u32,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub zones: Vec<RawZoneTemp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAlarmNotify {
    pub device_id: u32,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub zones: Vec<RawZoneAlarm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempSignalNotify {
    pub device_id: u32,
    pub channel_id: u8,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub real_length: f32,
    pub signal: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEventNotify {
    pub device_id: u32,
    pub channel_id: u8,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    /// Vendor fiber state code.
    pub event_type: i32,
    pub channel_length: f32,
}

/// A notification delivered by a subscribed callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ZoneTemp(ZoneTempNotify),
    ZoneAlarm(ZoneAlarmNotify),
    TempSignal(TempSignalNotify),
    DeviceEvent(DeviceEventNotify),
}

impl Notification {
    /// Subscription kind this notification is delivered under.
    #[must_use]
    pub fn call_type(&self) -> CallType {
        match self {
            Self::ZoneTemp(_) => CallType::Temperature,
            Self::ZoneAlarm(_) => CallType::Alarm,
            Self::TempSignal(_) => CallType::Signal,
            Self::DeviceEvent(_) => CallType::Event,
        }
    }
}

/// Entry point of the vendor SDK.
pub trait DtsSdk: Send + Sync + 'static {
    type Client: DtsClient;

    /// Open a connection handle to `host`.
    ///
    /// Returns as soon as the handle exists; the outcome of the connection
    /// attempt is reported later through `hooks`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Connect`] when no handle can be created.
    fn connect(&self, host: &str, hooks: ConnectionHooks) -> Result<Self::Client, SdkError>;
}

/// An open connection handle to one DTS host.
pub trait DtsClient: Send + Sync + 'static {
    /// Query the zone table of one channel.
    fn defence_zones(
        &self,
        channel_id: u8,
    ) -> impl Future<Output = Result<DefenceZoneResponse, SdkError>> + Send;

    /// Install `callback` for notifications of kind `call_type`.
    fn subscribe(
        &self,
        call_type: CallType,
        callback: NotificationCallback,
    ) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Release the handle. No callback fires afterwards.
    fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_notification_to_call_type() {
        let event = Notification::DeviceEvent(DeviceEventNotify {
            device_id: 1,
            channel_id: 1,
            timestamp: 0,
            event_type: 3,
            channel_length: 10.0,
        });
        assert_eq!(event.call_type(), CallType::Event);

        let alarm = Notification::ZoneAlarm(ZoneAlarmNotify {
            device_id: 1,
            timestamp: 0,
            zones: Vec::new(),
        });
        assert_eq!(alarm.call_type(), CallType::Alarm);
    }

    #[test]
    fn should_wrap_sdk_error_as_hardware_error() {
        let err: GatewayError = SdkError::Request("timeout".to_string()).into();
        assert!(matches!(err, GatewayError::Hardware(_)));
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("hardware request failed: timeout".to_string())
        );
    }
}
