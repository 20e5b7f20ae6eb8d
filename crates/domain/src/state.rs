//! Vendor state vocabularies: defence-zone alarm states and fiber states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Defence-zone state reported with every alarm notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    #[default]
    Normal,
    WarnDiffer,
    WarnUp,
    WarnTemp,
    AlarmDiffer,
    AlarmUp,
    AlarmTemp,
    WarnLowTemp,
    AlarmLowTemp,
    /// A code this gateway does not know about.
    Unknown(i32),
}

impl AlarmState {
    /// Whether this state is one of the alarm (not warning) levels.
    #[must_use]
    pub fn is_alarm(self) -> bool {
        matches!(
            self,
            Self::AlarmDiffer | Self::AlarmUp | Self::AlarmTemp | Self::AlarmLowTemp
        )
    }

    /// Whether this state is one of the pre-alarm warning levels.
    #[must_use]
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Self::WarnDiffer | Self::WarnUp | Self::WarnTemp | Self::WarnLowTemp
        )
    }
}

impl From<i32> for AlarmState {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Normal,
            1 => Self::WarnDiffer,
            2 => Self::WarnUp,
            3 => Self::WarnTemp,
            4 => Self::AlarmDiffer,
            5 => Self::AlarmUp,
            6 => Self::AlarmTemp,
            7 => Self::WarnLowTemp,
            8 => Self::AlarmLowTemp,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::WarnDiffer => f.write_str("temperature difference warning"),
            Self::WarnUp => f.write_str("temperature rise warning"),
            Self::WarnTemp => f.write_str("fixed temperature warning"),
            Self::AlarmDiffer => f.write_str("temperature difference alarm"),
            Self::AlarmUp => f.write_str("temperature rise alarm"),
            Self::AlarmTemp => f.write_str("fixed temperature alarm"),
            Self::WarnLowTemp => f.write_str("low temperature warning"),
            Self::AlarmLowTemp => f.write_str("low temperature alarm"),
            Self::Unknown(code) => write!(f, "unknown zone state {code}"),
        }
    }
}

/// Physical state of a fiber channel, reported by device events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiberState {
    Ok,
    Unplugged,
    Plugged,
    Broken,
    TooLong,
    LossTooHigh,
    /// A code this gateway does not know about.
    Unknown(i32),
}

impl From<i32> for FiberState {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Unplugged,
            2 => Self::Plugged,
            3 => Self::Broken,
            4 => Self::TooLong,
            5 => Self::LossTooHigh,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for FiberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("fiber ok"),
            Self::Unplugged => f.write_str("fiber unplugged"),
            Self::Plugged => f.write_str("fiber plugged in"),
            Self::Broken => f.write_str("fiber broken"),
            Self::TooLong => f.write_str("fiber too long"),
            Self::LossTooHigh => f.write_str("fiber loss too high"),
            Self::Unknown(code) => write!(f, "unknown fiber state {code}"),
        }
    }
}
