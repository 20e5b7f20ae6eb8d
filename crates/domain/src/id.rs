//! Identifiers: the composite zone id and UUID-backed typed newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Multiplier packing a vendor device id above the raw zone id.
pub const ZONE_ID_STRIDE: u64 = 1_000_000;

/// Composite zone identity: `device_id * 1_000_000 + raw_zone_id`.
///
/// Encodes which device owns the zone without holding a pointer to it.
/// Distinct `(device_id, raw_zone_id)` pairs never collide as long as the
/// raw zone id stays below [`ZONE_ID_STRIDE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(u64);

impl ZoneId {
    /// Pack a vendor device id and a raw zone id.
    #[must_use]
    pub fn compose(device_id: u32, raw_zone_id: u32) -> Self {
        Self(u64::from(device_id) * ZONE_ID_STRIDE + u64::from(raw_zone_id))
    }

    /// Wrap an already-composed value.
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The packed integer.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// The device part of the id.
    #[must_use]
    pub fn device_id(self) -> u64 {
        self.0 / ZONE_ID_STRIDE
    }

    /// The raw, per-device zone id.
    #[must_use]
    pub fn raw_zone_id(self) -> u64 {
        self.0 % ZONE_ID_STRIDE
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a job registered on the shared scheduler.
    JobId
);

define_id!(
    /// Identifier of a lifecycle event travelling on the device manager bus.
    EventId
);
