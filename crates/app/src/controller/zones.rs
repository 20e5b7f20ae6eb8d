//! Zone table sync and tag resolution.

use std::sync::Arc;

use dtsgate_domain::error::GatewayError;
use dtsgate_domain::id::ZoneId;
use dtsgate_domain::tag::{TAG_RELAY, Tags, parse_coordinate, parse_relay, tag_segments};
use dtsgate_domain::zone::Zone;

use super::{DtsController, Inner};
use crate::ports::dts_sdk::{DefenceZoneRow, DtsClient};
use crate::ports::DtsSdk;

impl<S: DtsSdk> DtsController<S> {
    /// Sync the zone table of every channel, `1..=channel_num`.
    ///
    /// A channel that fails keeps its previous zones; the failure is
    /// logged. Returns the number of zones known afterwards.
    #[tracing::instrument(skip(self), fields(device = %self.inner.id))]
    pub async fn sync_zones(&self) -> usize {
        for channel_id in 1..=self.inner.config.channel_num {
            match self.sync_channel_zones(channel_id).await {
                Ok(zones) => {
                    tracing::info!(channel_id, zones = zones.len(), "channel zones synced");
                }
                Err(err) => {
                    tracing::warn!(channel_id, error = %err, "channel zone sync failed");
                }
            }
        }
        self.zone_count()
    }

    /// Fetch the zone table of one channel and replace that channel's zones.
    ///
    /// Malformed tags, relay values and coordinates are logged and leave
    /// the zone without the derived data; the zone itself is kept.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotConnected`] before [`run`](Self::run).
    /// - [`GatewayError::Hardware`] when the query fails.
    /// - [`GatewayError::Rejected`] when the hardware answers without success.
    pub async fn sync_channel_zones(&self, channel_id: u8) -> Result<Vec<Zone>, GatewayError> {
        let client = self.inner.client()?;
        let response = client.defence_zones(channel_id).await?;
        if !response.success {
            return Err(GatewayError::Rejected {
                message: response.error_message,
            });
        }

        let zones: Vec<Zone> = response
            .rows
            .iter()
            .map(|row| self.inner.build_zone(channel_id, row))
            .collect();

        let mut state = self.inner.state.lock();
        state.zones.retain(|_, zone| zone.channel_id != channel_id);
        state
            .zones
            .extend(zones.iter().map(|zone| (zone.id, zone.clone())));
        Ok(zones)
    }
}

impl<S: DtsSdk> Inner<S> {
    pub(super) fn client(&self) -> Result<Arc<S::Client>, GatewayError> {
        self.client
            .lock()
            .clone()
            .ok_or_else(|| GatewayError::NotConnected {
                id: self.id.clone(),
            })
    }

    fn build_zone(&self, channel_id: u8, row: &DefenceZoneRow) -> Zone {
        let config = &self.config;
        let mut tags = Tags::new();
        for segment in tag_segments(&row.tag) {
            match segment {
                Ok((key, value)) => {
                    tags.insert(key, value);
                }
                Err(err) => {
                    tracing::warn!(channel_id, zone = %row.name, error = %err, "tag segment skipped");
                }
            }
        }

        let relay = if config.enable_relay {
            match tags.get(TAG_RELAY).map(|value| parse_relay(value)) {
                Some(Ok(relay)) => Some(relay),
                Some(Err(err)) => {
                    tracing::error!(channel_id, zone = %row.name, error = %err, "invalid relay tag");
                    None
                }
                None => None,
            }
        } else {
            None
        };

        let coordinate = if config.enable_warehouse {
            match parse_coordinate(&tags) {
                Ok(coordinate) => Some(coordinate),
                Err(err) => {
                    tracing::error!(channel_id, zone = %row.name, error = %err, "invalid coordinate tags");
                    None
                }
            }
        } else {
            None
        };

        Zone::builder()
            .id(ZoneId::compose(config.device_id, row.id))
            .name(row.name.as_str())
            .channel_id(row.channel_id)
            .host(config.host.as_str())
            .span(row.start, row.finish)
            .tags(row.tag.as_str(), tags)
            .relay(relay)
            .coordinate(coordinate)
            .build()
    }
}
