//! Relay board configuration, one `[[relay]]` table per board.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay group letter zones refer to in their `relay=` tag.
    pub tag: String,
    /// Base URL of the board, e.g. `http://192.168.1.50`.
    pub url: String,
    /// When set, outputs switch off on their own after this many seconds.
    pub reset_secs: Option<u64>,
    /// Health check period; `0` disables the periodic ping.
    pub ping_interval_secs: u64,
    /// Timeout of every HTTP request.
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            tag: "A".to_string(),
            url: "http://127.0.0.1:8080".to_string(),
            reset_secs: None,
            ping_interval_secs: 60,
            timeout_secs: 3,
        }
    }
}

impl RelayConfig {
    /// Device id, `relay-<tag>`.
    #[must_use]
    pub fn device_id(&self) -> String {
        format!("relay-{}", self.tag)
    }

    #[must_use]
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub(crate) fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.device_id(), "relay-A");
        assert_eq!(config.reset_secs, None);
        assert_eq!(config.ping_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn should_deserialize_from_toml() {
        let config: RelayConfig = toml::from_str(
            r#"
            tag = "B"
            url = "http://10.0.0.7/"
            reset_secs = 5
            ping_interval_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.device_id(), "relay-B");
        assert_eq!(config.base_url(), "http://10.0.0.7");
        assert_eq!(config.reset_secs, Some(5));
        assert!(config.ping_interval().is_none());
        assert_eq!(config.timeout_secs, 3);
    }
}
