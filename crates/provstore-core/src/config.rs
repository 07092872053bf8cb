//! Storage-node configuration.
//!
//! Parsed from a TOML file at startup. The own-authority value decides
//! whether connector references resolve locally or through a remote probe,
//! so a misconfigured authority silently turns local lookups into network
//! round-trips — keep it in sync with the address peers use to reach this
//! node.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path prefix meta-bundles are served under.
pub const META_BUNDLE_PATH_PREFIX: &str = "/api/v1/documents/meta/";

/// Default timeout for connector existence probes.
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or misses required keys.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration of one provstore storage node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageNodeConfig {
    /// Identifier this node uses when it issues meta-bundle tokens.
    pub node_id: String,

    /// Authority (`host` or `host:port`) under which this node is
    /// reachable; references with this authority resolve locally.
    pub own_authority: String,

    /// Timeout in seconds for remote existence probes; a probe that times
    /// out counts as "not found".
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// When set, no tokens are requested from the trusted party and
    /// placeholder tokens are attached instead.
    #[serde(default)]
    pub disable_trusted_party: bool,

    /// Authority of the trusted-party service, when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_party_authority: Option<String>,
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

impl StorageNodeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The probe timeout as a [`Duration`].
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config = StorageNodeConfig::from_toml(
            r#"
            node_id = "provstore-hospital"
            own_authority = "prov-storage-hospital:8000"
            "#,
        )
        .unwrap();
        assert_eq!(config.own_authority, "prov-storage-hospital:8000");
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert!(!config.disable_trusted_party);
    }

    #[test]
    fn parses_full_config() {
        let config = StorageNodeConfig::from_toml(
            r#"
            node_id = "provstore-hospital"
            own_authority = "prov-storage-hospital:8000"
            probe_timeout_secs = 3
            disable_trusted_party = true
            trusted_party_authority = "trusted-party:8020"
            "#,
        )
        .unwrap();
        assert_eq!(config.probe_timeout(), Duration::from_secs(3));
        assert!(config.disable_trusted_party);
        assert_eq!(
            config.trusted_party_authority.as_deref(),
            Some("trusted-party:8020")
        );
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let err = StorageNodeConfig::from_toml("node_id = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
