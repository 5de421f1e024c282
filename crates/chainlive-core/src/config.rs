//! Pipeline configuration and fluent builder.
//!
//! # Example
//!
//! ```rust
//! use chainlive_core::config::PipelineBuilder;
//! use chainlive_core::units::Network;
//!
//! let config = PipelineBuilder::new()
//!     .ogmios("relay.example.org", 443)
//!     .tls(true)
//!     .network(Network::Preview)
//!     .recent_capacity(50)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.epoch_length(), 86_400);
//! ```

use serde::{Deserialize, Serialize};

use crate::broadcast::DEFAULT_CHANNEL_CAPACITY;
use crate::error::PipelineError;
use crate::units::{EpochSchedule, Network};
use crate::window::DEFAULT_CAPACITY;

/// Where the upstream chain-sync endpoint lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use `wss://` instead of `ws://`.
    #[serde(default)]
    pub tls: bool,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    1337
}

impl UpstreamConfig {
    pub fn url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: false,
        }
    }
}

/// Configuration consumed by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Network preset used for the epoch length.
    #[serde(default = "default_network")]
    pub network: Network,
    /// Explicit epoch length in slots; overrides the network preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_length: Option<u64>,
    /// Entries kept per recency buffer.
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    /// Events buffered per subscriber before it starts skipping.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_network() -> Network {
    Network::Preprod
}

fn default_recent_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            network: default_network(),
            epoch_length: None,
            recent_capacity: default_recent_capacity(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl PipelineConfig {
    /// Effective epoch length: explicit override, else the network preset.
    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
            .unwrap_or_else(|| self.network.epoch_length())
    }

    pub fn epoch_schedule(&self) -> EpochSchedule {
        EpochSchedule::new(self.epoch_length())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.epoch_length() == 0 {
            return Err(PipelineError::Config("epoch length must be positive".into()));
        }
        if self.recent_capacity == 0 {
            return Err(PipelineError::Config("recent capacity must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::Config("channel capacity must be at least 1".into()));
        }
        if self.upstream.host.trim().is_empty() {
            return Err(PipelineError::Config("upstream host is empty".into()));
        }
        Ok(())
    }
}

/// Fluent builder for [`PipelineConfig`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the Ogmios host and port.
    pub fn ogmios(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.upstream.host = host.into();
        self.config.upstream.port = port;
        self
    }

    /// Connect over TLS.
    pub fn tls(mut self, tls: bool) -> Self {
        self.config.upstream.tls = tls;
        self
    }

    /// Use a network's epoch length.
    pub fn network(mut self, network: Network) -> Self {
        self.config.network = network;
        self
    }

    /// Override the epoch length in slots.
    pub fn epoch_length(mut self, slots: u64) -> Self {
        self.config.epoch_length = Some(slots);
        self
    }

    pub fn recent_capacity(mut self, n: usize) -> Self {
        self.config.recent_capacity = n;
        self
    }

    pub fn channel_capacity(mut self, n: usize) -> Self {
        self.config.channel_capacity = n;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let cfg = PipelineBuilder::new().build().unwrap();
        assert_eq!(cfg.upstream.url(), "ws://localhost:1337");
        assert_eq!(cfg.network, Network::Preprod);
        assert_eq!(cfg.epoch_length(), 432_000);
        assert_eq!(cfg.recent_capacity, 20);
        assert_eq!(cfg.channel_capacity, 1_024);
    }

    #[test]
    fn builder_custom() {
        let cfg = PipelineBuilder::new()
            .ogmios("ogmios.internal", 443)
            .tls(true)
            .network(Network::Preview)
            .epoch_length(100)
            .recent_capacity(5)
            .build()
            .unwrap();
        assert_eq!(cfg.upstream.url(), "wss://ogmios.internal:443");
        assert_eq!(cfg.epoch_length(), 100);
        assert_eq!(cfg.epoch_schedule().epoch_of(250), 2);
        assert_eq!(cfg.recent_capacity, 5);
    }

    #[test]
    fn rejects_zero_values() {
        assert!(PipelineBuilder::new().epoch_length(0).build().is_err());
        assert!(PipelineBuilder::new().recent_capacity(0).build().is_err());
        assert!(PipelineBuilder::new().channel_capacity(0).build().is_err());
        assert!(PipelineBuilder::new().ogmios(" ", 1).build().is_err());
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"upstream": {"port": 9000}, "network": "preview"}"#).unwrap();
        assert_eq!(cfg.upstream.host, "localhost");
        assert_eq!(cfg.upstream.port, 9000);
        assert_eq!(cfg.epoch_length(), 86_400);
        assert_eq!(cfg.recent_capacity, 20);
    }
}
