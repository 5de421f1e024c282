//! Effective configuration: defaults, then the YAML file, then flags.
//!
//! ```yaml
//! upstream:
//!   host: localhost
//!   port: 1337
//!   tls: false
//! network: preprod
//! recent_capacity: 20
//! server:
//!   bind: 0.0.0.0
//!   port: 5000
//!   cors: true
//! log:
//!   level: info
//!   components:
//!     chainlive-ogmios: debug
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use chainlive_core::config::PipelineConfig;
use chainlive_core::units::Network;
use chainlive_server::ServerConfig;

use crate::logging::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Flags shared by `run` and `info`. Unset flags leave the file value alone.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short, long, env = "CHAINLIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ogmios host
    #[arg(long, env = "CHAINLIVE_OGMIOS_HOST")]
    pub ogmios_host: Option<String>,

    /// Ogmios port
    #[arg(long, env = "CHAINLIVE_OGMIOS_PORT")]
    pub ogmios_port: Option<u16>,

    /// Connect to Ogmios over wss://
    #[arg(long)]
    pub tls: bool,

    /// Network preset for the epoch length: mainnet | preprod | preview
    #[arg(long, env = "CHAINLIVE_NETWORK")]
    pub network: Option<Network>,

    /// Explicit epoch length in slots (overrides --network)
    #[arg(long, env = "CHAINLIVE_EPOCH_LENGTH")]
    pub epoch_length: Option<u64>,

    /// Number of recent blocks / transactions kept in memory
    #[arg(long)]
    pub recent_capacity: Option<usize>,

    /// Viewer server bind address
    #[arg(long, env = "CHAINLIVE_BIND")]
    pub bind: Option<String>,

    /// Viewer server port
    #[arg(long, env = "CHAINLIVE_PORT")]
    pub port: Option<u16>,

    /// Allow cross-origin viewers (true | false)
    #[arg(long)]
    pub cors: Option<bool>,

    /// Global log level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit JSON structured logs
    #[arg(long)]
    pub json_logs: bool,
}

impl Settings {
    /// Load the file named by `args` (if any) and apply the flag overrides.
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let base = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let settings = base.with_overrides(args);
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config '{}'", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn with_overrides(mut self, args: &ConfigArgs) -> Self {
        if let Some(host) = &args.ogmios_host {
            self.pipeline.upstream.host = host.clone();
        }
        if let Some(port) = args.ogmios_port {
            self.pipeline.upstream.port = port;
        }
        if args.tls {
            self.pipeline.upstream.tls = true;
        }
        if let Some(network) = args.network {
            self.pipeline.network = network;
        }
        if let Some(slots) = args.epoch_length {
            self.pipeline.epoch_length = Some(slots);
        }
        if let Some(n) = args.recent_capacity {
            self.pipeline.recent_capacity = n;
        }
        if let Some(bind) = &args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(cors) = args.cors {
            self.server.cors = cors;
        }
        if let Some(level) = &args.log_level {
            self.log.level = level.clone();
        }
        if args.json_logs {
            self.log.json = true;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate().context("invalid pipeline settings")?;
        self.server
            .socket_addr()
            .context("invalid server settings")?;
        Ok(())
    }
}
