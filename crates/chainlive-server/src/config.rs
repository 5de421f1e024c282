//! Viewer server configuration.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// Where and how the viewer server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin (browser viewers served from elsewhere).
    #[serde(default = "default_cors")]
    pub cors: bool,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

fn default_cors() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors: default_cors(),
        }
    }
}

impl ServerConfig {
    /// `bind` is an IPv4 or IPv6 address; IPv6 may be written in brackets.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let host = self.bind.trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.bind.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
