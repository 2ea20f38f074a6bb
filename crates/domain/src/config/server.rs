use super::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

pub const DEFAULT_DNS_PORT: u16 = 53;
pub const DEFAULT_UDP_CHANNELS: usize = 8;
pub const DEFAULT_TCP_CHANNELS: usize = 1;

/// One `[[servers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// IP literal of the server.
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_udp_channels")]
    pub udp_channels: usize,

    #[serde(default = "default_tcp_channels")]
    pub tcp_channels: usize,

    /// Lower values are preferred by the default upstream manager.
    #[serde(default)]
    pub priority: u32,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            udp_channels: DEFAULT_UDP_CHANNELS,
            tcp_channels: DEFAULT_TCP_CHANNELS,
            priority: 0,
        }
    }

    /// Accepts `"192.0.2.1"`, `"192.0.2.1:5353"`, `"2001:db8::1"` and
    /// `"[2001:db8::1]:5353"`.
    pub fn from_address(address: &str) -> Result<Self, ConfigError> {
        let address = address.trim();
        if let Ok(sa) = address.parse::<SocketAddr>() {
            return Ok(Self::new(sa.ip().to_string(), sa.port()));
        }
        let bare = address.trim_start_matches('[').trim_end_matches(']');
        bare.parse::<IpAddr>()
            .map(|ip| Self::new(ip.to_string(), DEFAULT_DNS_PORT))
            .map_err(|_| ConfigError::Validation(format!("Invalid server address '{}'", address)))
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.name
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}

fn default_port() -> u16 {
    DEFAULT_DNS_PORT
}

fn default_udp_channels() -> usize {
    DEFAULT_UDP_CHANNELS
}

fn default_tcp_channels() -> usize {
    DEFAULT_TCP_CHANNELS
}
