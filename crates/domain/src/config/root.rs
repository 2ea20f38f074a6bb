use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

use super::errors::ConfigError;
use super::fake::FakeReplyConfig;
use super::logging::LoggingConfig;
use super::resolv_conf::{ResolvConf, RESOLV_CONF};
use super::resolver::ResolverConfig;
use super::server::ServerConfig;

/// Main configuration structure for the rdns resolver
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Engine-wide settings (timeouts, retransmits, channel rotation)
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Upstream DNS servers
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Canned answers that bypass the network
    #[serde(default)]
    pub fake_replies: Vec<FakeReplyConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. rdns.toml in current directory
    /// 3. /etc/rdns/config.toml
    /// 4. Default configuration
    ///
    /// When no server survives the overrides, nameservers are taken from
    /// /etc/resolv.conf.
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new("rdns.toml").exists() {
            Self::from_file("rdns.toml")?
        } else if Path::new("/etc/rdns/config.toml").exists() {
            Self::from_file("/etc/rdns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides)?;
        if config.servers.is_empty() && Path::new(RESOLV_CONF).exists() {
            config.servers = ResolvConf::from_file(RESOLV_CONF)?.servers();
        }
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) -> Result<(), ConfigError> {
        if !overrides.servers.is_empty() {
            self.servers = overrides
                .servers
                .iter()
                .map(|s| ServerConfig::from_address(s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.resolver.timeout_ms = timeout_ms;
        }
        if let Some(retransmits) = overrides.retransmits {
            self.resolver.retransmits = retransmits;
        }
        if overrides.enable_dnssec {
            self.resolver.enable_dnssec = true;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Validation(
                "No DNS servers configured".to_string(),
            ));
        }

        if self.resolver.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Request timeout cannot be 0".to_string(),
            ));
        }

        for server in &self.servers {
            if server.name.parse::<IpAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "Server '{}' is not an IP address",
                    server.name
                )));
            }
            if server.port == 0 {
                return Err(ConfigError::Validation(format!(
                    "Server '{}' has port 0",
                    server.name
                )));
            }
            if server.udp_channels == 0 {
                return Err(ConfigError::Validation(format!(
                    "Server '{}' has no UDP channels",
                    server.name
                )));
            }
        }

        for fake in &self.fake_replies {
            if !fake.record_type.is_requestable() {
                return Err(ConfigError::Validation(format!(
                    "Fake reply for '{}' uses non-query type {}",
                    fake.name, fake.record_type
                )));
            }
            fake.entries()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub servers: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub retransmits: Option<u32>,
    pub enable_dnssec: bool,
    pub log_level: Option<String>,
}
