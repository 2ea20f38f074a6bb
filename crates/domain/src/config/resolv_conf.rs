use super::errors::ConfigError;
use super::server::{ServerConfig, DEFAULT_DNS_PORT};
use std::net::IpAddr;
use std::path::Path;

pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// The parts of resolv.conf(5) a stub resolver cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvConf {
    pub nameservers: Vec<IpAddr>,
}

impl ResolvConf {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::read(path, e))?;
        Ok(Self::parse(&contents))
    }

    /// Unparsable nameserver entries are skipped, as libc resolvers do.
    pub fn parse(contents: &str) -> Self {
        let mut nameservers = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let mut fields = line.split_whitespace();
            if fields.next() != Some("nameserver") {
                continue;
            }
            let Some(raw) = fields.next() else {
                continue;
            };
            let raw = raw.trim_start_matches('[').trim_end_matches(']');
            let raw = raw.split('%').next().unwrap_or(raw);
            if let Ok(ip) = raw.parse::<IpAddr>() {
                nameservers.push(ip);
            }
        }

        Self { nameservers }
    }

    pub fn servers(&self) -> Vec<ServerConfig> {
        self.nameservers
            .iter()
            .map(|ip| ServerConfig::new(ip.to_string(), DEFAULT_DNS_PORT))
            .collect()
    }
}
