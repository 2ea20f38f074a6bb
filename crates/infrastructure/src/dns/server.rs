use super::channel::{IoChannel, Transport};
use rdns_application::UpstreamHandle;
use rdns_domain::config::ServerConfig;
use rdns_domain::DomainError;
use std::net::SocketAddr;
use std::sync::Arc;

/// A configured upstream with fixed pools of UDP and TCP channel slots.
///
/// Slots start empty and are filled the first time a request picks them;
/// a slot is emptied again when its channel fails.
#[derive(Debug)]
pub struct Server {
    name: Arc<str>,
    addr: SocketAddr,
    upstream: UpstreamHandle,
    udp: Vec<Option<IoChannel>>,
    tcp: Vec<Option<IoChannel>>,
}

impl Server {
    pub(crate) fn new(config: &ServerConfig, upstream: UpstreamHandle) -> Result<Self, DomainError> {
        let addr = config
            .socket_addr()
            .ok_or_else(|| DomainError::InvalidServerAddress(config.name.clone()))?;
        if config.udp_channels == 0 {
            return Err(DomainError::ConfigError(format!(
                "server {} needs at least one UDP channel",
                config.name
            )));
        }

        Ok(Self {
            name: Arc::from(addr.to_string()),
            addr,
            upstream,
            udp: (0..config.udp_channels).map(|_| None).collect(),
            tcp: (0..config.tcp_channels).map(|_| None).collect(),
        })
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn upstream(&self) -> UpstreamHandle {
        self.upstream
    }

    pub(crate) fn set_upstream(&mut self, upstream: UpstreamHandle) {
        self.upstream = upstream;
    }

    pub fn pool_size(&self, transport: Transport) -> usize {
        self.pool(transport).len()
    }

    /// Open channels of one kind.
    pub fn channels(&self, transport: Transport) -> impl Iterator<Item = &IoChannel> {
        self.pool(transport).iter().flatten()
    }

    pub(crate) fn pool(&self, transport: Transport) -> &[Option<IoChannel>] {
        match transport {
            Transport::Udp => &self.udp,
            Transport::Tcp => &self.tcp,
        }
    }

    pub(crate) fn pool_mut(&mut self, transport: Transport) -> &mut [Option<IoChannel>] {
        match transport {
            Transport::Udp => &mut self.udp,
            Transport::Tcp => &mut self.tcp,
        }
    }

    pub(crate) fn slot_mut(&mut self, transport: Transport, slot: usize) -> Option<&mut IoChannel> {
        self.pool_mut(transport).get_mut(slot)?.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pools_sized_from_config() {
        let mut config = ServerConfig::new("192.0.2.53", 5353);
        config.udp_channels = 4;
        config.tcp_channels = 2;

        let server = Server::new(&config, UpstreamHandle(0)).unwrap();
        assert_eq!(server.pool_size(Transport::Udp), 4);
        assert_eq!(server.pool_size(Transport::Tcp), 2);
        assert_eq!(server.channels(Transport::Udp).count(), 0);
        assert_eq!(server.name().as_ref(), "192.0.2.53:5353");
    }

    #[test]
    fn test_hostname_rejected() {
        let config = ServerConfig::new("dns.example", 53);
        assert!(matches!(
            Server::new(&config, UpstreamHandle(0)),
            Err(DomainError::InvalidServerAddress(_))
        ));
    }

    #[test]
    fn test_empty_udp_pool_rejected() {
        let mut config = ServerConfig::new("192.0.2.53", 53);
        config.udp_channels = 0;
        assert!(Server::new(&config, UpstreamHandle(0)).is_err());
    }
}
