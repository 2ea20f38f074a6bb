use super::{Resolver, ResolverSettings};
use crate::dns::load_balancer::HealthTrackingUpstreams;
use crate::dns::transport::SystemSocketFactory;
use rdns_application::{AsyncEngine, CryptoPlugin, SocketFactory, UpstreamManager};
use rdns_domain::config::{FakeReplyConfig, ServerConfig};
use rdns_domain::{Config, DomainError};
use tracing::info;

pub struct ResolverBuilder {
    engine: Box<dyn AsyncEngine>,
    settings: ResolverSettings,
    servers: Vec<ServerConfig>,
    fake_replies: Vec<FakeReplyConfig>,
    sockets: Option<Box<dyn SocketFactory>>,
    upstream: Option<Box<dyn UpstreamManager>>,
    crypto: Option<Box<dyn CryptoPlugin>>,
}

impl ResolverBuilder {
    pub fn new(engine: Box<dyn AsyncEngine>) -> Self {
        Self {
            engine,
            settings: ResolverSettings::default(),
            servers: Vec::new(),
            fake_replies: Vec::new(),
            sockets: None,
            upstream: None,
            crypto: None,
        }
    }

    /// Takes settings, servers and fake replies from a loaded configuration.
    pub fn from_config(config: &Config, engine: Box<dyn AsyncEngine>) -> Self {
        Self::new(engine)
            .with_settings(ResolverSettings::from(&config.resolver))
            .with_servers(config.servers.iter().cloned())
            .with_fake_replies(config.fake_replies.iter().cloned())
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.servers.push(server);
        self
    }

    pub fn with_servers(mut self, servers: impl IntoIterator<Item = ServerConfig>) -> Self {
        self.servers.extend(servers);
        self
    }

    pub fn with_fake_replies(mut self, fakes: impl IntoIterator<Item = FakeReplyConfig>) -> Self {
        self.fake_replies.extend(fakes);
        self
    }

    pub fn with_socket_factory(mut self, sockets: Box<dyn SocketFactory>) -> Self {
        self.sockets = Some(sockets);
        self
    }

    pub fn with_upstream_manager(mut self, upstream: Box<dyn UpstreamManager>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_crypto(mut self, crypto: Box<dyn CryptoPlugin>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    pub fn build(self) -> Result<Resolver, DomainError> {
        info!(
            servers = self.servers.len(),
            fake_replies = self.fake_replies.len(),
            dnssec = self.settings.dnssec,
            "Building DNS resolver"
        );

        let sockets = self
            .sockets
            .unwrap_or_else(|| Box::new(SystemSocketFactory::new()));
        let upstream = self
            .upstream
            .unwrap_or_else(|| Box::new(HealthTrackingUpstreams::default()));

        let mut resolver = Resolver::new(self.engine, sockets, upstream, self.settings);
        for server in &self.servers {
            resolver.add_server(server)?;
        }
        for fake in &self.fake_replies {
            resolver.add_fake_reply(&fake.name, fake.record_type, fake.rcode, fake.entries()?)?;
        }
        if let Some(crypto) = self.crypto {
            resolver.set_crypto(crypto);
        }

        resolver.start();
        Ok(resolver)
    }
}
