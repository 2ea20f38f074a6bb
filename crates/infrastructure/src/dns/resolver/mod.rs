//! The resolver: owns servers, their IO channels and every in-flight
//! request, and reacts to events delivered by the async engine.
//!
//! All state lives in one place and is touched only from the thread that
//! calls [`Resolver::dispatch`]. Channels and timers refer to requests by
//! handle; events naming a retired channel or timer are ignored.

mod builder;
mod core;
mod io;
mod maintenance;

pub use builder::ResolverBuilder;

use super::channel::{IoChannel, Transport};
use super::fake::FakeReplyRegistry;
use super::request::{Request, RequestHandle, RequestOptions, RequestState};
use super::server::Server;
use rdns_application::{
    AsyncEngine, AsyncHandle, ChannelId, CryptoPlugin, EngineEvent, SocketFactory, TimerToken,
    UpstreamHandle, UpstreamManager,
};
use rdns_domain::config::{ResolverConfig, ServerConfig};
use rdns_domain::DomainError;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Options for requests submitted without explicit ones.
    pub defaults: RequestOptions,
    /// Zero disables channel rotation.
    pub max_channel_uses: u64,
    pub refresh_interval: Duration,
    pub dnssec: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            defaults: RequestOptions::from(config),
            max_channel_uses: config.max_channel_uses,
            refresh_interval: config.refresh_interval(),
            dnssec: config.enable_dnssec,
        }
    }
}

/// Snapshot of a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo {
    pub state: RequestState,
    pub transport: Transport,
    pub txid: u16,
    pub retransmits: u32,
    pub channel: Option<ChannelId>,
    pub server: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelRoute {
    server: usize,
    transport: Transport,
    slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerTarget {
    Request(RequestHandle),
    Maintenance,
}

pub struct Resolver {
    servers: Vec<Server>,
    engine: Box<dyn AsyncEngine>,
    sockets: Box<dyn SocketFactory>,
    upstream: Box<dyn UpstreamManager>,
    crypto: Option<Box<dyn CryptoPlugin>>,
    fake_replies: FakeReplyRegistry,
    requests: FxHashMap<RequestHandle, Request>,
    channels: FxHashMap<ChannelId, ChannelRoute>,
    timers: FxHashMap<TimerToken, TimerTarget>,
    settings: ResolverSettings,
    periodic: Option<(AsyncHandle, TimerToken)>,
    next_request: u64,
    next_channel: u64,
    next_timer: u64,
}

impl Resolver {
    pub fn new(
        engine: Box<dyn AsyncEngine>,
        sockets: Box<dyn SocketFactory>,
        upstream: Box<dyn UpstreamManager>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            servers: Vec::new(),
            engine,
            sockets,
            upstream,
            crypto: None,
            fake_replies: FakeReplyRegistry::new(),
            requests: FxHashMap::default(),
            channels: FxHashMap::default(),
            timers: FxHashMap::default(),
            settings,
            periodic: None,
            next_request: 0,
            next_channel: 0,
            next_timer: 0,
        }
    }

    pub fn set_crypto(&mut self, plugin: Box<dyn CryptoPlugin>) {
        info!(plugin = plugin.name(), "Crypto plugin attached");
        self.crypto = Some(plugin);
    }

    pub fn add_server(&mut self, config: &ServerConfig) -> Result<(), DomainError> {
        let mut server = Server::new(config, UpstreamHandle(self.servers.len()))?;
        let upstream = self.upstream.register(server.name(), config.priority);
        server.set_upstream(upstream);
        info!(
            server = %server.name(),
            udp_channels = config.udp_channels,
            tcp_channels = config.tcp_channels,
            "DNS server added"
        );
        self.servers.push(server);
        Ok(())
    }

    /// Arms the periodic maintenance timer when channel rotation is enabled.
    pub fn start(&mut self) {
        info!(
            servers = self.servers.len(),
            max_channel_uses = self.settings.max_channel_uses,
            dnssec = self.settings.dnssec,
            "Resolver started"
        );
        if self.periodic.is_some()
            || self.settings.max_channel_uses == 0
            || self.settings.refresh_interval.is_zero()
        {
            return;
        }
        let token = self.next_timer_token();
        let handle = self
            .engine
            .add_periodic(self.settings.refresh_interval, token);
        self.timers.insert(token, TimerTarget::Maintenance);
        self.periodic = Some((handle, token));
    }

    /// Entry point for every engine notification.
    pub fn dispatch(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Readable(channel) => self.on_readable(channel),
            EngineEvent::Writable(channel) => self.on_writable(channel),
            EngineEvent::Timeout(token) => match self.timers.get(&token).copied() {
                Some(TimerTarget::Request(handle)) => {
                    self.timers.remove(&token);
                    if let Some(request) = self.requests.get_mut(&handle) {
                        request.timer = None;
                    }
                    self.on_timeout(handle);
                }
                Some(TimerTarget::Maintenance) => self.maintain(),
                None => trace!(token = token.0, "Event for a disarmed timer ignored"),
            },
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn fake_replies(&self) -> &FakeReplyRegistry {
        &self.fake_replies
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn request_info(&self, handle: RequestHandle) -> Option<RequestInfo> {
        self.requests.get(&handle).map(|request| RequestInfo {
            state: request.state,
            transport: request.transport,
            txid: request.txid,
            retransmits: request.retransmits,
            channel: request.channel,
            server: request.server,
        })
    }

    fn next_request_handle(&mut self) -> RequestHandle {
        self.next_request += 1;
        RequestHandle(self.next_request)
    }

    fn next_channel_id(&mut self) -> ChannelId {
        self.next_channel += 1;
        ChannelId(self.next_channel)
    }

    fn next_timer_token(&mut self) -> TimerToken {
        self.next_timer += 1;
        TimerToken(self.next_timer)
    }
}

/// Looks up a live channel through the route table. Takes the fields
/// separately so callers can keep other parts of the resolver borrowed.
fn route_channel<'a>(
    servers: &'a mut [Server],
    routes: &FxHashMap<ChannelId, ChannelRoute>,
    id: ChannelId,
) -> Option<&'a mut IoChannel> {
    let route = routes.get(&id)?;
    servers
        .get_mut(route.server)?
        .slot_mut(route.transport, route.slot)
        .filter(|channel| channel.id() == id)
}

impl Drop for Resolver {
    /// Releases every registration. Pending callbacks are dropped unrun.
    fn drop(&mut self) {
        if let Some((handle, _)) = self.periodic.take() {
            self.engine.cancel(handle);
        }
        for request in self.requests.values_mut() {
            if let Some((timer, _)) = request.timer.take() {
                self.engine.cancel(timer);
            }
        }
        let abandoned = self.requests.len();
        self.requests.clear();

        for server in &mut self.servers {
            for transport in [Transport::Udp, Transport::Tcp] {
                for channel in server.pool_mut(transport).iter_mut().flatten() {
                    channel.close(self.engine.as_mut());
                }
            }
        }
        self.channels.clear();
        self.timers.clear();
        debug!(abandoned, "Resolver released");
    }
}
