use super::channel::Transport;
use rdns_application::{AsyncHandle, ChannelId, TimerToken};
use rdns_domain::config::ResolverConfig;
use rdns_domain::{Reply, RequestName};
use std::fmt;
use std::time::Duration;
use tracing::trace;

/// Completion callback. Invoked exactly once unless the request is cancelled.
pub type ReplyCallback = Box<dyn FnOnce(Reply)>;

/// Opaque reference to a submitted request, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestHandle(pub(crate) u64);

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Built, not attached to a channel.
    New,
    /// Holds a transaction id in a channel table.
    Registered,
    /// Waiting for the socket to accept the packet.
    WaitSend,
    /// Sent; the timeout timer is armed.
    WaitReply,
    /// Moved to a TCP channel after truncation or by request.
    Tcp,
    Replied,
    Error,
    /// Answered from the fake reply registry.
    Fake,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Replied | Self::Error | Self::Fake)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Time allowed for each attempt.
    pub timeout: Duration,
    /// Extra sends after the first before giving up with `TIMEOUT`.
    pub retransmits: u32,
    /// Skip UDP and go straight to the server's TCP pool.
    pub force_tcp: bool,
}

impl RequestOptions {
    pub fn new(timeout: Duration, retransmits: u32) -> Self {
        Self {
            timeout,
            retransmits,
            force_tcp: false,
        }
    }

    pub fn with_tcp(mut self) -> Self {
        self.force_tcp = true;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for RequestOptions {
    fn from(config: &ResolverConfig) -> Self {
        Self::new(config.timeout(), config.retransmits)
    }
}

/// One in-flight query. Lives in the resolver's request map from submission
/// until it completes or is cancelled; channels and timers refer to it only
/// by handle.
pub(crate) struct Request {
    pub(crate) handle: RequestHandle,
    pub(crate) names: Vec<RequestName>,
    /// Encoded query; the first two bytes are patched whenever the request
    /// gets a new transaction id.
    pub(crate) packet: Vec<u8>,
    pub(crate) txid: u16,
    pub(crate) state: RequestState,
    pub(crate) timeout: Duration,
    pub(crate) retransmits: u32,
    pub(crate) max_retransmits: u32,
    pub(crate) server: usize,
    pub(crate) transport: Transport,
    pub(crate) channel: Option<ChannelId>,
    pub(crate) timer: Option<(AsyncHandle, TimerToken)>,
    callback: Option<ReplyCallback>,
}

impl Request {
    pub(crate) fn new(
        handle: RequestHandle,
        names: Vec<RequestName>,
        packet: Vec<u8>,
        options: RequestOptions,
        server: usize,
        callback: ReplyCallback,
    ) -> Self {
        Self {
            handle,
            names,
            packet,
            txid: 0,
            state: RequestState::New,
            timeout: options.timeout,
            retransmits: 0,
            max_retransmits: options.retransmits,
            server,
            transport: if options.force_tcp {
                Transport::Tcp
            } else {
                Transport::Udp
            },
            channel: None,
            timer: None,
            callback: Some(callback),
        }
    }

    pub(crate) fn set_state(&mut self, state: RequestState) {
        trace!(request = %self.handle, from = ?self.state, to = ?state, "Request state change");
        self.state = state;
    }

    pub(crate) fn can_retransmit(&self) -> bool {
        self.retransmits < self.max_retransmits
    }

    pub(crate) fn primary_name(&self) -> &str {
        self.names.first().map(|n| n.name.as_ref()).unwrap_or("")
    }

    /// Takes a new transaction id on `channel` and rewrites the packet.
    pub(crate) fn attach(&mut self, channel: ChannelId, txid: u16) {
        self.channel = Some(channel);
        self.txid = txid;
        super::wire::Header::set_id(&mut self.packet, txid);
        self.set_state(RequestState::Registered);
    }

    pub(crate) fn detach(&mut self) -> Option<ChannelId> {
        self.channel.take()
    }

    /// Moves the request to the TCP pool with a fresh retransmit budget.
    pub(crate) fn escalate(&mut self) {
        self.transport = Transport::Tcp;
        self.retransmits = 0;
        self.set_state(RequestState::Tcp);
    }

    /// Enters a terminal state and hands `reply` to the callback.
    pub(crate) fn complete(mut self, state: RequestState, reply: Reply) {
        debug_assert!(state.is_terminal());
        self.set_state(state);
        if let Some(callback) = self.callback.take() {
            callback(reply);
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("handle", &self.handle)
            .field("names", &self.names)
            .field("txid", &self.txid)
            .field("state", &self.state)
            .field("retransmits", &self.retransmits)
            .field("transport", &self.transport)
            .field("channel", &self.channel)
            .finish()
    }
}
