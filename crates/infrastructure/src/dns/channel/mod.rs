mod table;
mod tcp;

pub use table::TransactionTable;
pub use tcp::{OutputChain, TcpChannel, TcpFramer};

use crate::dns::request::RequestHandle;
use rdns_application::{
    AsyncEngine, AsyncHandle, ChannelId, ConnectProgress, DnsSocket, SocketFactory,
};
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => write!(f, "udp"),
            Transport::Tcp => write!(f, "tcp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelFlags(u8);

impl ChannelFlags {
    pub const CONNECTED: Self = Self(0x01);
    pub const ACTIVE: Self = Self(0x02);
    pub const TCP: Self = Self(0x04);
    pub const TCP_CONNECTING: Self = Self(0x08);

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// One socket to one server together with the requests waiting on it.
pub struct IoChannel {
    id: ChannelId,
    transport: Transport,
    socket: Option<Box<dyn DnsSocket>>,
    flags: ChannelFlags,
    table: TransactionTable,
    uses: u64,
    read_handle: Option<AsyncHandle>,
    write_handle: Option<AsyncHandle>,
    /// UDP requests whose datagram could not be sent yet.
    backlog: VecDeque<RequestHandle>,
    tcp: Option<TcpChannel>,
}

impl IoChannel {
    /// Creates the socket and registers read interest. A TCP channel whose
    /// connect is still in progress also waits for write readiness.
    pub(crate) fn open(
        id: ChannelId,
        transport: Transport,
        server: SocketAddr,
        sockets: &mut dyn SocketFactory,
        engine: &mut dyn AsyncEngine,
    ) -> io::Result<Self> {
        let mut flags = ChannelFlags::ACTIVE;
        let (socket, tcp) = match transport {
            Transport::Udp => {
                flags.insert(ChannelFlags::CONNECTED);
                (sockets.udp(server)?, None)
            }
            Transport::Tcp => {
                let (socket, progress) = sockets.tcp(server)?;
                flags.insert(ChannelFlags::TCP);
                match progress {
                    ConnectProgress::Connected => flags.insert(ChannelFlags::CONNECTED),
                    ConnectProgress::InProgress => flags.insert(ChannelFlags::TCP_CONNECTING),
                }
                (socket, Some(TcpChannel::default()))
            }
        };

        let fd = socket.descriptor();
        let read_handle = Some(engine.add_read(fd, id));
        let write_handle = flags
            .contains(ChannelFlags::TCP_CONNECTING)
            .then(|| engine.add_write(fd, id));

        debug!(channel = %id, %server, %transport, "IO channel opened");

        Ok(Self {
            id,
            transport,
            socket: Some(socket),
            flags,
            table: TransactionTable::new(),
            uses: 0,
            read_handle,
            write_handle,
            backlog: VecDeque::new(),
            tcp,
        })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn flags(&self) -> ChannelFlags {
        self.flags
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(ChannelFlags::ACTIVE)
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(ChannelFlags::CONNECTED)
    }

    pub fn is_connecting(&self) -> bool {
        self.flags.contains(ChannelFlags::TCP_CONNECTING)
    }

    /// Number of requests ever registered on this channel.
    pub fn uses(&self) -> u64 {
        self.uses
    }

    pub fn pending(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn register(&mut self, request: RequestHandle) -> Option<u16> {
        let id = self.table.insert(request)?;
        self.uses += 1;
        Some(id)
    }

    pub(crate) fn lookup(&self, txid: u16) -> Option<RequestHandle> {
        self.table.get(txid)
    }

    /// Forgets `request` entirely: its id, its backlog slot and any unsent
    /// TCP frame.
    pub(crate) fn unregister(&mut self, txid: u16, request: RequestHandle) {
        self.table.remove(txid, request);
        self.backlog.retain(|queued| *queued != request);
        if let Some(tcp) = self.tcp.as_mut() {
            tcp.output.remove(request);
        }
    }

    pub(crate) fn take_pending(&mut self) -> Vec<RequestHandle> {
        self.backlog.clear();
        if let Some(tcp) = self.tcp.as_mut() {
            tcp.output = OutputChain::new();
        }
        self.table.drain()
    }

    pub(crate) fn mark_connected(&mut self) {
        self.flags.remove(ChannelFlags::TCP_CONNECTING);
        self.flags.insert(ChannelFlags::CONNECTED);
    }

    fn socket_mut(&mut self) -> io::Result<&mut Box<dyn DnsSocket>> {
        self.socket
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }

    pub(crate) fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket_mut()?.send(buf)
    }

    pub(crate) fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket_mut()?.recv(buf)
    }

    /// Outcome of an asynchronous connect, `Ok(())` once established.
    pub(crate) fn connect_result(&mut self) -> io::Result<()> {
        match self.socket_mut()?.take_error()? {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn backlog_push(&mut self, request: RequestHandle) {
        self.backlog.push_back(request);
    }

    pub(crate) fn backlog_front(&self) -> Option<RequestHandle> {
        self.backlog.front().copied()
    }

    pub(crate) fn backlog_pop(&mut self) {
        self.backlog.pop_front();
    }

    pub(crate) fn tcp_mut(&mut self) -> Option<&mut TcpChannel> {
        self.tcp.as_mut()
    }

    /// Feeds the framer and the output chain from the socket in one borrow.
    pub(crate) fn split_tcp(&mut self) -> Option<(&mut Box<dyn DnsSocket>, &mut TcpChannel)> {
        match (self.socket.as_mut(), self.tcp.as_mut()) {
            (Some(socket), Some(tcp)) => Some((socket, tcp)),
            _ => None,
        }
    }

    pub(crate) fn want_write(&mut self, engine: &mut dyn AsyncEngine) {
        if self.write_handle.is_some() {
            return;
        }
        if let Some(socket) = self.socket.as_ref() {
            self.write_handle = Some(engine.add_write(socket.descriptor(), self.id));
        }
    }

    pub(crate) fn stop_write(&mut self, engine: &mut dyn AsyncEngine) {
        if let Some(handle) = self.write_handle.take() {
            engine.cancel(handle);
        }
    }

    /// Deregisters from the engine and drops the socket.
    pub(crate) fn close(&mut self, engine: &mut dyn AsyncEngine) {
        if let Some(handle) = self.read_handle.take() {
            engine.cancel(handle);
        }
        self.stop_write(engine);
        self.socket = None;
        self.flags.remove(ChannelFlags::ACTIVE);
        self.flags.remove(ChannelFlags::CONNECTED);
        self.flags.remove(ChannelFlags::TCP_CONNECTING);
    }
}

impl fmt::Debug for IoChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoChannel")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("flags", &self.flags)
            .field("uses", &self.uses)
            .field("pending", &self.table.len())
            .finish()
    }
}
