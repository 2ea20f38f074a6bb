//! Real sockets behind IO channels.

pub mod tcp;
pub mod udp;

pub use tcp::TcpChannelSocket;
pub use udp::UdpChannelSocket;

use rdns_application::{ConnectProgress, DnsSocket, SocketFactory};
use std::io;
use std::net::SocketAddr;
use tracing::debug;

/// Creates non-blocking OS sockets through `socket2`.
#[derive(Debug, Default)]
pub struct SystemSocketFactory {
    created: u64,
}

impl SystemSocketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sockets handed out so far.
    pub fn created(&self) -> u64 {
        self.created
    }
}

impl SocketFactory for SystemSocketFactory {
    fn udp(&mut self, server: SocketAddr) -> io::Result<Box<dyn DnsSocket>> {
        let socket = UdpChannelSocket::connect(server)?;
        self.created += 1;
        debug!(%server, local = ?socket.local_addr(), "UDP socket created");
        Ok(Box::new(socket))
    }

    fn tcp(&mut self, server: SocketAddr) -> io::Result<(Box<dyn DnsSocket>, ConnectProgress)> {
        let (socket, progress) = TcpChannelSocket::connect(server)?;
        self.created += 1;
        debug!(%server, ?progress, "TCP socket created");
        Ok((Box::new(socket), progress))
    }
}
