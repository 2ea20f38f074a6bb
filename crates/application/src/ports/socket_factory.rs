use std::io;
use std::net::SocketAddr;

/// OS-level descriptor handed to the async engine for readiness polling.
pub type RawDescriptor = i32;

/// A non-blocking socket owned by one IO channel.
///
/// `send` and `recv` report `io::ErrorKind::WouldBlock` when the operation
/// cannot progress; `recv` returning `Ok(0)` on a stream means the peer
/// closed the connection.
pub trait DnsSocket {
    fn descriptor(&self) -> RawDescriptor;

    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Pending socket error (`SO_ERROR`), used to learn how a non-blocking
    /// connect ended.
    fn take_error(&mut self) -> io::Result<Option<io::Error>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProgress {
    Connected,
    InProgress,
}

/// Creates the sockets behind IO channels.
pub trait SocketFactory {
    /// A UDP socket bound to an ephemeral port and connected to `server`.
    fn udp(&mut self, server: SocketAddr) -> io::Result<Box<dyn DnsSocket>>;

    /// A TCP socket with a connect to `server` started.
    fn tcp(&mut self, server: SocketAddr) -> io::Result<(Box<dyn DnsSocket>, ConnectProgress)>;
}
