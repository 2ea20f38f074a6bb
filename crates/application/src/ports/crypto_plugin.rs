use rdns_domain::DomainError;
use std::net::SocketAddr;

/// Optional encrypted-transport hook wrapped around every send and receive.
pub trait CryptoPlugin {
    fn name(&self) -> &str;

    /// Transforms an outbound packet before it hits the socket.
    fn seal(&mut self, packet: &[u8], server: SocketAddr) -> Result<Vec<u8>, DomainError>;

    /// Transforms an inbound packet; `None` drops it.
    fn open(&mut self, packet: &[u8], server: SocketAddr) -> Option<Vec<u8>>;
}
