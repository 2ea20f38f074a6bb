use rdns_application::{DnsSocket, RawDescriptor};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::os::fd::AsRawFd;

const RECV_BUFFER_SIZE: usize = 256 * 1024;
const SEND_BUFFER_SIZE: usize = 128 * 1024;

/// Non-blocking UDP socket on an ephemeral port, connected to one server so
/// the kernel filters datagrams from other sources.
#[derive(Debug)]
pub struct UdpChannelSocket {
    socket: Socket,
}

impl UdpChannelSocket {
    pub fn connect(server: SocketAddr) -> io::Result<Self> {
        let domain = Domain::for_address(server);
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_recv_buffer_size(RECV_BUFFER_SIZE)?;
        socket.set_send_buffer_size(SEND_BUFFER_SIZE)?;

        let bind_addr: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        socket.bind(&bind_addr.into())?;
        socket.set_nonblocking(true)?;
        socket.connect(&server.into())?;

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()?.as_socket()
    }
}

impl DnsSocket for UdpChannelSocket {
    fn descriptor(&self) -> RawDescriptor {
        self.socket.as_raw_fd()
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }

    fn take_error(&mut self) -> io::Result<Option<io::Error>> {
        self.socket.take_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::thread::sleep;
    use std::time::Duration;

    fn recv_retrying(socket: &mut UdpChannelSocket, buf: &mut [u8]) -> io::Result<usize> {
        for _ in 0..100 {
            match socket.recv(buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => sleep(Duration::from_millis(10)),
                other => return other,
            }
        }
        Err(io::ErrorKind::TimedOut.into())
    }

    #[test]
    fn test_exchange_with_loopback_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut socket = UdpChannelSocket::connect(peer.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 64];
        assert_eq!(
            socket.recv(&mut buf).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );

        socket.send(b"query").unwrap();
        let (n, from) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"query");
        assert_eq!(Some(from), socket.local_addr());

        peer.send_to(b"reply", from).unwrap();
        let n = recv_retrying(&mut socket, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"reply");
    }

    #[test]
    fn test_datagrams_from_other_sources_filtered() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut socket = UdpChannelSocket::connect(peer.local_addr().unwrap()).unwrap();
        let local = socket.local_addr().unwrap();

        stranger.send_to(b"spoof", local).unwrap();
        peer.send_to(b"real", local).unwrap();

        let mut buf = [0u8; 64];
        let n = recv_retrying(&mut socket, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"real");
    }
}
