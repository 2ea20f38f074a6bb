use rdns_application::{ConnectProgress, DnsSocket, RawDescriptor};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::os::fd::AsRawFd;

/// Non-blocking TCP socket. The connect is started in [`connect`] and
/// finishes asynchronously; the channel learns the outcome through
/// `take_error` once the socket turns writable.
///
/// [`connect`]: TcpChannelSocket::connect
#[derive(Debug)]
pub struct TcpChannelSocket {
    socket: Socket,
}

impl TcpChannelSocket {
    pub fn connect(server: SocketAddr) -> io::Result<(Self, ConnectProgress)> {
        let socket = Socket::new(Domain::for_address(server), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;

        let progress = match socket.connect(&server.into()) {
            Ok(()) => ConnectProgress::Connected,
            Err(e) if is_in_progress(&e) => ConnectProgress::InProgress,
            Err(e) => return Err(e),
        };
        Ok((Self { socket }, progress))
    }
}

fn is_in_progress(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINPROGRESS) || err.kind() == io::ErrorKind::WouldBlock
}

impl DnsSocket for TcpChannelSocket {
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
