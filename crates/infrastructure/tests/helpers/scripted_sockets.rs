use rdns_application::{ConnectProgress, DnsSocket, RawDescriptor, SocketFactory};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOp {
    CreatedUdp(RawDescriptor),
    CreatedTcp(RawDescriptor),
    Sent(RawDescriptor, Vec<u8>),
    Received(RawDescriptor, usize),
}

/// Behaviour and history of one scripted socket.
#[derive(Debug, Default)]
pub struct SocketState {
    pub fd: RawDescriptor,
    pub inbound: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    /// `send` reports WouldBlock.
    pub blocked: bool,
    /// Bytes accepted per `send`, `None` for all.
    pub write_limit: Option<usize>,
    pub send_error: Option<io::ErrorKind>,
    /// Returned by `recv` once `inbound` is empty.
    pub recv_error: Option<io::ErrorKind>,
    pub peer_closed: bool,
    pub connect_error: Option<io::ErrorKind>,
    pub dropped: bool,
}

pub type SharedSocket = Rc<RefCell<SocketState>>;

struct ScriptedSocket {
    state: SharedSocket,
    log: Rc<RefCell<Vec<SocketOp>>>,
}

impl DnsSocket for ScriptedSocket {
    fn descriptor(&self) -> RawDescriptor {
        self.state.borrow().fd
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if let Some(kind) = state.send_error {
            return Err(kind.into());
        }
        if state.blocked {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.sent.push(buf[..n].to_vec());
        self.log
            .borrow_mut()
            .push(SocketOp::Sent(state.fd, buf[..n].to_vec()));
        Ok(n)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        match state.inbound.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    state.inbound.push_front(rest);
                }
                self.log.borrow_mut().push(SocketOp::Received(state.fd, n));
                Ok(n)
            }
            None if state.peer_closed => Ok(0),
            None => Err(state.recv_error.unwrap_or(io::ErrorKind::WouldBlock).into()),
        }
    }

    fn take_error(&mut self) -> io::Result<Option<io::Error>> {
        Ok(self.state.borrow_mut().connect_error.take().map(io::Error::from))
    }
}

impl Drop for ScriptedSocket {
    fn drop(&mut self) {
        self.state.borrow_mut().dropped = true;
    }
}

#[derive(Default)]
struct FactoryState {
    next_fd: RawDescriptor,
    udp: Vec<SharedSocket>,
    tcp: Vec<SharedSocket>,
    tcp_in_progress: bool,
    fail_udp: bool,
    fail_tcp: bool,
    udp_blocked: bool,
}

/// Socket factory handing out scripted sockets and logging every operation
/// performed on them.
#[derive(Clone, Default)]
pub struct ScriptedSockets {
    state: Rc<RefCell<FactoryState>>,
    log: Rc<RefCell<Vec<SocketOp>>>,
}

impl ScriptedSockets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn SocketFactory> {
        Box::new(self.clone())
    }

    pub fn with_tcp_in_progress(self) -> Self {
        self.state.borrow_mut().tcp_in_progress = true;
        self
    }

    pub fn fail_udp(&self, fail: bool) {
        self.state.borrow_mut().fail_udp = fail;
    }

    pub fn fail_tcp(&self, fail: bool) {
        self.state.borrow_mut().fail_tcp = fail;
    }

    /// New UDP sockets start with `send` blocked.
    pub fn block_new_udp(&self, blocked: bool) {
        self.state.borrow_mut().udp_blocked = blocked;
    }

    pub fn udp(&self) -> Vec<SharedSocket> {
        self.state.borrow().udp.clone()
    }

    pub fn tcp(&self) -> Vec<SharedSocket> {
        self.state.borrow().tcp.clone()
    }

    pub fn log(&self) -> Vec<SocketOp> {
        self.log.borrow().clone()
    }

    pub fn operations(&self) -> usize {
        self.log.borrow().len()
    }

    /// Payloads of every `send`, in order, across all sockets.
    pub fn sends(&self) -> Vec<Vec<u8>> {
        self.log
            .borrow()
            .iter()
            .filter_map(|op| match op {
                SocketOp::Sent(_, bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn socket_by_fd(&self, fd: RawDescriptor) -> Option<SharedSocket> {
        let state = self.state.borrow();
        state
            .udp
            .iter()
            .chain(state.tcp.iter())
            .find(|s| s.borrow().fd == fd)
            .cloned()
    }

    /// The socket that carried the most recent send.
    pub fn last_sender(&self) -> Option<SharedSocket> {
        let fd = self.log.borrow().iter().rev().find_map(|op| match op {
            SocketOp::Sent(fd, _) => Some(*fd),
            _ => None,
        })?;
        self.socket_by_fd(fd)
    }

    fn create(&self, tcp: bool) -> io::Result<(SharedSocket, ScriptedSocket)> {
        let mut state = self.state.borrow_mut();
        if (tcp && state.fail_tcp) || (!tcp && state.fail_udp) {
            return Err(io::ErrorKind::AddrNotAvailable.into());
        }
        state.next_fd += 1;
        let shared = Rc::new(RefCell::new(SocketState {
            fd: state.next_fd + 100,
            blocked: !tcp && state.udp_blocked,
            ..SocketState::default()
        }));
        let fd = shared.borrow().fd;
        if tcp {
            state.tcp.push(Rc::clone(&shared));
            self.log.borrow_mut().push(SocketOp::CreatedTcp(fd));
        } else {
            state.udp.push(Rc::clone(&shared));
            self.log.borrow_mut().push(SocketOp::CreatedUdp(fd));
        }
        let socket = ScriptedSocket {
            state: Rc::clone(&shared),
            log: Rc::clone(&self.log),
        };
        Ok((shared, socket))
    }
}

impl SocketFactory for ScriptedSockets {
    fn udp(&mut self, _server: SocketAddr) -> io::Result<Box<dyn DnsSocket>> {
        let (_, socket) = self.create(false)?;
        Ok(Box::new(socket))
    }

    fn tcp(&mut self, _server: SocketAddr) -> io::Result<(Box<dyn DnsSocket>, ConnectProgress)> {
        let (_, socket) = self.create(true)?;
        let progress = if self.state.borrow().tcp_in_progress {
            ConnectProgress::InProgress
        } else {
            ConnectProgress::Connected
        };
        Ok((Box::new(socket), progress))
    }
}
