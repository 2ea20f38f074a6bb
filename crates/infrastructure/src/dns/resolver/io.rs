use super::{route_channel, Resolver};
use crate::dns::channel::Transport;
use crate::dns::request::{RequestHandle, RequestState};
use crate::dns::wire::{Header, ParsedReply, ResponseParser, WireError, UDP_PACKET_SIZE};
use bytes::Bytes;
use rdns_application::{ChannelId, CryptoPlugin};
use rdns_domain::{DomainError, Reply, ResultCode};
use std::io;
use std::net::SocketAddr;
use tracing::{debug, trace, warn};

enum SendOutcome {
    Sent,
    Queued,
    Flush,
    Failed(io::Error),
    Rejected(DomainError),
}

fn seal(
    crypto: &mut Option<Box<dyn CryptoPlugin>>,
    packet: &[u8],
    server: SocketAddr,
) -> Result<Vec<u8>, DomainError> {
    match crypto.as_mut() {
        Some(plugin) => plugin.seal(packet, server),
        None => Ok(packet.to_vec()),
    }
}

impl Resolver {
    /// Hands the request's packet to its channel: a datagram for UDP, a
    /// frame on the output chain for TCP.
    pub(super) fn transmit(&mut self, handle: RequestHandle) {
        let Some(request) = self.requests.get_mut(&handle) else {
            return;
        };
        let Some(channel_id) = request.channel else {
            return;
        };
        let addr = self.servers[request.server].addr();
        let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
            return;
        };

        let outcome = match seal(&mut self.crypto, &request.packet, addr) {
            Err(e) => SendOutcome::Rejected(e),
            Ok(packet) => match channel.transport() {
                Transport::Udp => match channel.send(&packet) {
                    Ok(_) => SendOutcome::Sent,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        channel.backlog_push(handle);
                        channel.want_write(self.engine.as_mut());
                        SendOutcome::Queued
                    }
                    Err(e) => SendOutcome::Failed(e),
                },
                Transport::Tcp => {
                    let queued = match channel.tcp_mut() {
                        Some(tcp) => tcp.output.push(handle, &packet),
                        None => Ok(()),
                    };
                    match queued {
                        Err(e) => SendOutcome::Rejected(e.into()),
                        Ok(()) if channel.is_connected() => SendOutcome::Flush,
                        Ok(()) => SendOutcome::Queued,
                    }
                }
            },
        };

        match outcome {
            SendOutcome::Sent => {
                request.set_state(RequestState::WaitReply);
                debug!(request = %handle, id = request.txid, channel = %channel_id, "UDP query sent");
            }
            SendOutcome::Queued => request.set_state(RequestState::WaitSend),
            SendOutcome::Flush => {
                request.set_state(RequestState::WaitSend);
                self.flush_tcp(channel_id);
            }
            SendOutcome::Failed(e) => {
                request.set_state(RequestState::WaitSend);
                self.fail_channel(channel_id, &e.to_string());
            }
            SendOutcome::Rejected(e) => {
                warn!(request = %handle, error = %e, "Outbound packet rejected");
                self.finish_local(handle, ResultCode::NetErr);
            }
        }
    }

    pub(super) fn on_readable(&mut self, channel_id: ChannelId) {
        let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
            trace!(channel = %channel_id, "Read event for a retired channel ignored");
            return;
        };

        let mut messages: Vec<Bytes> = Vec::new();
        let mut failure = None;
        let mut buf = [0u8; UDP_PACKET_SIZE];
        loop {
            match channel.recv(&mut buf) {
                Ok(0) if channel.transport() == Transport::Tcp => {
                    failure = Some("connection closed by peer".to_string());
                    break;
                }
                Ok(n) => match channel.tcp_mut() {
                    Some(tcp) => tcp.framer.feed(&buf[..n], &mut messages),
                    None => messages.push(Bytes::copy_from_slice(&buf[..n])),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        for message in messages {
            self.process_reply(channel_id, &message);
        }
        if let Some(reason) = failure {
            self.fail_channel(channel_id, &reason);
        }
    }

    pub(super) fn on_writable(&mut self, channel_id: ChannelId) {
        let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
            trace!(channel = %channel_id, "Write event for a retired channel ignored");
            return;
        };

        match channel.transport() {
            Transport::Tcp => {
                if channel.is_connecting() {
                    if let Err(e) = channel.connect_result() {
                        self.fail_channel(channel_id, &format!("connect failed: {}", e));
                        return;
                    }
                    channel.mark_connected();
                    debug!(channel = %channel_id, "TCP channel connected");
                }
                self.flush_tcp(channel_id);
            }
            Transport::Udp => self.drain_backlog(channel_id),
        }
    }

    /// Sends queued UDP datagrams until the socket pushes back.
    fn drain_backlog(&mut self, channel_id: ChannelId) {
        let mut rejected = Vec::new();
        let mut failure = None;

        while let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) {
            let Some(handle) = channel.backlog_front() else {
                channel.stop_write(self.engine.as_mut());
                break;
            };
            let Some(request) = self.requests.get_mut(&handle) else {
                channel.backlog_pop();
                continue;
            };
            let addr = self.servers[request.server].addr();
            let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
                break;
            };

            let packet = match seal(&mut self.crypto, &request.packet, addr) {
                Ok(packet) => packet,
                Err(e) => {
                    channel.backlog_pop();
                    rejected.push((handle, e));
                    continue;
                }
            };
            match channel.send(&packet) {
                Ok(_) => {
                    channel.backlog_pop();
                    request.set_state(RequestState::WaitReply);
                    debug!(request = %handle, id = request.txid, channel = %channel_id, "Queued UDP query sent");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        for (handle, e) in rejected {
            warn!(request = %handle, error = %e, "Outbound packet rejected by crypto plugin");
            self.finish_local(handle, ResultCode::NetErr);
        }
        if let Some(e) = failure {
            self.fail_channel(channel_id, &e.to_string());
        }
    }

    /// Writes whatever the output chain holds, keeping write interest only
    /// while frames remain.
    fn flush_tcp(&mut self, channel_id: ChannelId) {
        let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
            return;
        };
        if !channel.is_connected() {
            return;
        }
        let Some((socket, tcp)) = channel.split_tcp() else {
            return;
        };

        match tcp.output.flush(|buf| socket.send(buf)) {
            Ok(sent) => {
                let drained = tcp.output.is_empty();
                if drained {
                    channel.stop_write(self.engine.as_mut());
                } else {
                    channel.want_write(self.engine.as_mut());
                }
                for handle in sent {
                    if let Some(request) = self.requests.get_mut(&handle) {
                        request.set_state(RequestState::WaitReply);
                        debug!(request = %handle, id = request.txid, channel = %channel_id, "TCP query sent");
                    }
                }
            }
            Err(e) => self.fail_channel(channel_id, &e.to_string()),
        }
    }

    /// Matches one complete message against the channel's pending requests.
    fn process_reply(&mut self, channel_id: ChannelId, packet: &[u8]) {
        let Some(route) = self.channels.get(&channel_id).copied() else {
            return;
        };
        let addr = self.servers[route.server].addr();

        let opened;
        let packet = match self.crypto.as_mut() {
            Some(plugin) => match plugin.open(packet, addr) {
                Some(plain) => {
                    opened = plain;
                    opened.as_slice()
                }
                None => {
                    debug!(server = %addr, "Inbound packet dropped by crypto plugin");
                    return;
                }
            },
            None => packet,
        };

        let Some(txid) = Header::peek_id(packet) else {
            trace!(server = %addr, len = packet.len(), "Runt packet dropped");
            return;
        };
        let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
            return;
        };
        let Some(handle) = channel.lookup(txid) else {
            trace!(server = %addr, id = txid, channel = %channel_id, "Reply with unknown id dropped");
            return;
        };
        let Some(request) = self.requests.get(&handle) else {
            channel.unregister(txid, handle);
            return;
        };

        let parsed = match ResponseParser::parse(packet, &request.names) {
            Ok(parsed) => parsed,
            Err(e @ (WireError::QuestionMismatch | WireError::NotAReply)) => {
                warn!(server = %addr, id = txid, error = %e, "Reply does not match the request, dropped");
                return;
            }
            Err(e) => {
                warn!(server = %addr, id = txid, error = %e, "Malformed reply dropped");
                return;
            }
        };

        if parsed.truncated()
            && route.transport == Transport::Udp
            && self.servers[route.server].pool_size(Transport::Tcp) > 0
        {
            self.escalate(handle);
            return;
        }
        self.complete(handle, parsed);
    }

    /// Retries a truncated UDP exchange on the server's TCP pool.
    fn escalate(&mut self, handle: RequestHandle) {
        self.detach(handle);
        if let Some(request) = self.requests.get_mut(&handle) {
            debug!(request = %handle, name = request.primary_name(), "Truncated reply, retrying over TCP");
            request.escalate();
        }
        match self.schedule(handle) {
            Ok(()) => self.arm_timer(handle),
            Err(e) => {
                warn!(request = %handle, error = %e, "TCP escalation failed");
                self.finish_local(handle, ResultCode::NetErr);
            }
        }
    }

    fn complete(&mut self, handle: RequestHandle, parsed: ParsedReply) {
        let Some(mut request) = self.release(handle) else {
            return;
        };
        let server = &self.servers[request.server];
        self.upstream.record_success(server.upstream());

        debug!(
            request = %handle,
            server = %server.name(),
            code = %parsed.code,
            answers = parsed.entries.len(),
            "Request replied"
        );
        let reply = Reply {
            code: parsed.code,
            authenticated: parsed.authenticated(),
            names: std::mem::take(&mut request.names),
            entries: parsed.entries,
            server: Some(server.name().clone()),
        };
        request.complete(RequestState::Replied, reply);
    }

    /// Closes a broken channel. Each request it carried moves to another
    /// channel of the same server while it has retransmits left, and fails
    /// with `NETERR` otherwise.
    pub(super) fn fail_channel(&mut self, channel_id: ChannelId, reason: &str) {
        let Some(route) = self.channels.remove(&channel_id) else {
            return;
        };
        let server = &mut self.servers[route.server];
        let Some(slot) = server.pool_mut(route.transport).get_mut(route.slot) else {
            return;
        };
        if slot.as_ref().map(|c| c.id()) != Some(channel_id) {
            return;
        }
        let Some(mut channel) = slot.take() else {
            return;
        };
        channel.close(self.engine.as_mut());
        let pending = channel.take_pending();

        warn!(
            server = %server.name(),
            channel = %channel_id,
            transport = %route.transport,
            pending = pending.len(),
            error = reason,
            "IO channel failed"
        );
        let upstream = server.upstream();
        self.upstream.record_failure(upstream, reason);

        for handle in pending {
            let Some(request) = self.requests.get_mut(&handle) else {
                continue;
            };
            request.detach();
            if !request.can_retransmit() {
                self.finish_local(handle, ResultCode::NetErr);
                continue;
            }
            request.retransmits += 1;
            if let Err(e) = self.schedule(handle) {
                debug!(request = %handle, error = %e, "Requeue after channel failure failed");
                self.finish_local(handle, ResultCode::NetErr);
            }
        }
    }
}
