use super::{route_channel, ChannelRoute, Resolver, TimerTarget};
use crate::dns::channel::{IoChannel, Transport};
use crate::dns::request::{Request, RequestHandle, RequestOptions, RequestState};
use crate::dns::wire::{MessageBuilder, UDP_PACKET_SIZE};
use rdns_application::ChannelId;
use rdns_domain::{DnsQuery, DomainError, RecordType, Reply, ReplyEntry, ResultCode};
use std::io;
use tracing::{debug, warn};

impl Resolver {
    /// Submits `query` with the resolver's default options.
    pub fn submit<F>(&mut self, query: DnsQuery, callback: F) -> Result<RequestHandle, DomainError>
    where
        F: FnOnce(Reply) + 'static,
    {
        let options = self.settings.defaults;
        self.submit_with(query, options, callback)
    }

    /// Starts resolving `query`.
    ///
    /// Invalid names, an empty query, no selectable server and failure to
    /// obtain a channel or transaction id are reported here, before any
    /// timer is armed. Everything after that reaches `callback`, exactly
    /// once. A fake reply hit calls `callback` before this returns.
    ///
    /// A query too large for one UDP datagram is sent over TCP.
    pub fn submit_with<F>(
        &mut self,
        query: DnsQuery,
        mut options: RequestOptions,
        callback: F,
    ) -> Result<RequestHandle, DomainError>
    where
        F: FnOnce(Reply) + 'static,
    {
        if query.is_empty() {
            return Err(DomainError::EmptyQuery);
        }
        let packet = MessageBuilder::build_query(0, &query.names, self.settings.dnssec)?;
        if packet.len() > UDP_PACKET_SIZE && !options.force_tcp {
            debug!(size = packet.len(), "Query exceeds a UDP datagram, using TCP");
            options.force_tcp = true;
        }
        let handle = self.next_request_handle();

        if let Some(fake) = self.fake_replies.find(&query.names) {
            debug!(
                request = %handle,
                name = query.primary_name(),
                code = %fake.code,
                "Answering from fake reply registry"
            );
            let reply = Reply {
                code: fake.code,
                names: query.names.clone(),
                entries: fake.entries.clone(),
                authenticated: false,
                server: None,
            };
            Request::new(handle, query.names, packet, options, 0, Box::new(callback))
                .complete(RequestState::Fake, reply);
            return Ok(handle);
        }

        let server = self.select_server(query.primary_name())?;
        let request = Request::new(handle, query.names, packet, options, server, Box::new(callback));
        debug!(
            request = %handle,
            name = request.primary_name(),
            server = %self.servers[server].name(),
            transport = %request.transport,
            "Submitting request"
        );
        self.requests.insert(handle, request);

        if let Err(err) = self.schedule(handle) {
            self.release(handle);
            return Err(err);
        }
        self.arm_timer(handle);
        Ok(handle)
    }

    /// Drops a pending request without invoking its callback. Returns false
    /// when the request already completed.
    pub fn cancel(&mut self, handle: RequestHandle) -> bool {
        match self.release(handle) {
            Some(request) => {
                debug!(request = %handle, state = ?request.state, "Request cancelled");
                true
            }
            None => false,
        }
    }

    pub fn add_fake_reply(
        &mut self,
        name: &str,
        record_type: RecordType,
        code: ResultCode,
        entries: Vec<ReplyEntry>,
    ) -> Result<(), DomainError> {
        self.fake_replies.add(name, record_type, code, entries)?;
        debug!(name, %record_type, %code, "Fake reply registered");
        Ok(())
    }

    pub fn remove_fake_reply(&mut self, name: &str, record_type: RecordType) -> bool {
        self.fake_replies.remove(name, record_type)
    }

    pub fn clear_fake_replies(&mut self) {
        self.fake_replies.clear();
    }

    fn select_server(&mut self, hint: &str) -> Result<usize, DomainError> {
        if self.servers.is_empty() {
            return Err(DomainError::NoServers);
        }
        let upstream = self
            .upstream
            .select(hint)
            .ok_or_else(|| DomainError::NoUpstreamAvailable(hint.to_string()))?;
        self.servers
            .iter()
            .position(|server| server.upstream() == upstream)
            .ok_or_else(|| DomainError::NoUpstreamAvailable(hint.to_string()))
    }

    /// Puts the request on a channel of its server and transport and sends
    /// it. Errors only when no channel or transaction id can be had.
    pub(super) fn schedule(&mut self, handle: RequestHandle) -> Result<(), DomainError> {
        let Some(request) = self.requests.get(&handle) else {
            return Ok(());
        };
        let (server, transport) = (request.server, request.transport);
        let channel = self.pick_channel(server, transport)?;
        self.bind(handle, channel)
    }

    /// Registers the request on `channel` under a fresh id and sends it.
    pub(super) fn bind(&mut self, handle: RequestHandle, channel_id: ChannelId) -> Result<(), DomainError> {
        let Some(request) = self.requests.get_mut(&handle) else {
            return Ok(());
        };
        let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) else {
            return Err(DomainError::ChannelAllocation {
                server: self.servers[request.server].name().to_string(),
                reason: format!("{} is gone", channel_id),
            });
        };
        let txid = channel
            .register(handle)
            .ok_or_else(|| DomainError::NoFreeTransactionId(channel_id.to_string()))?;
        request.attach(channel_id, txid);
        self.transmit(handle);
        Ok(())
    }

    fn pick_channel(&mut self, server: usize, transport: Transport) -> Result<ChannelId, DomainError> {
        let pool = self.servers[server].pool(transport);
        if pool.is_empty() {
            return Err(DomainError::ChannelAllocation {
                server: self.servers[server].name().to_string(),
                reason: format!("no {} channels configured", transport),
            });
        }

        // spread load over the pool
        let slot = fastrand::usize(..pool.len());
        if let Some(channel) = pool[slot].as_ref().filter(|c| c.is_active()) {
            return Ok(channel.id());
        }

        self.open_channel(server, transport, slot)
            .map_err(|e| DomainError::ChannelAllocation {
                server: self.servers[server].name().to_string(),
                reason: e.to_string(),
            })
    }

    /// Fills `slot` with a new channel.
    pub(super) fn open_channel(
        &mut self,
        server: usize,
        transport: Transport,
        slot: usize,
    ) -> io::Result<ChannelId> {
        let id = self.next_channel_id();
        let addr = self.servers[server].addr();
        let channel = IoChannel::open(
            id,
            transport,
            addr,
            self.sockets.as_mut(),
            self.engine.as_mut(),
        )?;

        let previous = self.servers[server]
            .pool_mut(transport)
            .get_mut(slot)
            .and_then(|s| s.replace(channel));
        if let Some(mut previous) = previous {
            self.channels.remove(&previous.id());
            previous.close(self.engine.as_mut());
        }
        self.channels.insert(
            id,
            ChannelRoute {
                server,
                transport,
                slot,
            },
        );
        Ok(id)
    }

    /// (Re)arms the per-attempt timeout of a pending request.
    pub(super) fn arm_timer(&mut self, handle: RequestHandle) {
        let token = self.next_timer_token();
        let Some(request) = self.requests.get_mut(&handle) else {
            return;
        };
        if let Some((timer, old)) = request.timer.take() {
            self.engine.cancel(timer);
            self.timers.remove(&old);
        }
        let timer = self.engine.add_timer(request.timeout, token);
        request.timer = Some((timer, token));
        self.timers.insert(token, TimerTarget::Request(handle));
    }

    /// Takes the request off its channel, leaving it pending.
    pub(super) fn detach(&mut self, handle: RequestHandle) {
        let Some(request) = self.requests.get_mut(&handle) else {
            return;
        };
        let Some(channel_id) = request.detach() else {
            return;
        };
        if let Some(channel) = route_channel(&mut self.servers, &self.channels, channel_id) {
            channel.unregister(request.txid, handle);
        }
    }

    /// Removes the request from every structure that references it.
    pub(super) fn release(&mut self, handle: RequestHandle) -> Option<Request> {
        self.detach(handle);
        let mut request = self.requests.remove(&handle)?;
        if let Some((timer, token)) = request.timer.take() {
            self.engine.cancel(timer);
            self.timers.remove(&token);
        }
        Some(request)
    }

    /// Completes the request with an engine-local result.
    pub(super) fn finish_local(&mut self, handle: RequestHandle, code: ResultCode) {
        let Some(request) = self.release(handle) else {
            return;
        };
        let server = self.servers.get(request.server).map(|s| s.name().clone());
        let names = request.names.clone();
        request.complete(RequestState::Error, Reply::local(code, names, server));
    }

    pub(super) fn on_timeout(&mut self, handle: RequestHandle) {
        let Some(request) = self.requests.get_mut(&handle) else {
            return;
        };

        if request.can_retransmit() {
            request.retransmits += 1;
            debug!(
                request = %handle,
                id = request.txid,
                retransmit = request.retransmits,
                "Request timed out, retransmitting"
            );
            self.detach(handle);
            match self.schedule(handle) {
                Ok(()) => self.arm_timer(handle),
                Err(e) => {
                    warn!(request = %handle, error = %e, "Retransmit failed");
                    self.finish_local(handle, ResultCode::NetErr);
                }
            }
            return;
        }

        warn!(
            request = %handle,
            name = request.primary_name(),
            retransmits = request.retransmits,
            "Request timed out"
        );
        let upstream = self.servers[request.server].upstream();
        self.upstream.record_failure(upstream, "timeout");
        self.finish_local(handle, ResultCode::Timeout);
    }
}
