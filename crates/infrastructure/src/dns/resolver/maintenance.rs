use super::{ChannelRoute, Resolver};
use crate::dns::channel::Transport;
use rdns_domain::ResultCode;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

impl Resolver {
    /// Periodic pass: retires every channel used more than
    /// `max_channel_uses` times. Called from the maintenance timer; hosts
    /// driving their own clock may call it directly.
    pub fn maintain(&mut self) {
        let max_uses = self.settings.max_channel_uses;
        if max_uses == 0 {
            return;
        }

        let mut worn: SmallVec<[ChannelRoute; 8]> = SmallVec::new();
        for (server, entry) in self.servers.iter().enumerate() {
            for transport in [Transport::Udp, Transport::Tcp] {
                for (slot, channel) in entry.pool(transport).iter().enumerate() {
                    if channel.as_ref().is_some_and(|c| c.uses() > max_uses) {
                        worn.push(ChannelRoute {
                            server,
                            transport,
                            slot,
                        });
                    }
                }
            }
        }

        let rotated = worn
            .into_iter()
            .filter(|route| self.rotate(*route))
            .count();
        if rotated > 0 {
            info!(rotated, max_uses, "IO channels rotated");
        }
    }

    /// Replaces the channel in `route` with a fresh one and moves its pending
    /// requests over under new ids. Their timers keep running.
    fn rotate(&mut self, route: ChannelRoute) -> bool {
        let Some(mut old) = self.servers[route.server]
            .pool_mut(route.transport)
            .get_mut(route.slot)
            .and_then(Option::take)
        else {
            return false;
        };
        let old_id = old.id();
        self.channels.remove(&old_id);

        let new_id = match self.open_channel(route.server, route.transport, route.slot) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    server = %self.servers[route.server].name(),
                    channel = %old_id,
                    error = %e,
                    "Channel rotation failed, keeping the old channel"
                );
                if let Some(slot) = self.servers[route.server]
                    .pool_mut(route.transport)
                    .get_mut(route.slot)
                {
                    *slot = Some(old);
                    self.channels.insert(old_id, route);
                }
                return false;
            }
        };

        old.close(self.engine.as_mut());
        let pending = old.take_pending();
        debug!(
            old = %old_id,
            new = %new_id,
            uses = old.uses(),
            pending = pending.len(),
            "Channel retired"
        );

        for handle in pending {
            match self.requests.get_mut(&handle) {
                Some(request) => {
                    request.detach();
                }
                None => continue,
            }
            if let Err(e) = self.bind(handle, new_id) {
                warn!(request = %handle, error = %e, "Could not move request to new channel");
                self.finish_local(handle, ResultCode::NetErr);
            }
        }
        true
    }
}
