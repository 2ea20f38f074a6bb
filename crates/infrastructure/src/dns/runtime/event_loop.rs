use crate::dns::resolver::Resolver;
use rdns_application::EngineEvent;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// Feeds engine events into a resolver.
pub struct EventLoop {
    resolver: Resolver,
    events: UnboundedReceiver<EngineEvent>,
}

impl EventLoop {
    pub fn new(resolver: Resolver, events: UnboundedReceiver<EngineEvent>) -> Self {
        Self { resolver, events }
    }

    pub fn resolver(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Dispatches events until no request is pending.
    pub async fn run_until_idle(&mut self) {
        while self.resolver.has_pending() {
            match self.events.recv().await {
                Some(event) => self.resolver.dispatch(event),
                None => break,
            }
        }
        debug!("Event loop idle");
    }
}
