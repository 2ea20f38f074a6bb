use rdns_application::{AsyncEngine, AsyncHandle, ChannelId, EngineEvent, RawDescriptor, TimerToken};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct EngineState {
    next_id: u64,
    reads: BTreeMap<u64, ChannelId>,
    writes: BTreeMap<u64, ChannelId>,
    timers: BTreeMap<u64, (Duration, TimerToken)>,
    periodic: BTreeMap<u64, (Duration, TimerToken)>,
    cancelled: Vec<AsyncHandle>,
}

/// Async engine whose events are fired by the test. Clones share state, so
/// one clone goes into the resolver and the other stays with the test.
#[derive(Clone, Default)]
pub struct ManualEngine {
    state: Rc<RefCell<EngineState>>,
}

impl ManualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn AsyncEngine> {
        Box::new(self.clone())
    }

    pub fn timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn timer_durations(&self) -> Vec<Duration> {
        self.state.borrow().timers.values().map(|(d, _)| *d).collect()
    }

    /// Removes the oldest armed one-shot timer and returns its event.
    pub fn fire_next_timer(&self) -> Option<EngineEvent> {
        let mut state = self.state.borrow_mut();
        let id = *state.timers.keys().next()?;
        let (_, token) = state.timers.remove(&id)?;
        Some(EngineEvent::Timeout(token))
    }

    pub fn periodic_event(&self) -> Option<EngineEvent> {
        let state = self.state.borrow();
        state
            .periodic
            .values()
            .next()
            .map(|(_, token)| EngineEvent::Timeout(*token))
    }

    pub fn read_channels(&self) -> Vec<ChannelId> {
        self.state.borrow().reads.values().copied().collect()
    }

    pub fn write_channels(&self) -> Vec<ChannelId> {
        self.state.borrow().writes.values().copied().collect()
    }

    /// Every registration still held by the resolver.
    pub fn registrations(&self) -> usize {
        let state = self.state.borrow();
        state.reads.len() + state.writes.len() + state.timers.len() + state.periodic.len()
    }

    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled.len()
    }

    fn next_id(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }
}

impl AsyncEngine for ManualEngine {
    fn add_read(&mut self, _fd: RawDescriptor, channel: ChannelId) -> AsyncHandle {
        let id = self.next_id();
        self.state.borrow_mut().reads.insert(id, channel);
        AsyncHandle::Read(id)
    }

    fn add_write(&mut self, _fd: RawDescriptor, channel: ChannelId) -> AsyncHandle {
        let id = self.next_id();
        self.state.borrow_mut().writes.insert(id, channel);
        AsyncHandle::Write(id)
    }

    fn add_timer(&mut self, after: Duration, token: TimerToken) -> AsyncHandle {
        let id = self.next_id();
        self.state.borrow_mut().timers.insert(id, (after, token));
        AsyncHandle::Timer(id)
    }

    fn add_periodic(&mut self, every: Duration, token: TimerToken) -> AsyncHandle {
        let id = self.next_id();
        self.state.borrow_mut().periodic.insert(id, (every, token));
        AsyncHandle::Periodic(id)
    }

    fn cancel(&mut self, handle: AsyncHandle) {
        let mut state = self.state.borrow_mut();
        match handle {
            AsyncHandle::Read(id) => {
                state.reads.remove(&id);
            }
            AsyncHandle::Write(id) => {
                state.writes.remove(&id);
            }
            AsyncHandle::Timer(id) => {
                state.timers.remove(&id);
            }
            AsyncHandle::Periodic(id) => {
                state.periodic.remove(&id);
            }
        }
        state.cancelled.push(handle);
    }
}
