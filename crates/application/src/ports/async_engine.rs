use super::socket_factory::RawDescriptor;
use std::fmt;
use std::time::Duration;

/// Identity of one IO channel instance. Never reused, so events that arrive
/// for a retired channel can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ioc#{}", self.0)
    }
}

/// Identity of one timer arming. A fresh token is issued every time a timer
/// is (re)armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// A registration held by the engine on behalf of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncHandle {
    Read(u64),
    Write(u64),
    Timer(u64),
    Periodic(u64),
}

impl AsyncHandle {
    pub fn id(&self) -> u64 {
        match self {
            AsyncHandle::Read(id)
            | AsyncHandle::Write(id)
            | AsyncHandle::Timer(id)
            | AsyncHandle::Periodic(id) => *id,
        }
    }
}

/// Notification the host feeds back into the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Readable(ChannelId),
    Writable(ChannelId),
    Timeout(TimerToken),
}

/// The event-loop substrate the resolver runs on.
///
/// Registrations are level or edge triggered at the engine's discretion: the
/// resolver always drains a socket until it would block. Events for
/// cancelled registrations may still be delivered and are ignored.
pub trait AsyncEngine {
    fn add_read(&mut self, fd: RawDescriptor, channel: ChannelId) -> AsyncHandle;

    fn add_write(&mut self, fd: RawDescriptor, channel: ChannelId) -> AsyncHandle;

    /// One-shot timer.
    fn add_timer(&mut self, after: Duration, token: TimerToken) -> AsyncHandle;

    /// Repeating timer; the first tick happens after `every`.
    fn add_periodic(&mut self, every: Duration, token: TimerToken) -> AsyncHandle;

    fn cancel(&mut self, handle: AsyncHandle);
}
