use rdns_application::{AsyncEngine, AsyncHandle, ChannelId, EngineEvent, RawDescriptor, TimerToken};
use rustc_hash::FxHashMap;
use std::io;
use std::os::fd::{BorrowedFd, OwnedFd};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{spawn_local, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{trace, warn};

const PRUNE_WATERMARK: usize = 256;

/// Async engine on a tokio `LocalSet`.
///
/// Every registration is a local task that turns readiness or a deadline
/// into an [`EngineEvent`] on an unbounded channel; the host drains that
/// channel into [`Resolver::dispatch`](crate::dns::Resolver::dispatch).
/// Must be used from within a `LocalSet`.
pub struct TokioEngine {
    events: UnboundedSender<EngineEvent>,
    tasks: FxHashMap<u64, JoinHandle<()>>,
    next_id: u64,
    prune_at: usize,
}

impl TokioEngine {
    pub fn new() -> (Self, UnboundedReceiver<EngineEvent>) {
        let (events, receiver) = unbounded_channel();
        let engine = Self {
            events,
            tasks: FxHashMap::default(),
            next_id: 0,
            prune_at: PRUNE_WATERMARK,
        };
        (engine, receiver)
    }

    /// Live registrations, finished one-shot timers excluded.
    pub fn active_tasks(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }

    fn track(&mut self, task: JoinHandle<()>) -> u64 {
        // fired timers are never cancelled, drop them now and then
        if self.tasks.len() >= self.prune_at {
            self.tasks.retain(|_, task| !task.is_finished());
            self.prune_at = (self.tasks.len() * 2).max(PRUNE_WATERMARK);
        }
        self.next_id += 1;
        self.tasks.insert(self.next_id, task);
        self.next_id
    }

    fn watch(&mut self, fd: RawDescriptor, interest: Interest, event: EngineEvent) -> u64 {
        let events = self.events.clone();
        let task = spawn_local(async move {
            if let Err(e) = watch_readiness(fd, interest, event, events).await {
                warn!(fd, ?event, error = %e, "Readiness watch stopped");
            }
        });
        self.track(task)
    }
}

/// Polls a private duplicate of `fd`, so read and write interest on the same
/// socket are independent registrations and closing the channel's socket
/// never pulls the descriptor out from under the reactor.
async fn watch_readiness(
    fd: RawDescriptor,
    interest: Interest,
    event: EngineEvent,
    events: UnboundedSender<EngineEvent>,
) -> io::Result<()> {
    // SAFETY: the channel owning `fd` keeps it open for the duration of
    // this call; the duplicate is owned by this task from here on.
    let owned: OwnedFd = unsafe { BorrowedFd::borrow_raw(fd) }.try_clone_to_owned()?;
    let async_fd = AsyncFd::with_interest(owned, interest)?;

    loop {
        let mut guard = async_fd.ready(interest).await?;
        if events.send(event).is_err() {
            return Ok(());
        }
        // the resolver drains until WouldBlock before we wait again
        guard.clear_ready();
    }
}

impl AsyncEngine for TokioEngine {
    fn add_read(&mut self, fd: RawDescriptor, channel: ChannelId) -> AsyncHandle {
        AsyncHandle::Read(self.watch(fd, Interest::READABLE, EngineEvent::Readable(channel)))
    }

    fn add_write(&mut self, fd: RawDescriptor, channel: ChannelId) -> AsyncHandle {
        AsyncHandle::Write(self.watch(fd, Interest::WRITABLE, EngineEvent::Writable(channel)))
    }

    fn add_timer(&mut self, after: Duration, token: TimerToken) -> AsyncHandle {
        let events = self.events.clone();
        let task = spawn_local(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(EngineEvent::Timeout(token));
        });
        AsyncHandle::Timer(self.track(task))
    }

    fn add_periodic(&mut self, every: Duration, token: TimerToken) -> AsyncHandle {
        let events = self.events.clone();
        let task = spawn_local(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(EngineEvent::Timeout(token)).is_err() {
                    return;
                }
            }
        });
        AsyncHandle::Periodic(self.track(task))
    }

    fn cancel(&mut self, handle: AsyncHandle) {
        if let Some(task) = self.tasks.remove(&handle.id()) {
            trace!(?handle, "Registration cancelled");
            task.abort();
        }
    }
}

impl Drop for TokioEngine {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn test_timer_fires_once() {
        LocalSet::new()
            .run_until(async {
                let (mut engine, mut events) = TokioEngine::new();
                engine.add_timer(Duration::from_millis(5), TimerToken(7));

                let event = events.recv().await.unwrap();
                assert_eq!(event, EngineEvent::Timeout(TimerToken(7)));
            })
            .await;
    }

    #[tokio::test]
    async fn test_cancelled_timer_is_silent() {
        LocalSet::new()
            .run_until(async {
                let (mut engine, mut events) = TokioEngine::new();
                let handle = engine.add_timer(Duration::from_millis(20), TimerToken(1));
                engine.add_timer(Duration::from_millis(40), TimerToken(2));
                engine.cancel(handle);

                let event = events.recv().await.unwrap();
                assert_eq!(event, EngineEvent::Timeout(TimerToken(2)));
            })
            .await;
    }

    #[tokio::test]
    async fn test_periodic_repeats() {
        LocalSet::new()
            .run_until(async {
                let (mut engine, mut events) = TokioEngine::new();
                let handle = engine.add_periodic(Duration::from_millis(5), TimerToken(3));

                for _ in 0..3 {
                    assert_eq!(events.recv().await, Some(EngineEvent::Timeout(TimerToken(3))));
                }
                engine.cancel(handle);
            })
            .await;
    }

    #[tokio::test]
    async fn test_readable_socket_reported() {
        use std::os::fd::AsRawFd;

        LocalSet::new()
            .run_until(async {
                let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
                socket.set_nonblocking(true).unwrap();
                let peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();

                let (mut engine, mut events) = TokioEngine::new();
                engine.add_read(socket.as_raw_fd(), ChannelId(9));
                peer.send_to(b"ping", socket.local_addr().unwrap()).unwrap();

                assert_eq!(events.recv().await, Some(EngineEvent::Readable(ChannelId(9))));
            })
            .await;
    }
}
