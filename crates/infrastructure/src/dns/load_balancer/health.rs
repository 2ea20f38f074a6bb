use rdns_application::{UpstreamHandle, UpstreamManager};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_FAILURE_THRESHOLD: u16 = 3;
pub const DEFAULT_REVIVE_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ServerHealth {
    pub status: ServerStatus,
    pub consecutive_failures: u16,
    pub consecutive_successes: u16,
    pub last_error: Option<String>,
    pub unhealthy_since: Option<Instant>,
}

impl Default for ServerHealth {
    fn default() -> Self {
        Self {
            status: ServerStatus::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_error: None,
            unhealthy_since: None,
        }
    }
}

#[derive(Debug)]
struct Upstream {
    name: String,
    priority: u32,
    health: ServerHealth,
}

/// Default upstream manager.
///
/// Picks the lowest priority value among usable servers, round robin within
/// that priority. A server becomes unusable after `failure_threshold`
/// consecutive failures and is tried again once `revive_after` has passed.
/// When every server is down the one that failed longest ago is used.
#[derive(Debug)]
pub struct HealthTrackingUpstreams {
    upstreams: Vec<Upstream>,
    failure_threshold: u16,
    revive_after: Duration,
    cursor: usize,
}

impl Default for HealthTrackingUpstreams {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_REVIVE_AFTER)
    }
}

impl HealthTrackingUpstreams {
    pub fn new(failure_threshold: u16, revive_after: Duration) -> Self {
        Self {
            upstreams: Vec::new(),
            failure_threshold: failure_threshold.max(1),
            revive_after,
            cursor: 0,
        }
    }

    pub fn status(&self, upstream: UpstreamHandle) -> ServerStatus {
        self.upstreams
            .get(upstream.0)
            .map(|u| u.health.status)
            .unwrap_or(ServerStatus::Unknown)
    }

    pub fn health(&self, upstream: UpstreamHandle) -> Option<&ServerHealth> {
        self.upstreams.get(upstream.0).map(|u| &u.health)
    }

    fn is_usable(&self, upstream: &Upstream, now: Instant) -> bool {
        match (upstream.health.status, upstream.health.unhealthy_since) {
            (ServerStatus::Unhealthy, Some(since)) => now.duration_since(since) >= self.revive_after,
            _ => true,
        }
    }

    fn mark_healthy(&mut self, upstream: UpstreamHandle) {
        let Some(entry) = self.upstreams.get_mut(upstream.0) else {
            return;
        };
        let health = &mut entry.health;
        health.consecutive_failures = 0;
        health.consecutive_successes = health.consecutive_successes.saturating_add(1);
        health.last_error = None;
        health.unhealthy_since = None;
        if health.status != ServerStatus::Healthy {
            info!(server = %entry.name, "Server marked HEALTHY");
        }
        health.status = ServerStatus::Healthy;
    }

    fn mark_failed(&mut self, upstream: UpstreamHandle, error: &str) {
        let threshold = self.failure_threshold;
        let Some(entry) = self.upstreams.get_mut(upstream.0) else {
            return;
        };
        let health = &mut entry.health;
        health.consecutive_successes = 0;
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_error = Some(error.to_string());
        if health.consecutive_failures >= threshold {
            if health.status != ServerStatus::Unhealthy {
                warn!(server = %entry.name, error, "Server marked UNHEALTHY");
            }
            health.status = ServerStatus::Unhealthy;
            // a failed revival probe restarts the cool-down
            health.unhealthy_since = Some(Instant::now());
        }
    }
}

impl UpstreamManager for HealthTrackingUpstreams {
    fn register(&mut self, name: &str, priority: u32) -> UpstreamHandle {
        self.upstreams.push(Upstream {
            name: name.to_string(),
            priority,
            health: ServerHealth::default(),
        });
        debug!(server = name, priority, "Upstream registered");
        UpstreamHandle(self.upstreams.len() - 1)
    }

    fn select(&mut self, _hint: &str) -> Option<UpstreamHandle> {
        let now = Instant::now();
        let usable: Vec<usize> = (0..self.upstreams.len())
            .filter(|&i| self.is_usable(&self.upstreams[i], now))
            .collect();

        if usable.is_empty() {
            return self
                .upstreams
                .iter()
                .enumerate()
                .min_by_key(|(_, u)| u.health.unhealthy_since)
                .map(|(i, _)| UpstreamHandle(i));
        }

        let best = usable
            .iter()
            .map(|&i| self.upstreams[i].priority)
            .min()?;
        let candidates: Vec<usize> = usable
            .into_iter()
            .filter(|&i| self.upstreams[i].priority == best)
            .collect();

        let pick = candidates[self.cursor % candidates.len()];
        self.cursor = self.cursor.wrapping_add(1);
        Some(UpstreamHandle(pick))
    }

    fn record_success(&mut self, upstream: UpstreamHandle) {
        self.mark_healthy(upstream);
    }

    fn record_failure(&mut self, upstream: UpstreamHandle, reason: &str) {
        self.mark_failed(upstream, reason);
    }
}
