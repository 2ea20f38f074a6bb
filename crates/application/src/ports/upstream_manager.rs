/// Opaque reference a server keeps for health bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpstreamHandle(pub usize);

/// Port for upstream server selection and health scoring.
pub trait UpstreamManager {
    fn register(&mut self, name: &str, priority: u32) -> UpstreamHandle;

    /// Server for the next query; `hint` is the first requested name.
    fn select(&mut self, hint: &str) -> Option<UpstreamHandle>;

    fn record_success(&mut self, upstream: UpstreamHandle);

    fn record_failure(&mut self, upstream: UpstreamHandle, reason: &str);
}
