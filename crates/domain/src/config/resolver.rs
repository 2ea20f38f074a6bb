use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide knobs from the `[resolver]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Per-attempt timeout for a request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retransmits after the initial send before a request times out.
    #[serde(default = "default_retransmits")]
    pub retransmits: u32,

    /// Uses after which an IO channel is retired by the maintenance pass.
    /// Zero disables rotation.
    #[serde(default)]
    pub max_channel_uses: u64,

    /// Period of the channel maintenance pass, in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Ask servers for DNSSEC data (EDNS0 DO bit). Validation is left to the
    /// upstream server; the AD bit is reported back.
    #[serde(default)]
    pub enable_dnssec: bool,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retransmits: default_retransmits(),
            max_channel_uses: 0,
            refresh_interval_secs: default_refresh_interval(),
            enable_dnssec: false,
        }
    }
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_retransmits() -> u32 {
    2
}

fn default_refresh_interval() -> u64 {
    60
}
