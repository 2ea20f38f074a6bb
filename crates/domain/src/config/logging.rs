use serde::{Deserialize, Serialize};

/// `[logging]` table. `RUST_LOG`, when set, replaces `level`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive: `"info"`, `"rdns_infrastructure=debug"`.
    pub level: String,

    /// Prefix each line with a timestamp.
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: false,
        }
    }
}
