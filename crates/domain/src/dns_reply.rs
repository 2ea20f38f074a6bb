use super::{ReplyEntry, RequestName, ResultCode};
use std::sync::Arc;

/// What a request callback receives, exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ResultCode,
    pub names: Vec<RequestName>,
    pub entries: Vec<ReplyEntry>,
    /// AD bit of the server reply. Always false for local results.
    pub authenticated: bool,
    /// Server that produced the reply; `None` for fake and local results.
    pub server: Option<Arc<str>>,
}

impl Reply {
    /// A reply carrying only an engine-local outcome (timeout, network error).
    pub fn local(code: ResultCode, names: Vec<RequestName>, server: Option<Arc<str>>) -> Self {
        Self {
            code,
            names,
            entries: Vec::new(),
            authenticated: false,
            server,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}
