use super::RecordType;
use std::sync::Arc;

/// One question inside a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestName {
    pub name: Arc<str>,
    pub record_type: RecordType,
}

impl RequestName {
    pub fn new(name: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
        }
    }
}

/// A logical query: one or more names, each with its own type, sent together
/// in a single packet (e.g. A + AAAA for the same host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub names: Vec<RequestName>,
}

impl DnsQuery {
    pub fn new(domain: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        Self {
            names: vec![RequestName::new(domain, record_type)],
        }
    }

    pub fn from_names(names: Vec<RequestName>) -> Self {
        Self { names }
    }

    /// Adds another question to the same packet.
    pub fn and(mut self, domain: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        self.names.push(RequestName::new(domain, record_type));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Name of the first question, used as the upstream selection hint.
    pub fn primary_name(&self) -> &str {
        self.names.first().map(|n| n.name.as_ref()).unwrap_or("")
    }
}
