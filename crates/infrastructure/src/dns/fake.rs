use super::wire::{normalize_name, wire_name};
use rdns_domain::{DomainError, RecordType, ReplyEntry, RequestName, ResultCode};
use rustc_hash::FxHashMap;

/// Canned outcome for one (type, name) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeReply {
    pub code: ResultCode,
    pub entries: Vec<ReplyEntry>,
}

/// Static overrides consulted before a request touches the network.
///
/// Names are keyed by their encoded wire form after lowercasing, so
/// `Example.COM.` and `example.com` hit the same entry. Entries stay valid
/// until removed or cleared.
#[derive(Debug, Default)]
pub struct FakeReplyRegistry {
    entries: FxHashMap<(RecordType, Vec<u8>), FakeReply>,
}

impl FakeReplyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, record_type: RecordType) -> Result<(RecordType, Vec<u8>), DomainError> {
        let encoded = wire_name(&normalize_name(name))?;
        Ok((record_type, encoded))
    }

    /// Registers (or replaces) the reply for `name`/`record_type`.
    pub fn add(
        &mut self,
        name: &str,
        record_type: RecordType,
        code: ResultCode,
        entries: Vec<ReplyEntry>,
    ) -> Result<(), DomainError> {
        let key = Self::key(name, record_type)?;
        self.entries.insert(key, FakeReply { code, entries });
        Ok(())
    }

    pub fn remove(&mut self, name: &str, record_type: RecordType) -> bool {
        match Self::key(name, record_type) {
            Ok(key) => self.entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, name: &RequestName) -> Option<&FakeReply> {
        if self.entries.is_empty() {
            return None;
        }
        let key = Self::key(&name.name, name.record_type).ok()?;
        self.entries.get(&key)
    }

    /// First entry matching any of `names`, in request order.
    pub fn find(&self, names: &[RequestName]) -> Option<&FakeReply> {
        names.iter().find_map(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
