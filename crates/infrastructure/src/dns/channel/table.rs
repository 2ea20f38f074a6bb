use crate::dns::request::RequestHandle;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

/// Transaction id routing for one channel.
///
/// Ids are unique among the requests currently pending on the channel. A new
/// id starts at a random point and probes forward until a free slot is found.
#[derive(Debug, Default)]
pub struct TransactionTable {
    entries: FxHashMap<u16, RequestHandle>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an unused id for `request`. `None` when all 65536 ids are
    /// taken.
    pub fn insert(&mut self, request: RequestHandle) -> Option<u16> {
        self.insert_from(fastrand::u16(..), request)
    }

    fn insert_from(&mut self, start: u16, request: RequestHandle) -> Option<u16> {
        if self.entries.len() > u16::MAX as usize {
            return None;
        }
        let mut id = start;
        loop {
            if let Entry::Vacant(slot) = self.entries.entry(id) {
                slot.insert(request);
                return Some(id);
            }
            id = id.wrapping_add(1);
            if id == start {
                return None;
            }
        }
    }

    pub fn get(&self, id: u16) -> Option<RequestHandle> {
        self.entries.get(&id).copied()
    }

    /// Removes `id` only while it still belongs to `request`.
    pub fn remove(&mut self, id: u16, request: RequestHandle) -> bool {
        match self.entries.entry(id) {
            Entry::Occupied(slot) if *slot.get() == request => {
                slot.remove();
                true
            }
            _ => false,
        }
    }

    /// Empties the table, returning the pending requests in id order.
    pub fn drain(&mut self) -> Vec<RequestHandle> {
        let mut pending: Vec<(u16, RequestHandle)> = self.entries.drain().collect();
        pending.sort_unstable_by_key(|(id, _)| *id);
        pending.into_iter().map(|(_, request)| request).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
