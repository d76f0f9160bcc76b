use super::{PendingOperation, PendingRecord};
use crate::core::ItemId;
use std::collections::HashMap;

/// Owned mapping from item identifier to its in-flight pending record.
#[derive(Debug, Default)]
pub struct PendingTable {
    records: HashMap<ItemId, PendingRecord>,
    next_seq: u64,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record and returns its ticket.
    ///
    /// Any record already registered for the same id is replaced and returned.
    pub fn begin(&mut self, operation: PendingOperation) -> (u64, Option<PendingRecord>) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let id = operation.item_id().clone();
        let record = PendingRecord {
            seq,
            operation,
            started_at: chrono::Utc::now(),
        };
        let replaced = self.records.insert(id, record);
        (seq, replaced)
    }

    pub fn get(&self, id: &ItemId) -> Option<&PendingRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.records.contains_key(id)
    }

    /// Removes and returns the record for `id` only if it still carries `seq`.
    pub fn take_if_current(&mut self, id: &ItemId, seq: u64) -> Option<PendingRecord> {
        match self.records.get(id) {
            Some(record) if record.seq == seq => self.records.remove(id),
            _ => None,
        }
    }

    pub fn take(&mut self, id: &ItemId) -> Option<PendingRecord> {
        self.records.remove(id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record; returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Item;

    fn create(id: &str) -> PendingOperation {
        PendingOperation::Create {
            item: Item::new(id).mark_optimistic(),
        }
    }

    #[test]
    fn test_tickets_increase() {
        let mut table = PendingTable::new();
        let (a, _) = table.begin(create("a"));
        let (b, _) = table.begin(create("b"));
        assert!(b > a);
        assert_eq!(table.ids(), vec![ItemId::from("a"), ItemId::from("b")]);
    }

    #[test]
    fn test_take_if_current_ignores_stale_ticket() {
        let mut table = PendingTable::new();
        let (first, _) = table.begin(create("a"));
        let (second, replaced) = table.begin(create("a"));
        assert_eq!(replaced.map(|r| r.seq), Some(first));

        assert!(table.take_if_current(&ItemId::from("a"), first).is_none());
        assert!(table.contains(&ItemId::from("a")));
        assert!(table.take_if_current(&ItemId::from("a"), second).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut table = PendingTable::new();
        table.begin(create("a"));
        table.begin(create("b"));
        assert_eq!(table.clear(), 2);
        assert_eq!(table.len(), 0);
    }
}
