use super::record::RequestRecord;
use std::collections::{HashMap, VecDeque};

/// Default number of in-flight records the buffer holds before evicting.
pub const DEFAULT_CAPACITY: usize = 50;

/// Insertion-ordered map from correlation identifier to [`RequestRecord`].
///
/// Order is fixed at first insertion; later access does not refresh it, so
/// eviction is FIFO rather than LRU.
#[derive(Debug, Clone)]
pub struct CorrelationBuffer {
    capacity: usize,
    records: HashMap<String, RequestRecord>,
    order: VecDeque<String>,
}

impl Default for CorrelationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CorrelationBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&RequestRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RequestRecord> {
        self.records.get_mut(id)
    }

    /// Returns the record for `id`, inserting an empty one on first sight.
    pub fn get_or_insert(&mut self, id: &str) -> &mut RequestRecord {
        if !self.records.contains_key(id) {
            self.order.push_back(id.to_string());
        }
        self.records
            .entry(id.to_string())
            .or_insert_with(|| RequestRecord::new(id))
    }

    pub fn remove(&mut self, id: &str) -> Option<RequestRecord> {
        let record = self.records.remove(id)?;
        self.order.retain(|queued| queued != id);
        Some(record)
    }

    /// Evicts the oldest record when the buffer holds more than its capacity.
    pub fn enforce_capacity(&mut self) -> Option<RequestRecord> {
        if self.records.len() <= self.capacity {
            return None;
        }
        self.evict_oldest()
    }

    pub fn evict_oldest(&mut self) -> Option<RequestRecord> {
        while let Some(id) = self.order.pop_front() {
            if let Some(record) = self.records.remove(&id) {
                return Some(record);
            }
        }
        None
    }

    /// Removes every kept record except the one for `current`.
    pub fn remove_kept_except(&mut self, current: &str) -> Vec<RequestRecord> {
        let stale: Vec<String> = self
            .order
            .iter()
            .filter(|id| id.as_str() != current)
            .filter(|id| self.records.get(id.as_str()).is_some_and(|r| r.kept))
            .cloned()
            .collect();

        stale.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_does_not_refresh_order() {
        let mut buffer = CorrelationBuffer::new(2);
        buffer.get_or_insert("a");
        buffer.get_or_insert("b");
        buffer.get_or_insert("a");
        buffer.get_or_insert("c");

        let evicted = buffer.enforce_capacity().expect("over capacity");
        assert_eq!(evicted.id, "a");
        assert_eq!(buffer.ids().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_enforce_capacity_is_noop_at_capacity() {
        let mut buffer = CorrelationBuffer::new(2);
        buffer.get_or_insert("a");
        buffer.get_or_insert("b");
        assert!(buffer.enforce_capacity().is_none());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_remove_kept_except_current() {
        let mut buffer = CorrelationBuffer::new(10);
        buffer.get_or_insert("old").kept = true;
        buffer.get_or_insert("open");
        buffer.get_or_insert("current").kept = true;

        let removed = buffer.remove_kept_except("current");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "old");
        assert!(buffer.contains("open"));
        assert!(buffer.contains("current"));
    }
}
