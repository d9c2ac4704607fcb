// Associative value store: the exact (key, value) behind every occupied slot.

use crate::table::SLOTS_PER_BUCKET;

/// Slot-addressed storage of `(key, value)` pairs.
///
/// The entry at `(bucket, slot)` is present exactly when the bucket table
/// holds a non-zero tag at the same address.
#[derive(Debug, Clone)]
pub struct ValueStore<K, V> {
    entries: Vec<Option<(K, V)>>,
}

impl<K, V> Default for ValueStore<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, V> ValueStore<K, V> {
    pub fn new(num_buckets: usize) -> Self {
        Self {
            entries: (0..num_buckets * SLOTS_PER_BUCKET).map(|_| None).collect(),
        }
    }

    /// Rebuild from a flat entry vector ordered by `bucket * 4 + slot`.
    pub fn from_entries(entries: Vec<Option<(K, V)>>) -> Self {
        Self { entries }
    }

    fn position(bucket: usize, slot: usize) -> usize {
        bucket * SLOTS_PER_BUCKET + slot
    }

    pub fn read(&self, bucket: usize, slot: usize) -> Option<&(K, V)> {
        self.entries[Self::position(bucket, slot)].as_ref()
    }

    /// Store `(key, value)` at the address, returning the previous occupant.
    pub fn write(&mut self, bucket: usize, slot: usize, key: K, value: V) -> Option<(K, V)> {
        self.entries[Self::position(bucket, slot)].replace((key, value))
    }

    pub fn delete(&mut self, bucket: usize, slot: usize) -> Option<(K, V)> {
        self.entries[Self::position(bucket, slot)].take()
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|entry| *entry = None);
    }

    pub fn entries(&self) -> &[Option<(K, V)>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Option<(K, V)>> {
        self.entries
    }

    /// Occupied entries with their `(bucket, slot)` address.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &(K, V))> {
        self.entries.iter().enumerate().filter_map(|(position, entry)| {
            entry.as_ref().map(|pair| {
                (
                    (position / SLOTS_PER_BUCKET, position % SLOTS_PER_BUCKET),
                    pair,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_delete() {
        let mut store = ValueStore::new(4);
        assert!(store.read(2, 3).is_none());
        assert_eq!(store.write(2, 3, "a", 1u64), None);
        assert_eq!(store.read(2, 3), Some(&("a", 1)));
        assert_eq!(store.write(2, 3, "b", 2), Some(("a", 1)));
        assert_eq!(store.delete(2, 3), Some(("b", 2)));
        assert!(store.read(2, 3).is_none());
        assert_eq!(store.delete(2, 3), None);
    }

    #[test]
    fn test_iter_reports_addresses() {
        let mut store = ValueStore::new(2);
        store.write(0, 1, 10u32, 100u64);
        store.write(1, 3, 11, 110);
        let seen: Vec<_> = store.iter().map(|(addr, (k, v))| (addr, *k, *v)).collect();
        assert_eq!(seen, vec![((0, 1), 10, 100), ((1, 3), 11, 110)]);
        store.clear();
        assert_eq!(store.iter().count(), 0);
    }
}
