// Persistence of a filter: the raw bucket table image plus every stored entry.

use crate::hash::{KeyHasher, TagHasher};
use crate::store::ValueStore;
use crate::table::{BucketTable, SLOTS_PER_BUCKET};
use crate::victim::Victim;
use crate::{CuckooFilter, num_buckets_for};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};

/// Error returned when a snapshot does not describe a consistent filter.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SnapshotError {
    #[error("bits_per_item must be 4, 8 or 16, got {0}")]
    InvalidBitsPerItem(usize),
    #[error("bucket count must be a non-zero power of two that fits the address space, got {0}")]
    InvalidBucketCount(usize),
    #[error("max_kicks must be greater than zero")]
    InvalidMaxKicks,
    #[error("working capacity {working_capacity} does not size a table of {num_buckets} buckets")]
    WorkingCapacityMismatch {
        working_capacity: usize,
        num_buckets: usize,
    },
    #[error("{what} has length {actual}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("slot ({bucket}, {slot}) has a tag without an entry or an entry without a tag")]
    UnpairedSlot { bucket: usize, slot: usize },
    #[error("entry at ({bucket}, {slot}) does not hash to the stored tag")]
    TagMismatch { bucket: usize, slot: usize },
    #[error("entry at ({bucket}, {slot}) is not in one of its home buckets")]
    MisplacedEntry { bucket: usize, slot: usize },
    #[error("victim recorded at bucket {0} does not match the hashes of its key")]
    MisplacedVictim(usize),
    #[error("entry count is {actual}, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Owned, serializable image of a [`CuckooFilter`].
///
/// The bucket table is kept as its raw word image, so a snapshot is only
/// portable between targets with the same pointer width. Restoring requires
/// the same hasher type the filter was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<K, V> {
    max_num_keys: usize,
    working_capacity: usize,
    bits_per_item: usize,
    max_kicks: usize,
    seed: u64,
    num_buckets: usize,
    tag_hasher: TagHasher,
    words: Vec<usize>,
    entries: Vec<Option<(K, V)>>,
    victim: Option<Victim<K, V>>,
    len: usize,
}

/// Borrowed counterpart of [`Snapshot`], field for field, used to serialize a
/// filter without cloning its entries.
#[derive(Serialize)]
struct SnapshotRef<'a, K, V> {
    max_num_keys: usize,
    working_capacity: usize,
    bits_per_item: usize,
    max_kicks: usize,
    seed: u64,
    num_buckets: usize,
    tag_hasher: TagHasher,
    words: Vec<usize>,
    entries: &'a [Option<(K, V)>],
    victim: Option<&'a Victim<K, V>>,
    len: usize,
}

impl<K, V, H: Hasher + Default> CuckooFilter<K, V, H> {
    /// Take the filter apart into a snapshot.
    pub fn into_snapshot(self) -> Snapshot<K, V> {
        Snapshot {
            max_num_keys: self.max_num_keys,
            working_capacity: self.working_capacity,
            bits_per_item: self.bits_per_item,
            max_kicks: self.max_kicks,
            seed: self.seed,
            num_buckets: self.table.num_buckets(),
            tag_hasher: self.hasher.tag_hasher(),
            words: self.table.words(),
            entries: self.store.into_entries(),
            victim: self.victim,
            len: self.len,
        }
    }

    fn snapshot_ref(&self) -> SnapshotRef<'_, K, V> {
        SnapshotRef {
            max_num_keys: self.max_num_keys,
            working_capacity: self.working_capacity,
            bits_per_item: self.bits_per_item,
            max_kicks: self.max_kicks,
            seed: self.seed,
            num_buckets: self.table.num_buckets(),
            tag_hasher: self.hasher.tag_hasher(),
            words: self.table.words(),
            entries: self.store.entries(),
            victim: self.victim.as_ref(),
            len: self.len,
        }
    }
}

impl<K: Hash + Eq, V, H: Hasher + Default> CuckooFilter<K, V, H> {
    /// Rebuild a filter from a snapshot, checking that every tag is paired
    /// with an entry whose key produces that tag from one of its home buckets.
    pub fn from_snapshot(snapshot: Snapshot<K, V>) -> Result<Self, SnapshotError> {
        let Snapshot {
            max_num_keys,
            working_capacity,
            bits_per_item,
            max_kicks,
            seed,
            num_buckets,
            tag_hasher,
            words,
            entries,
            victim,
            len,
        } = snapshot;

        if ![4, 8, 16].contains(&bits_per_item) {
            return Err(SnapshotError::InvalidBitsPerItem(bits_per_item));
        }
        if !num_buckets.is_power_of_two() {
            return Err(SnapshotError::InvalidBucketCount(num_buckets));
        }
        let word_count = BucketTable::word_count(num_buckets, bits_per_item)
            .ok_or(SnapshotError::InvalidBucketCount(num_buckets))?;
        if max_kicks == 0 {
            return Err(SnapshotError::InvalidMaxKicks);
        }
        if num_buckets_for(working_capacity) != Some(num_buckets) {
            return Err(SnapshotError::WorkingCapacityMismatch {
                working_capacity,
                num_buckets,
            });
        }
        let size_in_tags = num_buckets * SLOTS_PER_BUCKET;
        if entries.len() != size_in_tags {
            return Err(SnapshotError::LengthMismatch {
                what: "value store",
                expected: size_in_tags,
                actual: entries.len(),
            });
        }
        let actual = words.len();
        let table = BucketTable::from_words(num_buckets, bits_per_item, words).ok_or(
            SnapshotError::LengthMismatch {
                what: "bucket table",
                expected: word_count,
                actual,
            },
        )?;

        let hasher = KeyHasher::<H>::new(tag_hasher, num_buckets, bits_per_item);
        let store = ValueStore::from_entries(entries);
        let mut stored = 0;
        for bucket in 0..num_buckets {
            for slot in 0..SLOTS_PER_BUCKET {
                let tag = table.read_tag(bucket, slot);
                match (tag, store.read(bucket, slot)) {
                    (0, None) => {}
                    (0, Some(_)) | (_, None) => {
                        return Err(SnapshotError::UnpairedSlot { bucket, slot });
                    }
                    (tag, Some((key, _))) => {
                        let candidates = hasher.candidates(key);
                        if candidates.tags[slot] != tag {
                            return Err(SnapshotError::TagMismatch { bucket, slot });
                        }
                        if !candidates.is_home(bucket) {
                            return Err(SnapshotError::MisplacedEntry { bucket, slot });
                        }
                        stored += 1;
                    }
                }
            }
        }
        if let Some(victim) = &victim {
            let candidates = hasher.candidates(&victim.key);
            if !candidates.is_home(victim.index) || candidates.tag_hash != victim.tag_hash {
                return Err(SnapshotError::MisplacedVictim(victim.index));
            }
            stored += 1;
        }
        if stored != len {
            return Err(SnapshotError::CountMismatch {
                expected: len,
                actual: stored,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        // Skip the draws that seeded the tag hasher
        let _ = TagHasher::from_rng(&mut rng);
        Ok(Self {
            max_num_keys,
            working_capacity,
            bits_per_item,
            max_kicks,
            seed,
            table,
            store,
            victim,
            hasher,
            rng,
            len,
        })
    }
}

impl<K, V, H> Serialize for CuckooFilter<K, V, H>
where
    K: Serialize,
    V: Serialize,
    H: Hasher + Default,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot_ref().serialize(serializer)
    }
}

impl<'de, K, V, H> Deserialize<'de> for CuckooFilter<K, V, H>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    H: Hasher + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = Snapshot::deserialize(deserializer)?;
        Self::from_snapshot(snapshot).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: u64) -> CuckooFilter<u64> {
        let mut filter = CuckooFilter::<u64>::builder()
            .working_capacity(256)
            .bits_per_item(8)
            .seed(21)
            .build()
            .unwrap();
        for key in 0..count {
            filter.insert(key, key + 1).unwrap();
        }
        filter
    }

    #[test]
    fn test_into_and_from_snapshot() {
        let filter = filled(100);
        let restored = CuckooFilter::<u64>::from_snapshot(filter.into_snapshot()).unwrap();
        assert_eq!(restored.len(), 100);
        assert_eq!(restored.num_buckets(), 128);
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let mut snapshot = filled(10).into_snapshot();
        snapshot.num_buckets = 100;
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::InvalidBucketCount(100)
        );

        let mut snapshot = filled(10).into_snapshot();
        snapshot.entries.pop();
        assert!(matches!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::LengthMismatch { what: "value store", .. }
        ));

        let mut snapshot = filled(10).into_snapshot();
        snapshot.bits_per_item = 12;
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::InvalidBitsPerItem(12)
        );
    }

    #[test]
    fn test_rejects_oversized_geometry_without_panicking() {
        let mut snapshot = filled(0).into_snapshot();
        snapshot.num_buckets = 1 << 62;
        snapshot.words.clear();
        snapshot.entries.clear();
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::InvalidBucketCount(1 << 62)
        );

        // A working capacity that maps to the oversized table gets no further
        let mut snapshot = filled(0).into_snapshot();
        snapshot.working_capacity = usize::MAX;
        snapshot.num_buckets = 1 << 63;
        snapshot.words.clear();
        snapshot.entries.clear();
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::InvalidBucketCount(1 << 63)
        );
    }

    #[test]
    fn test_rejects_settings_the_builder_refuses() {
        let mut snapshot = filled(10).into_snapshot();
        snapshot.max_kicks = 0;
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::InvalidMaxKicks
        );

        let mut snapshot = filled(10).into_snapshot();
        snapshot.working_capacity = 4;
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::WorkingCapacityMismatch {
                working_capacity: 4,
                num_buckets: 128
            }
        );
    }

    #[test]
    fn test_rejects_unpaired_and_foreign_entries() {
        let mut snapshot = filled(10).into_snapshot();
        let position = snapshot.entries.iter().position(Option::is_some).unwrap();
        snapshot.entries[position] = None;
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::UnpairedSlot {
                bucket: position / SLOTS_PER_BUCKET,
                slot: position % SLOTS_PER_BUCKET
            }
        );

        let mut snapshot = filled(10).into_snapshot();
        let position = snapshot.entries.iter().position(Option::is_some).unwrap();
        // A key that hashes elsewhere can not sit behind this tag
        let reference = filled(0);
        let foreign = (1000u64..)
            .find(|key| !reference.candidates(key).is_home(position / SLOTS_PER_BUCKET))
            .unwrap();
        snapshot.entries[position] = Some((foreign, 0));
        assert!(matches!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::TagMismatch { .. } | SnapshotError::MisplacedEntry { .. }
        ));
    }

    #[test]
    fn test_rejects_wrong_count() {
        let mut snapshot = filled(10).into_snapshot();
        snapshot.len = 11;
        assert_eq!(
            CuckooFilter::<u64>::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::CountMismatch {
                expected: 11,
                actual: 10
            }
        );
    }
}
