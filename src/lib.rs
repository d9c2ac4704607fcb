// Cuckoo Filter With Exact Values
// A compact probabilistic membership index that also stores the exact key and a
// value for every occupied slot, so tag matches can be confirmed and tag collisions
// between different keys are detected instead of reported as hits.

mod hash;
mod shared;
mod snapshot;
mod store;
mod table;
mod victim;

pub use hash::Candidates;
pub use shared::SharedCuckooFilter;
pub use snapshot::{Snapshot, SnapshotError};
pub use table::SLOTS_PER_BUCKET;

use derive_builder::Builder;
use hash::{KeyHasher, TagHasher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use store::ValueStore;
use table::{BucketTable, Insertion};
use tracing::{debug, trace};
use victim::Victim;

/// Fixed internal staging capacity the table is sized for, whatever the
/// requested number of keys.
pub const DEFAULT_WORKING_CAPACITY: usize = 2 * (1 << 16);

/// Default bound on the length of an eviction chain.
pub const DEFAULT_MAX_KICKS: usize = 500;

/// Load above which the bucket count is doubled at construction.
const MAX_LOAD_FACTOR: f64 = 0.96;

/// Error type for Cuckoo Filter insert operation
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// Returned when a victim is already parked and the filter accepts no more keys
    #[error("Not enough space to store this item.")]
    NotEnoughSpace,
}

/// Number of buckets for a working capacity: the next power of two holding
/// `working_capacity` tags, doubled if that would load it above 96%.
///
/// Returns `None` if the bucket count or the table's bit count would overflow
/// `usize` at the widest tag size.
pub fn num_buckets_for(working_capacity: usize) -> Option<usize> {
    let num_buckets = (working_capacity / SLOTS_PER_BUCKET)
        .max(1)
        .checked_next_power_of_two()?;
    let load = working_capacity as f64 / num_buckets as f64 / SLOTS_PER_BUCKET as f64;
    let num_buckets = if load > MAX_LOAD_FACTOR {
        num_buckets.checked_mul(2)?
    } else {
        num_buckets
    };
    BucketTable::word_count(num_buckets, 16).map(|_| num_buckets)
}

/// A tag and its exact entry, written to one address as a single step.
struct PlaceEntry<K, V> {
    bucket: usize,
    slot: usize,
    tag: u32,
    key: K,
    value: V,
}

/// What happened when an entry was offered to a bucket.
enum Offer<K, V> {
    Placed,
    /// The entry took an occupied slot; the former occupant is handed back.
    Displaced(K, V),
    /// The bucket was full and evictions were not allowed; the entry is handed back.
    Refused(K, V),
}

/// Addresses of tag matches for one key, split by whether the stored key agreed.
#[derive(Default)]
struct Probe {
    hits: Vec<(usize, usize)>,
    false_positives: Vec<(usize, usize)>,
}

/// A cuckoo filter that keeps the exact key and a value behind every tag.
///
/// ## Layout
///
/// - A bucket table of power-of-two many buckets, four tag slots each.
///   Tags are `bits_per_item` wide and never zero; zero marks an empty slot.
/// - A value store holding the `(key, value)` for every non-zero tag, at the
///   same `(bucket, slot)` address.
/// - A single-entry victim cache for the key left over when an eviction chain
///   runs out of kicks.
///
/// ## Addressing
///
/// A key hashes to two home buckets and four tags, one per slot position.
/// A key sitting at slot `s` is represented by its `s`-th tag. Because the full
/// key is kept in the value store, a displaced entry recomputes its homes from
/// its key rather than from its tag.
///
/// ## Lookups
///
/// [`filter_only_test`](Self::filter_only_test) answers from tags alone and has
/// false positives. [`contains`](Self::contains), [`find`](Self::find) and
/// [`erase`](Self::erase) confirm every tag match against the stored key. A
/// match that turns out to belong to another key is a false positive; it is
/// reported as absent and the colliding entry is moved to a random other slot
/// of its bucket, where it carries a different tag. That repair is best effort:
/// the new arrangement can collide with other keys in turn.
///
/// ## Capacity
///
/// Insertion runs a bounded cuckoo eviction chain (`max_kicks`, 500 by
/// default). If the chain is exhausted the homeless entry is parked as the
/// victim and the insert still succeeds; from then on inserts fail with
/// [`Error::NotEnoughSpace`] until an erase frees a slot for the victim.
///
/// ## Concurrency
///
/// Mutating operations, including `find` and `contains` which may repair
/// collisions, take `&mut self`. Wrap the filter in a
/// [`SharedCuckooFilter`] to share it between threads.
#[derive(Debug, Builder)]
#[builder(
    pattern = "owned",
    build_fn(private, name = "base_build", validate = "Self::validate")
)]
pub struct CuckooFilter<K, V = u64, H = DefaultHasher>
where
    H: Hasher + Default,
{
    // Configuration parameters
    /// Number of keys the caller expects to store; reported, not used for sizing
    #[builder(default = "1")]
    max_num_keys: usize,

    /// Internal staging capacity the bucket count is derived from
    #[builder(default = "DEFAULT_WORKING_CAPACITY")]
    working_capacity: usize,

    /// Size of tags in bits (must be 4, 8 or 16)
    #[builder(default = "16")]
    bits_per_item: usize,

    /// Maximum number of eviction steps before parking the entry as victim
    #[builder(default = "DEFAULT_MAX_KICKS")]
    max_kicks: usize,

    /// Seed for the filter's random source (tag hash seeds, kick and repair slots)
    #[builder(default = "rand::random()")]
    seed: u64,

    // Internal values - derived from the configuration
    /// Tag storage
    #[builder(setter(skip))]
    table: BucketTable,

    /// Exact entries behind the tags
    #[builder(setter(skip))]
    store: ValueStore<K, V>,

    /// Entry parked after an exhausted eviction chain
    #[builder(setter(skip))]
    victim: Option<Victim<K, V>>,

    /// Maps keys to their home buckets and tags
    #[builder(setter(skip))]
    hasher: KeyHasher<H>,

    /// Random source for kick and repair slot choices
    #[builder(setter(skip), default = "StdRng::seed_from_u64(0)")]
    rng: StdRng,

    /// Number of stored entries, victim included
    #[builder(setter(skip))]
    len: usize,
}

impl<K, V, H> CuckooFilter<K, V, H>
where
    K: Hash + Eq,
    H: Hasher + Default,
{
    /// Insert a key and its value.
    ///
    /// Duplicate keys are not detected; inserting a key twice stores two
    /// entries.
    ///
    /// Returns `Ok(())` if the entry was stored in the table or parked as the
    /// victim, or `Error::NotEnoughSpace` if a victim was already parked.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), Error> {
        if self.victim.is_some() {
            return Err(Error::NotEnoughSpace);
        }
        let candidates = self.hasher.candidates(&key);
        self.victim = self.place(key, value, candidates.index1, candidates.tag_hash);
        if let Some(victim) = &self.victim {
            debug!(
                bucket = victim.index,
                max_kicks = self.max_kicks,
                "eviction chain exhausted, entry parked as victim"
            );
        }
        self.len += 1;
        Ok(())
    }

    /// Look up the value stored for a key.
    ///
    /// If the key was inserted more than once, the value of the last copy in
    /// scan order is returned. Tag collisions found on the way are repaired.
    pub fn find<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let candidates = self.hasher.candidates(key);
        if let Some(victim) = &self.victim
            && victim.matches(key, &candidates)
        {
            return Some(victim.value.clone());
        }
        let probe = self.probe(key, &candidates);
        let value = probe
            .hits
            .last()
            .and_then(|&(bucket, slot)| self.store.read(bucket, slot))
            .map(|(_, value)| value.clone());
        self.remove_false_positives(key, &probe.false_positives);
        value
    }

    /// Check whether a key is stored, confirming tag matches against the
    /// stored key. Tag collisions found on the way are repaired.
    pub fn contains<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let candidates = self.hasher.candidates(key);
        if let Some(victim) = &self.victim
            && victim.matches(key, &candidates)
        {
            return true;
        }
        let probe = self.probe(key, &candidates);
        self.remove_false_positives(key, &probe.false_positives);
        !probe.hits.is_empty()
    }

    /// Check whether a key is possibly stored, from tags alone.
    ///
    /// Returns `true` if either home bucket holds one of the key's tags at the
    /// matching slot or the key is the victim. May report false positives;
    /// never reports false negatives.
    pub fn filter_only_test<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let candidates = self.hasher.candidates(key);
        if let Some(victim) = &self.victim
            && victim.matches(key, &candidates)
        {
            return true;
        }
        candidates.buckets().any(|bucket| {
            self.table
                .read_bucket(bucket)
                .iter()
                .zip(&candidates.tags)
                .any(|(stored, tag)| stored == tag)
        })
    }

    /// Remove every stored copy of a key.
    ///
    /// Returns `true` if at least one entry was removed. When a slot is freed
    /// and a victim is parked, the victim is run through the eviction chain
    /// again from its recorded bucket.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let candidates = self.hasher.candidates(key);
        if self
            .victim
            .as_ref()
            .is_some_and(|victim| victim.matches(key, &candidates))
        {
            self.victim = None;
            self.len -= 1;
            return true;
        }

        let probe = self.probe(key, &candidates);
        for &(bucket, slot) in &probe.hits {
            self.vacate(bucket, slot);
        }
        self.remove_false_positives(key, &probe.false_positives);
        if probe.hits.is_empty() {
            return false;
        }
        self.len -= probe.hits.len();

        if let Some(victim) = self.victim.take() {
            self.victim = self.place(victim.key, victim.value, victim.index, victim.tag_hash);
            match &self.victim {
                Some(victim) => debug!(bucket = victim.index, "victim displaced again"),
                None => debug!("victim moved back into the table"),
            }
        }
        true
    }

    /// The home buckets and tags a key maps to in this filter.
    pub fn candidates<Q>(&self, key: &Q) -> Candidates
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.hasher.candidates(key)
    }

    /// Run the eviction chain for an entry, starting at bucket `index`.
    ///
    /// The first attempt only takes an empty slot; every later attempt may
    /// evict. An evicted entry continues at whichever of its home buckets is
    /// not the one it was evicted from.
    ///
    /// Returns the entry still homeless after `max_kicks` attempts.
    fn place(
        &mut self,
        mut key: K,
        mut value: V,
        mut index: usize,
        mut tag_hash: u64,
    ) -> Option<Victim<K, V>> {
        for count in 0..self.max_kicks {
            let tags = self.hasher.tags_for(tag_hash);
            match self.offer(index, &tags, count > 0, key, value) {
                Offer::Placed => return None,
                Offer::Displaced(next_key, next_value) | Offer::Refused(next_key, next_value) => {
                    key = next_key;
                    value = next_value;
                }
            }
            let candidates = self.hasher.candidates(&key);
            tag_hash = candidates.tag_hash;
            index = if index == candidates.index1 {
                candidates.index2
            } else {
                candidates.index1
            };
        }
        Some(Victim {
            index,
            tag_hash,
            key,
            value,
        })
    }

    /// Offer an entry to a bucket, writing its tag and entry together.
    fn offer(
        &mut self,
        bucket: usize,
        tags: &[u32; SLOTS_PER_BUCKET],
        kickout: bool,
        key: K,
        value: V,
    ) -> Offer<K, V> {
        match self
            .table
            .insert_tag_to_bucket(bucket, tags, kickout, &mut self.rng)
        {
            Insertion::Placed(slot) => {
                self.store.write(bucket, slot, key, value);
                Offer::Placed
            }
            Insertion::Kicked { slot, evicted_tag } => {
                trace!(bucket, slot, evicted_tag, "kicked out entry");
                match self.store.write(bucket, slot, key, value) {
                    Some((evicted_key, evicted_value)) => Offer::Displaced(evicted_key, evicted_value),
                    None => Offer::Placed,
                }
            }
            Insertion::Full => Offer::Refused(key, value),
        }
    }

    fn apply(&mut self, entry: PlaceEntry<K, V>) -> Option<(K, V)> {
        self.table.write_tag(entry.bucket, entry.slot, entry.tag);
        self.store.write(entry.bucket, entry.slot, entry.key, entry.value)
    }

    fn vacate(&mut self, bucket: usize, slot: usize) -> Option<(K, V)> {
        self.table.write_tag(bucket, slot, 0);
        self.store.delete(bucket, slot)
    }

    /// Scan both home buckets for the key's tags and check each match against
    /// the stored key.
    fn probe<Q>(&self, key: &Q, candidates: &Candidates) -> Probe
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut probe = Probe::default();
        for bucket in candidates.buckets() {
            let tags = self.table.read_bucket(bucket);
            for slot in (0..SLOTS_PER_BUCKET).filter(|&slot| tags[slot] == candidates.tags[slot]) {
                match self.store.read(bucket, slot) {
                    Some((stored, _)) if stored.borrow() == key => probe.hits.push((bucket, slot)),
                    Some(_) => probe.false_positives.push((bucket, slot)),
                    None => {}
                }
            }
        }
        probe
    }

    fn remove_false_positives<Q>(&mut self, key: &Q, addresses: &[(usize, usize)])
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        for &(bucket, slot) in addresses {
            self.remove_false_positive(key, bucket, slot);
        }
    }

    /// Move the entry that collided with `key` at `(bucket, slot)` to a random
    /// other slot of the same bucket.
    ///
    /// The entry previously at the chosen slot, if any, takes `slot`. Both
    /// entries are rewritten with their own tag for their new slot position.
    /// Skipped if the address no longer holds a different key.
    fn remove_false_positive<Q>(&mut self, key: &Q, bucket: usize, slot: usize)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        match self.store.read(bucket, slot) {
            Some((stored, _)) if stored.borrow() != key => {}
            _ => return,
        }
        let new_slot = match self.rng.random_range(0..SLOTS_PER_BUCKET - 1) {
            picked if picked == slot => SLOTS_PER_BUCKET - 1,
            picked => picked,
        };

        let Some((moved_key, moved_value)) = self.vacate(bucket, slot) else {
            return;
        };
        if let Some((other_key, other_value)) = self.vacate(bucket, new_slot) {
            let tag = self.hasher.candidates(&other_key).tags[slot];
            self.apply(PlaceEntry {
                bucket,
                slot,
                tag,
                key: other_key,
                value: other_value,
            });
        }
        let tag = self.hasher.candidates(&moved_key).tags[new_slot];
        self.apply(PlaceEntry {
            bucket,
            slot: new_slot,
            tag,
            key: moved_key,
            value: moved_value,
        });
        trace!(bucket, from = slot, to = new_slot, "relocated colliding entry");
    }
}

impl<K, V, H: Hasher + Default> CuckooFilter<K, V, H> {
    /// Number of stored entries, the victim included
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the filter is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether an entry is parked as victim, which blocks further inserts
    pub fn has_victim(&self) -> bool {
        self.victim.is_some()
    }

    /// Number of keys requested at construction
    pub fn max_num_keys(&self) -> usize {
        self.max_num_keys
    }

    /// Size of tags in bits
    pub fn bits_per_item(&self) -> usize {
        self.bits_per_item
    }

    /// Get the number of buckets in the table
    pub fn num_buckets(&self) -> usize {
        self.table.num_buckets()
    }

    /// Size of the bucket table in bytes
    pub fn size_in_bytes(&self) -> usize {
        self.table.size_in_bytes()
    }

    /// Number of tag slots in the bucket table
    pub fn size_in_tags(&self) -> usize {
        self.table.size_in_tags()
    }

    /// Fraction of tag slots in use
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.table.size_in_tags() as f64
    }

    /// Bucket table bits spent per stored key, `None` when empty
    pub fn bits_per_key(&self) -> Option<f64> {
        (self.len > 0).then(|| 8.0 * self.table.size_in_bytes() as f64 / self.len as f64)
    }

    /// Human-readable summary of geometry and occupancy
    pub fn info(&self) -> String {
        let bits_per_key = self
            .bits_per_key()
            .map_or_else(|| "N/A".to_string(), |bits| bits.to_string());
        format!(
            "CuckooFilter Status:\n\t\t{}\n\t\tKeys stored: {}\n\t\tLoad factor: {}\n\t\tHashtable size: {} KB\n\t\tbit/key:   {}\n",
            self.table,
            self.len,
            self.load_factor(),
            self.table.size_in_bytes() >> 10,
            bits_per_key
        )
    }

    /// Iterate over every stored `(key, value)`, table entries first, then the victim
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.store
            .iter()
            .map(|(_, (key, value))| (key, value))
            .chain(self.victim.iter().map(|victim| (&victim.key, &victim.value)))
    }

    /// Clear the filter, removing all entries and the victim
    pub fn clear(&mut self) {
        self.table.clear();
        self.store.clear();
        self.victim = None;
        self.len = 0;
    }
}

impl<K, V, H: Hasher + Default> fmt::Display for CuckooFilter<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info())
    }
}

impl<K, V> CuckooFilter<K, V, DefaultHasher> {
    /// Create a new CuckooFilterBuilder with default settings
    pub fn builder() -> CuckooFilterBuilder<K, V, DefaultHasher> {
        CuckooFilterBuilder::default()
    }

    /// Create a new CuckooFilter for `max_num_keys` keys.
    ///
    /// The table is sized for [`DEFAULT_WORKING_CAPACITY`] regardless of
    /// `max_num_keys`; the eviction chain and victim absorb overflow.
    pub fn new(max_num_keys: usize) -> CuckooFilter<K, V, DefaultHasher> {
        Self::builder().max_num_keys(max_num_keys).build().unwrap()
    }
}

impl<K, V> Default for CuckooFilter<K, V, DefaultHasher> {
    /// Create a new CuckooFilter with default settings
    fn default() -> Self {
        Self::builder().build().unwrap()
    }
}

impl<K, V, H: Hasher + Default> CuckooFilterBuilder<K, V, H> {
    /// Validate the builder configuration
    fn validate(&self) -> Result<(), String> {
        if let Some(bits_per_item) = self.bits_per_item
            && ![4, 8, 16].contains(&bits_per_item)
        {
            return Err("Invalid bits_per_item".into());
        }
        if self.working_capacity == Some(0) {
            return Err("working_capacity must be greater than zero".into());
        }
        if let Some(working_capacity) = self.working_capacity
            && num_buckets_for(working_capacity).is_none()
        {
            return Err("working_capacity is too large".into());
        }
        if self.max_kicks == Some(0) {
            return Err("max_kicks must be greater than zero".into());
        }
        Ok(())
    }

    /// Build a CuckooFilter with the specified configuration
    pub fn build(self) -> Result<CuckooFilter<K, V, H>, CuckooFilterBuilderError> {
        let mut cuckoo_filter = self.base_build()?;
        let num_buckets = num_buckets_for(cuckoo_filter.working_capacity).ok_or_else(|| {
            CuckooFilterBuilderError::ValidationError("working_capacity is too large".into())
        })?;
        // The tag hash seeds are the first draws of the filter's random source
        let mut rng = StdRng::seed_from_u64(cuckoo_filter.seed);
        cuckoo_filter.hasher = KeyHasher::new(
            TagHasher::from_rng(&mut rng),
            num_buckets,
            cuckoo_filter.bits_per_item,
        );
        cuckoo_filter.rng = rng;
        cuckoo_filter.table = BucketTable::new(num_buckets, cuckoo_filter.bits_per_item);
        cuckoo_filter.store = ValueStore::new(num_buckets);
        debug!(
            num_buckets,
            bits_per_item = cuckoo_filter.bits_per_item,
            max_num_keys = cuckoo_filter.max_num_keys,
            "cuckoo filter created"
        );
        Ok(cuckoo_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_filter(working_capacity: usize, bits_per_item: usize, seed: u64) -> CuckooFilter<u64> {
        CuckooFilter::<u64>::builder()
            .working_capacity(working_capacity)
            .bits_per_item(bits_per_item)
            .seed(seed)
            .build()
            .unwrap()
    }

    /// Every non-zero tag has an entry whose key hashes to that tag at that
    /// slot from one of its home buckets, and every empty slot has no entry.
    fn assert_paired(filter: &CuckooFilter<u64>) {
        for bucket in 0..filter.num_buckets() {
            for slot in 0..SLOTS_PER_BUCKET {
                let tag = filter.table.read_tag(bucket, slot);
                match filter.store.read(bucket, slot) {
                    None => assert_eq!(tag, 0, "tag without entry at ({bucket}, {slot})"),
                    Some((key, _)) => {
                        let candidates = filter.candidates(key);
                        assert_eq!(tag, candidates.tags[slot]);
                        assert!(candidates.is_home(bucket));
                    }
                }
            }
        }
    }

    #[test]
    fn test_sizing_policy() {
        assert_eq!(num_buckets_for(DEFAULT_WORKING_CAPACITY), Some(65536));
        assert_eq!(num_buckets_for(4), Some(2));
        assert_eq!(num_buckets_for(1), Some(1));
        assert_eq!(num_buckets_for(1000), Some(512));
        assert_eq!(num_buckets_for(960), Some(256));
        assert_eq!(num_buckets_for(1020), Some(512));
    }

    #[test]
    fn test_sizing_policy_overflow() {
        assert_eq!(num_buckets_for(usize::MAX), None);
        assert_eq!(num_buckets_for(1 << 62), None);

        let result = CuckooFilter::<u64>::builder()
            .working_capacity(usize::MAX)
            .build();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("working_capacity is too large")
        );
    }

    #[test]
    fn test_chain_keeps_tags_and_entries_paired() {
        let mut filter = small_filter(64, 8, 3);
        let mut key = 0u64;
        while !filter.has_victim() {
            filter.insert(key, key * 2).unwrap();
            key += 1;
        }
        assert_paired(&filter);
        assert_eq!(filter.len() as u64, key);
        assert_eq!(filter.iter().count() as u64, key);
    }

    #[test]
    fn test_repair_moves_colliding_entry_within_bucket() {
        let mut filter = small_filter(1, 4, 11);
        assert_eq!(filter.num_buckets(), 1);
        filter.insert(1u64, 100).unwrap();
        let (_, slot_before) = filter.store.iter().next().unwrap().0;
        assert_eq!(slot_before, 0);

        let impostor = (2u64..)
            .find(|key| filter.filter_only_test(key))
            .unwrap();
        assert!(!filter.contains(&impostor));

        let ((bucket, slot_after), (key, value)) = filter.store.iter().next().unwrap();
        assert_eq!((bucket, *key, *value), (0, 1, 100));
        assert_ne!(slot_after, slot_before);
        assert_paired(&filter);
        assert_eq!(filter.find(&1), Some(100));
    }

    #[test]
    fn test_repair_swaps_with_occupied_slot() {
        let mut filter = small_filter(1, 4, 5);
        for key in 0..4u64 {
            filter.insert(key, key + 10).unwrap();
        }
        let mut probes = 0;
        for impostor in 100u64..2000 {
            if filter.filter_only_test(&impostor) {
                probes += 1;
                assert!(!filter.contains(&impostor));
                assert_paired(&filter);
            }
        }
        assert!(probes > 0);
        for key in 0..4u64 {
            assert_eq!(filter.find(&key), Some(key + 10));
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = small_filter(256, 8, 99);
        let mut b = small_filter(256, 8, 99);
        for key in 0..300u64 {
            let _ = a.insert(key, key);
            let _ = b.insert(key, key);
        }
        assert_eq!(a.table.words(), b.table.words());
    }
}
