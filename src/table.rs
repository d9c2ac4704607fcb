// Packed bucket table.
// Tags are bit-packed into a vector of atomic words, four slots per bucket,
// with zero reserved as the "empty slot" marker.

use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of tag slots in every bucket.
pub const SLOTS_PER_BUCKET: usize = 4;

/// Result of offering a set of candidate tags to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insertion {
    /// An empty slot took the candidate tag for that slot.
    Placed(usize),
    /// No slot was empty; the occupant of `slot` was overwritten.
    Kicked { slot: usize, evicted_tag: u32 },
    /// No slot was empty and evictions were not allowed.
    Full,
}

/// Fixed-capacity table of `num_buckets` buckets holding `bits_per_item`-wide tags.
///
/// ## Memory Layout
///
/// Tags are stored most-significant-first inside each `AtomicUsize`. Since
/// `bits_per_item` is one of 4, 8 or 16, a bucket (16, 32 or 64 bits) never
/// straddles two words on 64-bit targets, and a single tag never straddles
/// two words on any target.
///
/// Every slot update is a compare-exchange on the containing word, so tag
/// reads never observe a torn tag even when a reader races the single writer.
#[derive(Debug, Default)]
pub struct BucketTable {
    bits_per_item: usize,
    num_buckets: usize,
    tag_mask: usize,
    words: Vec<AtomicUsize>,
}

impl BucketTable {
    /// Create an empty table. `num_buckets` must be a power of two for which
    /// [`BucketTable::word_count`] does not overflow.
    pub fn new(num_buckets: usize, bits_per_item: usize) -> Self {
        debug_assert!(num_buckets.is_power_of_two());
        let word_count = Self::word_count(num_buckets, bits_per_item).unwrap_or_default();
        let words = (0..word_count).map(|_| AtomicUsize::new(0)).collect();
        Self::with_words(num_buckets, bits_per_item, words)
    }

    /// Rebuild a table from a raw word image previously taken with [`BucketTable::words`].
    ///
    /// Returns `None` if the image length does not match the geometry.
    pub fn from_words(num_buckets: usize, bits_per_item: usize, words: Vec<usize>) -> Option<Self> {
        if Self::word_count(num_buckets, bits_per_item) != Some(words.len()) {
            return None;
        }
        let words = words.into_iter().map(AtomicUsize::new).collect();
        Some(Self::with_words(num_buckets, bits_per_item, words))
    }

    fn with_words(num_buckets: usize, bits_per_item: usize, words: Vec<AtomicUsize>) -> Self {
        Self {
            bits_per_item,
            num_buckets,
            tag_mask: ((1u64 << bits_per_item) - 1) as usize,
            words,
        }
    }

    /// Number of words needed to hold every tag of the table, `None` if the
    /// bit count overflows `usize`.
    pub fn word_count(num_buckets: usize, bits_per_item: usize) -> Option<usize> {
        num_buckets
            .checked_mul(SLOTS_PER_BUCKET)?
            .checked_mul(bits_per_item)
            .map(|bits| bits.div_ceil(usize::BITS as usize))
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Byte footprint of the tags (`bits_per_item / 8 * 4 * num_buckets`).
    pub fn size_in_bytes(&self) -> usize {
        self.num_buckets * SLOTS_PER_BUCKET * self.bits_per_item / 8
    }

    /// Total number of tag slots.
    pub fn size_in_tags(&self) -> usize {
        self.num_buckets * SLOTS_PER_BUCKET
    }

    /// Snapshot of the raw word image.
    pub fn words(&self) -> Vec<usize> {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Acquire))
            .collect()
    }

    /// Locate the word holding `(bucket, slot)` and the shift of the tag inside it.
    fn locate(&self, bucket: usize, slot: usize) -> (usize, usize) {
        let bit_index = (bucket * SLOTS_PER_BUCKET + slot) * self.bits_per_item;
        let word_index = bit_index / usize::BITS as usize;
        let skip_bits = bit_index % usize::BITS as usize;
        let shift = usize::BITS as usize - self.bits_per_item - skip_bits;
        (word_index, shift)
    }

    pub fn read_tag(&self, bucket: usize, slot: usize) -> u32 {
        let (word_index, shift) = self.locate(bucket, slot);
        ((self.words[word_index].load(Ordering::Acquire) >> shift) & self.tag_mask) as u32
    }

    /// Read all four tags of a bucket.
    pub fn read_bucket(&self, bucket: usize) -> [u32; SLOTS_PER_BUCKET] {
        std::array::from_fn(|slot| self.read_tag(bucket, slot))
    }

    /// Unconditionally overwrite the tag at `(bucket, slot)`.
    pub fn write_tag(&self, bucket: usize, slot: usize, tag: u32) {
        let (word_index, shift) = self.locate(bucket, slot);
        let mask = self.tag_mask << shift;
        let new_bits = (tag as usize & self.tag_mask) << shift;
        let word = &self.words[word_index];
        let mut current = word.load(Ordering::Relaxed);
        loop {
            let updated = (current & !mask) | new_bits;
            match word.compare_exchange_weak(current, updated, Ordering::Release, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Replace the tag at `(bucket, slot)` only if it still equals `old_tag`.
    ///
    /// Returns `false` if the slot no longer holds `old_tag`.
    fn update_tag(&self, bucket: usize, slot: usize, old_tag: u32, new_tag: u32) -> bool {
        let (word_index, shift) = self.locate(bucket, slot);
        let mask = self.tag_mask << shift;
        let word = &self.words[word_index];
        loop {
            let current = word.load(Ordering::Relaxed);
            if (current & mask) >> shift != old_tag as usize {
                return false;
            }
            let updated = (current & !mask) | ((new_tag as usize & self.tag_mask) << shift);
            if word
                .compare_exchange_weak(current, updated, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Offer one candidate tag per slot to `bucket`.
    ///
    /// The first empty slot `s` receives `tags[s]`. If the bucket is full and
    /// `kickout` is set, a slot is chosen uniformly at random, overwritten with
    /// its candidate tag, and reported together with the tag it held.
    pub(crate) fn insert_tag_to_bucket<R: Rng>(
        &self,
        bucket: usize,
        tags: &[u32; SLOTS_PER_BUCKET],
        kickout: bool,
        rng: &mut R,
    ) -> Insertion {
        loop {
            match self.read_bucket(bucket).iter().position(|&tag| tag == 0) {
                Some(slot) => {
                    if self.update_tag(bucket, slot, 0, tags[slot]) {
                        return Insertion::Placed(slot);
                    }
                }
                None if kickout => {
                    let slot = rng.random_range(0..SLOTS_PER_BUCKET);
                    let evicted_tag = self.read_tag(bucket, slot);
                    if self.update_tag(bucket, slot, evicted_tag, tags[slot]) {
                        return Insertion::Kicked { slot, evicted_tag };
                    }
                }
                None => return Insertion::Full,
            }
        }
    }

    /// Zero every slot.
    pub fn clear(&self) {
        for word in &self.words {
            word.store(0, Ordering::Release);
        }
    }
}

impl fmt::Display for BucketTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BucketTable with tag size: {} bits\n\t\tAssociativity: {}\n\t\tTotal # of rows: {}\n\t\tTotal # slots: {}",
            self.bits_per_item,
            SLOTS_PER_BUCKET,
            self.num_buckets,
            self.size_in_tags()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_read_write_every_width() {
        for bits in [4, 8, 16] {
            let table = BucketTable::new(8, bits);
            let max = (1u32 << bits) - 1;
            for bucket in 0..8 {
                for slot in 0..SLOTS_PER_BUCKET {
                    let tag = ((bucket * 4 + slot) as u32 % max) + 1;
                    table.write_tag(bucket, slot, tag);
                }
            }
            for bucket in 0..8 {
                for slot in 0..SLOTS_PER_BUCKET {
                    let tag = ((bucket * 4 + slot) as u32 % max) + 1;
                    assert_eq!(table.read_tag(bucket, slot), tag, "bits={bits}");
                }
            }
        }
    }

    #[test]
    fn test_write_does_not_disturb_neighbours() {
        let table = BucketTable::new(4, 4);
        table.write_tag(1, 2, 0xF);
        assert_eq!(table.read_bucket(1), [0, 0, 0xF, 0]);
        assert_eq!(table.read_bucket(0), [0; 4]);
        assert_eq!(table.read_bucket(2), [0; 4]);
        table.write_tag(1, 2, 0);
        assert_eq!(table.read_bucket(1), [0; 4]);
    }

    #[test]
    fn test_size_accounting() {
        let table = BucketTable::new(65536, 16);
        assert_eq!(table.size_in_bytes(), 2 * 4 * 65536);
        assert_eq!(table.size_in_tags(), 4 * 65536);
        let table = BucketTable::new(2, 4);
        assert_eq!(table.size_in_bytes(), 4);
    }

    #[test]
    fn test_insert_fills_first_empty_slot_with_its_tag() {
        let table = BucketTable::new(2, 8);
        let mut rng = StdRng::seed_from_u64(7);
        let tags = [11, 12, 13, 14];
        table.write_tag(0, 0, 99);
        assert_eq!(
            table.insert_tag_to_bucket(0, &tags, false, &mut rng),
            Insertion::Placed(1)
        );
        assert_eq!(table.read_tag(0, 1), 12);
    }

    #[test]
    fn test_insert_full_bucket() {
        let table = BucketTable::new(2, 8);
        let mut rng = StdRng::seed_from_u64(7);
        for slot in 0..SLOTS_PER_BUCKET {
            table.write_tag(1, slot, 50 + slot as u32);
        }
        let tags = [1, 2, 3, 4];
        assert_eq!(
            table.insert_tag_to_bucket(1, &tags, false, &mut rng),
            Insertion::Full
        );
        match table.insert_tag_to_bucket(1, &tags, true, &mut rng) {
            Insertion::Kicked { slot, evicted_tag } => {
                assert_eq!(evicted_tag, 50 + slot as u32);
                assert_eq!(table.read_tag(1, slot), tags[slot]);
            }
            other => panic!("expected a kick, got {other:?}"),
        }
    }

    #[test]
    fn test_words_roundtrip() {
        let table = BucketTable::new(4, 16);
        table.write_tag(3, 3, 0xBEEF);
        let restored = BucketTable::from_words(4, 16, table.words()).unwrap();
        assert_eq!(restored.read_tag(3, 3), 0xBEEF);
        assert!(BucketTable::from_words(8, 16, table.words()).is_none());
    }

    #[test]
    fn test_word_count_overflow() {
        assert_eq!(BucketTable::word_count(4, 16), Some(4 * 4 * 16 / 64));
        assert_eq!(BucketTable::word_count(1 << 62, 16), None);
        assert_eq!(BucketTable::word_count(1 << 62, 4), None);
        assert!(BucketTable::from_words(1 << 62, 16, Vec::new()).is_none());
    }
}
