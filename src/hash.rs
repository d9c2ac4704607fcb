// Address and tag generation.

use crate::table::SLOTS_PER_BUCKET;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Written into the hasher ahead of the key so the tag stream is drawn from a
/// different hash than the bucket-index stream.
const TAG_STREAM_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Everything a key maps to: its two home buckets and one tag per slot position.
///
/// A key stored at slot `s` of either home bucket is always represented by
/// `tags[s]`, so moving a key to another slot also changes its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidates {
    /// First home bucket.
    pub index1: usize,
    /// Second home bucket (may equal `index1`).
    pub index2: usize,
    /// Tag for each slot position, never zero.
    pub tags: [u32; SLOTS_PER_BUCKET],
    /// The 64-bit hash the tags were cut from.
    pub tag_hash: u64,
}

impl Candidates {
    /// The distinct home buckets, `index1` first.
    pub fn buckets(&self) -> impl Iterator<Item = usize> {
        let second = (self.index2 != self.index1).then_some(self.index2);
        std::iter::once(self.index1).chain(second)
    }

    /// Whether `bucket` is one of the two home buckets.
    pub fn is_home(&self, bucket: usize) -> bool {
        bucket == self.index1 || bucket == self.index2
    }
}

/// Cut a 64-bit hash into four `bits_per_item`-wide tags, mapping zero to one.
pub fn split_tags(mut tag_hash: u64, bits_per_item: usize) -> [u32; SLOTS_PER_BUCKET] {
    let mask = (1u64 << bits_per_item) - 1;
    std::array::from_fn(|_| {
        let tag = (tag_hash & mask) as u32;
        tag_hash >>= bits_per_item;
        tag.max(1)
    })
}

/// Two-independent multiply-shift hash over 64-bit inputs, seeded once per filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHasher {
    multiply: [u64; 2],
    add: [u64; 2],
}

impl TagHasher {
    pub fn from_rng<R: Rng>(rng: &mut R) -> Self {
        Self {
            multiply: [rng.random(), rng.random::<u64>() | 1],
            add: [rng.random(), rng.random()],
        }
    }

    fn wide(parts: [u64; 2]) -> u128 {
        ((parts[0] as u128) << 64) | parts[1] as u128
    }

    pub fn hash(&self, value: u64) -> u64 {
        let product = Self::wide(self.add)
            .wrapping_add(Self::wide(self.multiply).wrapping_mul(value as u128));
        (product >> 64) as u64
    }
}

/// Derives [`Candidates`] from keys.
///
/// Bucket indices come from the two 32-bit halves of the key's `H` hash,
/// masked to the (power of two) bucket count. Tags come from a salted `H`
/// hash passed through the filter's [`TagHasher`].
#[derive(Debug, Clone, Default)]
pub struct KeyHasher<H> {
    tag_hasher: TagHasher,
    bucket_mask: usize,
    bits_per_item: usize,
    _hasher: PhantomData<H>,
}

impl<H: Hasher + Default> KeyHasher<H> {
    pub fn new(tag_hasher: TagHasher, num_buckets: usize, bits_per_item: usize) -> Self {
        Self {
            tag_hasher,
            bucket_mask: num_buckets - 1,
            bits_per_item,
            _hasher: PhantomData,
        }
    }

    pub fn tag_hasher(&self) -> TagHasher {
        self.tag_hasher
    }

    pub fn candidates<Q: ?Sized + Hash>(&self, key: &Q) -> Candidates {
        let mut hasher = H::default();
        key.hash(&mut hasher);
        let index_hash = hasher.finish();

        let mut hasher = H::default();
        hasher.write_u64(TAG_STREAM_SALT);
        key.hash(&mut hasher);
        let tag_hash = self.tag_hasher.hash(hasher.finish());

        Candidates {
            index1: (index_hash as u32 as usize) & self.bucket_mask,
            index2: ((index_hash >> 32) as usize) & self.bucket_mask,
            tags: split_tags(tag_hash, self.bits_per_item),
            tag_hash,
        }
    }

    /// Tags for a previously recorded tag hash.
    pub fn tags_for(&self, tag_hash: u64) -> [u32; SLOTS_PER_BUCKET] {
        split_tags(tag_hash, self.bits_per_item)
    }
}
