// Single-entry overflow for the key left homeless by an exhausted eviction chain.

use crate::hash::Candidates;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// The displaced entry, with the bucket it was headed for and its tag hash.
///
/// While a filter holds a victim it refuses new keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victim<K, V> {
    pub index: usize,
    pub tag_hash: u64,
    pub key: K,
    pub value: V,
}

impl<K, V> Victim<K, V> {
    /// A key matches if it equals the victim's key and either home bucket is
    /// the one the victim was recorded against.
    pub fn matches<Q>(&self, key: &Q, candidates: &Candidates) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.key.borrow() == key && candidates.is_home(self.index)
    }
}
