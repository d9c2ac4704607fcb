// Filter-granularity locking for multi-threaded use.

use crate::{Candidates, CuckooFilter, Error};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A [`CuckooFilter`] behind one reader-writer lock.
///
/// Tag writes and value store writes are not atomic as a pair inside the
/// filter, so every operation that can write either one takes the write lock.
/// That includes [`find`](Self::find) and [`contains`](Self::contains), which
/// may repair a tag collision. Only [`filter_only_test`](Self::filter_only_test)
/// and the size accessors run under the read lock.
///
/// Cloning is cheap and shares the same filter.
#[derive(Debug)]
pub struct SharedCuckooFilter<K, V = u64, H = DefaultHasher>
where
    H: Hasher + Default,
{
    inner: Arc<RwLock<CuckooFilter<K, V, H>>>,
}

impl<K, V, H: Hasher + Default> Clone for SharedCuckooFilter<K, V, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, H: Hasher + Default> From<CuckooFilter<K, V, H>> for SharedCuckooFilter<K, V, H> {
    fn from(filter: CuckooFilter<K, V, H>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(filter)),
        }
    }
}

impl<K, V, H> SharedCuckooFilter<K, V, H>
where
    K: Hash + Eq,
    H: Hasher + Default,
{
    pub fn insert(&self, key: K, value: V) -> Result<(), Error> {
        self.inner.write().insert(key, value)
    }

    pub fn find<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.write().find(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.write().contains(key)
    }

    pub fn filter_only_test<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.read().filter_only_test(key)
    }

    pub fn erase<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.write().erase(key)
    }

    pub fn candidates<Q>(&self, key: &Q) -> Candidates
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.inner.read().candidates(key)
    }
}

impl<K, V, H: Hasher + Default> SharedCuckooFilter<K, V, H> {
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn info(&self) -> String {
        self.inner.read().info()
    }

    /// Lock for reading; holds off every mutation until dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, CuckooFilter<K, V, H>> {
        self.inner.read()
    }

    /// Lock for writing, to run several operations as one step.
    pub fn write(&self) -> RwLockWriteGuard<'_, CuckooFilter<K, V, H>> {
        self.inner.write()
    }
}
