//! Concurrent maps of reference counted values.

use core::borrow::Borrow;
use core::hash::Hash;

use std::collections::hash_map::{self, HashMap};
use std::sync::Arc;
use std::vec::Vec;

use parking_lot::RwLock;

//------------ Store ---------------------------------------------------------

/// A concurrent map from keys to reference counted values.
///
/// Values are stored behind an [`Arc`]. Readers get a clone of the arc and
/// thus keep a valid view of a value even after it has been removed from
/// the store or replaced.
///
/// Insertion never overwrites: the first value inserted for a key wins.
#[derive(Debug)]
pub struct Store<K, V> {
    map: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> Store<K, V> {
    pub fn new() -> Self {
        Store {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a value if there is none for `key` yet.
    ///
    /// On collision, the value already present is returned as the error.
    pub fn insert_unique(&self, key: K, value: Arc<V>) -> Result<(), Arc<V>> {
        match self.map.write().entry(key) {
            hash_map::Entry::Occupied(entry) => Err(entry.get().clone()),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Returns the value for `key` inserting it via `op` if necessary.
    pub fn get_or_insert_with(
        &self,
        key: K,
        op: impl FnOnce() -> V,
    ) -> Arc<V> {
        self.map
            .write()
            .entry(key)
            .or_insert_with(|| Arc::new(op()))
            .clone()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.read().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.read().contains_key(key)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.write().remove(key)
    }

    /// Modifies the value for `key` in place.
    ///
    /// If other references to the value exist, the value is cloned first so
    /// that they keep seeing the old value. Returns `false` if there is no
    /// value for the key.
    pub fn update<Q>(&self, key: &Q, op: impl FnOnce(&mut V)) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Clone,
    {
        match self.map.write().get_mut(key) {
            Some(value) => {
                op(Arc::make_mut(value));
                true
            }
            None => false,
        }
    }

    /// Returns a snapshot of all values.
    ///
    /// The order of the values is unspecified.
    pub fn values(&self) -> Vec<Arc<V>> {
        self.map.read().values().cloned().collect()
    }

    /// Removes and returns all values.
    pub fn take_all(&self) -> Vec<Arc<V>> {
        self.map.write().drain().map(|(_, value)| value).collect()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

//--- Default

impl<K: Eq + Hash, V> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

//============ Testing =======================================================
