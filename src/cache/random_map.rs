//! Random Map Module
//!
//! Implements a hash map that can also remove a uniformly random entry in O(1).

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CacheError, Result};

// == Random Map ==
/// Map with O(1) insert, lookup, delete and uniform random selection.
///
/// Entries live in a dense vector addressed by position, while a hash index
/// maps each key to its position:
/// - `index[k]` always points at the slot holding `k`
/// - slots occupy `[0, len)` with no holes
///
/// Deleting moves the last slot into the freed position, so iteration order
/// is unspecified and changes across deletions.
#[derive(Debug, Clone)]
pub struct RandomMap<K, V> {
    /// Dense key/value storage
    slots: Vec<(K, V)>,
    /// Position of each key in `slots`
    index: HashMap<K, usize>,
    /// Source for random selection
    rng: StdRng,
}

impl<K, V> RandomMap<K, V>
where
    K: Clone + Eq + Hash,
{
    // == Constructor ==
    /// Creates an empty map whose random draws are seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates an empty map with a deterministic random sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            rng,
        }
    }

    /// Restarts the random sequence from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // == Insert ==
    /// Inserts or overwrites a value.
    ///
    /// A new key is appended at the end; an existing key keeps its position.
    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.slots[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.slots.len());
                self.slots.push((key, value));
                None
            }
        }
    }

    // == Get ==
    /// Returns a reference to the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key).ok_or(CacheError::KeyNotFound)?;
        Ok(&self.slots[position].1)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key).ok_or(CacheError::KeyNotFound)?;
        Ok(&mut self.slots[position].1)
    }

    // == Remove ==
    /// Removes `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key).ok_or(CacheError::KeyNotFound)?;
        let (_, value) = self.remove_at(position);
        Ok(value)
    }

    /// Removes the slot at `position`, filling the hole with the last slot.
    fn remove_at(&mut self, position: usize) -> (K, V) {
        let (key, value) = self.slots.swap_remove(position);
        self.index.remove(&key);
        if let Some((moved, _)) = self.slots.get(position) {
            if let Some(slot) = self.index.get_mut(moved) {
                *slot = position;
            }
        }
        (key, value)
    }

    // == Random Selection ==
    fn random_position(&mut self) -> Result<usize> {
        if self.slots.is_empty() {
            return Err(CacheError::EmptyMap);
        }
        Ok(self.rng.random_range(0..self.slots.len()))
    }

    /// Returns a key chosen uniformly at random.
    pub fn random_key(&mut self) -> Result<&K> {
        let position = self.random_position()?;
        Ok(&self.slots[position].0)
    }

    /// Returns a value chosen uniformly at random.
    pub fn random_value(&mut self) -> Result<&V> {
        let position = self.random_position()?;
        Ok(&self.slots[position].1)
    }

    /// Returns a key/value pair chosen uniformly at random.
    pub fn random_item(&mut self) -> Result<(&K, &V)> {
        let position = self.random_position()?;
        let (key, value) = &self.slots[position];
        Ok((key, value))
    }

    /// Removes and returns an entry chosen uniformly at random.
    pub fn random_remove(&mut self) -> Result<(K, V)> {
        let position = self.random_position()?;
        Ok(self.remove_at(position))
    }

    // == Length ==
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    // == Contains ==
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    // == Iteration ==
    /// Iterates over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.slots.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.iter().map(|(_, value)| value)
    }

    // == Clear ==
    /// Removes all entries, keeping the random source.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }
}

impl<K, V> Default for RandomMap<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Extend<(K, V)> for RandomMap<K, V>
where
    K: Clone + Eq + Hash,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RandomMap<K, V>
where
    K: Clone + Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

#[cfg(test)]
impl<K, V> RandomMap<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Checks that every indexed key sits at its recorded position.
    pub(crate) fn check_invariants(&self) -> bool {
        self.index.len() == self.slots.len()
            && self
                .index
                .iter()
                .all(|(key, &position)| position < self.slots.len() && self.slots[position].0 == *key)
    }
}
