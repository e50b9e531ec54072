//! Cache Store Module
//!
//! Bounded cache combining a random-eviction map with per-entry timestamps for lazy TTL expiry.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::io::{Read, Write};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{
    peek_version, CacheStats, Clock, RandomMap, Snapshot, SystemClock, FORMAT_VERSION,
};
use crate::error::{CacheError, Result};

// == Bounded TTL Cache ==
/// Fixed-capacity cache with random eviction and lazy expiry.
///
/// Every stored key carries the instant it was last written. An entry older
/// than `ttl` is dropped the next time it is looked up; until then it keeps
/// occupying a slot and may be picked for eviction like any other entry.
#[derive(Debug)]
pub struct BoundedTtlCache<K, V, C = SystemClock> {
    /// Key-value storage
    store: RandomMap<K, V>,
    /// Last write instant per key, same key set as `store`
    timestamps: HashMap<K, DateTime<Utc>>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Entry lifetime as configured
    ttl: Duration,
    /// Entry lifetime for timestamp arithmetic
    max_age: TimeDelta,
    clock: C,
}

impl<K, V> BoundedTtlCache<K, V, SystemClock>
where
    K: Clone + Eq + Hash,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, each for at most `ttl`.
    ///
    /// # Errors
    /// `InvalidConfig` if `capacity` is zero or `ttl` is too large to represent.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::with_clock(capacity, ttl, SystemClock)
    }
}

impl<K, V, C> BoundedTtlCache<K, V, C>
where
    K: Clone + Eq + Hash,
    C: Clock,
{
    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(capacity: usize, ttl: Duration, clock: C) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        let max_age = TimeDelta::from_std(ttl).map_err(|_| {
            CacheError::InvalidConfig(format!("ttl of {:?} is out of range", ttl))
        })?;

        Ok(Self {
            store: RandomMap::new(),
            timestamps: HashMap::new(),
            stats: CacheStats::new(),
            capacity,
            ttl,
            max_age,
            clock,
        })
    }

    /// Makes eviction choices reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.store.reseed(seed);
        self
    }

    // == Put ==
    /// Stores a value and stamps it with the current time.
    ///
    /// Overwriting an existing key never evicts and always restarts its TTL.
    /// A new key arriving at a full cache first evicts a random entry.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    pub fn put(&mut self, key: K, value: V) {
        // Only a new key can push the cache past capacity
        if !self.store.contains_key(&key) && self.store.len() >= self.capacity {
            self.evict_one();
        }

        // Insert or overwrite, restarting the TTL either way
        let now = self.clock.now();
        self.store.insert(key.clone(), value);
        self.timestamps.insert(key, now);
        self.stats.set_total_entries(self.store.len());
    }

    fn evict_one(&mut self) {
        if let Ok((evicted, _)) = self.store.random_remove() {
            self.timestamps.remove(&evicted);
            self.stats.record_eviction();
            debug!(capacity = self.capacity, "Evicted random entry");
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and not older than the TTL.
    ///
    /// An expired entry is removed by the same call that detects it.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        // Check if the key exists
        let Some(&stamped) = self.timestamps.get(key) else {
            self.stats.record_miss();
            return None;
        };

        // Check if expired
        if self.is_stale(self.clock.now(), stamped) {
            self.discard(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!("Entry expired on access");
            return None;
        }

        self.stats.record_hit();
        self.store.get(key).ok()
    }

    /// Returns a clone of the live value for `key`, or `default`.
    pub fn get_or<Q>(&mut self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get(key).cloned().unwrap_or(default)
    }

    fn is_stale(&self, now: DateTime<Utc>, stamped: DateTime<Utc>) -> bool {
        now.signed_duration_since(stamped) > self.max_age
    }

    // == Invalidate ==
    /// Removes `key` and returns its value.
    ///
    /// # Errors
    /// `KeyNotFound` if the key is not stored.
    pub fn invalidate<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.store.remove(key)?;
        self.timestamps.remove(key);
        self.stats.set_total_entries(self.store.len());
        Ok(value)
    }

    fn discard<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.remove(key).ok();
        self.timestamps.remove(key);
        self.stats.set_total_entries(self.store.len());
    }

    // == Cleanup Expired ==
    /// Removes every entry older than the TTL.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<K> = self
            .timestamps
            .iter()
            .filter(|(_, stamped)| self.is_stale(now, **stamped))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.discard(key);
        }

        self.stats.record_expirations(expired.len());
        if !expired.is_empty() {
            debug!(removed = expired.len(), "Swept expired entries");
        }
        expired.len()
    }

    // == Clear ==
    /// Removes all entries. Statistics are kept.
    pub fn clear(&mut self) {
        self.store.clear();
        self.timestamps.clear();
        self.stats.set_total_entries(0);
    }

    // == Accessors ==
    /// Returns the number of stored entries, including expired ones not yet detected.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Membership test that does not check or enforce the TTL.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Format tag this cache writes and accepts.
    pub fn version(&self) -> &'static str {
        FORMAT_VERSION
    }

    /// Iterates over stored entries in unspecified order without expiring them.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.store.iter()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.store.len());
        stats
    }

    // == Snapshot ==
    /// Serializes entries, timestamps and the format version.
    pub fn snapshot(&self) -> Result<Vec<u8>>
    where
        K: Serialize,
        V: Serialize,
    {
        let snapshot = Snapshot {
            entries: self.store.iter().collect(),
            timestamps: self.timestamps.iter().map(|(key, &at)| (key, at)).collect(),
            version: FORMAT_VERSION.to_string(),
        };
        Ok(snapshot.to_bytes()?)
    }

    // == Restore ==
    /// Replaces the cache contents with a snapshot.
    ///
    /// Returns `Ok(false)` and leaves the cache untouched when the snapshot
    /// carries a different format version, whatever the shape of its payload.
    /// Entries beyond capacity are dropped at random without counting as
    /// evictions.
    ///
    /// # Arguments
    /// * `bytes` - A snapshot produced by [`BoundedTtlCache::snapshot`]
    ///
    /// # Errors
    /// `Persistence` for undecodable bytes, `CorruptSnapshot` when entries and
    /// timestamps do not cover the same keys. The cache is unchanged on error.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<bool>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        // Check the format tag before touching the payload
        let version = peek_version(bytes)?;
        if version != FORMAT_VERSION {
            warn!(
                found = %version,
                expected = FORMAT_VERSION,
                "Skipping snapshot with mismatched format version"
            );
            return Ok(false);
        }

        let snapshot: Snapshot<K, V> = Snapshot::from_bytes(bytes)?;

        // Every entry needs exactly one timestamp
        let timestamps: HashMap<K, DateTime<Utc>> = snapshot.timestamps.into_iter().collect();
        let paired = {
            let mut seen = HashSet::with_capacity(snapshot.entries.len());
            timestamps.len() == snapshot.entries.len()
                && snapshot
                    .entries
                    .iter()
                    .all(|(key, _)| timestamps.contains_key(key) && seen.insert(key))
        };
        if !paired {
            return Err(CacheError::CorruptSnapshot(
                "entries and timestamps cover different keys".to_string(),
            ));
        }

        // Swap in the restored state, then trim to capacity
        self.store.clear();
        self.store.extend(snapshot.entries);
        self.timestamps = timestamps;
        let mut trimmed = 0;
        while self.store.len() > self.capacity {
            let Ok((dropped, _)) = self.store.random_remove() else {
                break;
            };
            self.timestamps.remove(&dropped);
            trimmed += 1;
        }
        if trimmed > 0 {
            debug!(trimmed, capacity = self.capacity, "Trimmed restored snapshot");
        }
        self.stats.set_total_entries(self.store.len());

        info!(entries = self.store.len(), "Restored cache snapshot");
        Ok(true)
    }

    /// Writes a snapshot to `writer`.
    pub fn dump<W: Write>(&self, mut writer: W) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        writer.write_all(&self.snapshot()?)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a snapshot from `reader` and restores it.
    pub fn load<R: Read>(&mut self, mut reader: R) -> Result<bool>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.restore(&bytes)
    }
}

#[cfg(test)]
impl<K, V, C> BoundedTtlCache<K, V, C>
where
    K: Clone + Eq + Hash,
{
    /// Checks that the map is dense and the timestamp table mirrors it.
    pub(crate) fn check_invariants(&self) -> bool {
        self.store.check_invariants()
            && self.timestamps.len() == self.store.len()
            && self.store.keys().all(|key| self.timestamps.contains_key(key))
    }

    pub(crate) fn timestamp_count(&self) -> usize {
        self.timestamps.len()
    }
}
