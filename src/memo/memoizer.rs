//! Memoizer Module
//!
//! Wraps a function so repeated calls with equal arguments are answered from a cache.

use std::io::{Read, Write};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{BoundedTtlCache, CacheStats, Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::memo::{Args, CallKey};

// == Memo Options ==
/// Settings for a memoized function.
#[derive(Debug, Clone)]
pub struct MemoOptions<V> {
    /// Maximum number of cached results
    pub capacity: usize,
    /// Lifetime of a cached result
    pub ttl: Duration,
    /// Results equal to any of these are returned but never cached
    pub ignore_values: Vec<V>,
    /// Call straight through instead of failing when arguments cannot form a key
    pub tolerate_unhashable_args: bool,
}

impl<V> MemoOptions<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            ignore_values: Vec::new(),
            tolerate_unhashable_args: false,
        }
    }

    /// Takes capacity, TTL and the unhashable policy from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            tolerate_unhashable_args: config.tolerate_unhashable_args,
            ..Self::new(config.capacity, config.ttl())
        }
    }

    /// Adds a result that should never be cached.
    pub fn ignore_value(mut self, value: V) -> Self {
        self.ignore_values.push(value);
        self
    }

    pub fn tolerate_unhashable_args(mut self, tolerate: bool) -> Self {
        self.tolerate_unhashable_args = tolerate;
        self
    }
}

// == Memoized Function ==
/// A function paired with the cache that remembers its results.
///
/// Each wrapper owns its cache exclusively; two wrappers never share results.
pub struct Memoized<F, V, C = SystemClock> {
    func: F,
    cache: BoundedTtlCache<CallKey, V, C>,
    ignore_values: Vec<V>,
    tolerate_unhashable_args: bool,
}

impl<F, V> Memoized<F, V, SystemClock>
where
    F: FnMut(&Args) -> V,
    V: Clone + PartialEq,
{
    /// Wraps `func` with a cache built from `options`.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero capacity or unrepresentable TTL.
    pub fn new(func: F, options: MemoOptions<V>) -> Result<Self> {
        Self::with_clock(func, options, SystemClock)
    }
}

impl<F, V, C> Memoized<F, V, C>
where
    F: FnMut(&Args) -> V,
    V: Clone + PartialEq,
    C: Clock,
{
    /// Wraps `func` with a cache that reads time from `clock`.
    pub fn with_clock(func: F, options: MemoOptions<V>, clock: C) -> Result<Self> {
        let cache = BoundedTtlCache::with_clock(options.capacity, options.ttl, clock)?;
        Ok(Self {
            func,
            cache,
            ignore_values: options.ignore_values,
            tolerate_unhashable_args: options.tolerate_unhashable_args,
        })
    }

    // == Call ==
    /// Returns the cached result for `args`, computing and storing it on a miss.
    ///
    /// # Errors
    /// `UnhashableArguments` when the arguments cannot form a key and the
    /// wrapper does not tolerate that.
    pub fn call(&mut self, args: &Args) -> Result<V> {
        // Unhashable arguments either bypass the cache or fail the call
        let key = match CallKey::from_args(args) {
            Ok(key) => key,
            Err(err) if self.tolerate_unhashable_args => {
                debug!(error = %err, "Bypassing cache for unhashable arguments");
                return Ok((self.func)(args));
            }
            Err(err) => return Err(err),
        };

        // Check if cached
        if let Some(value) = self.cache.get(&key) {
            return Ok(value.clone());
        }

        let value = (self.func)(args);
        // Ignored results are returned but never stored
        if !self.ignore_values.contains(&value) {
            self.cache.put(key, value.clone());
        }
        Ok(value)
    }

    /// Drops the cached result for `args`.
    pub fn invalidate(&mut self, args: &Args) -> Result<V> {
        let key = CallKey::from_args(args)?;
        self.cache.invalidate(&key)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Read access to the underlying cache.
    pub fn cache(&self) -> &BoundedTtlCache<CallKey, V, C> {
        &self.cache
    }

    // == Persistence ==
    pub fn snapshot(&self) -> Result<Vec<u8>>
    where
        V: Serialize,
    {
        self.cache.snapshot()
    }

    /// Replaces cached results from a snapshot; `Ok(false)` on a version mismatch.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<bool>
    where
        V: DeserializeOwned,
    {
        self.cache.restore(bytes)
    }

    pub fn dump<W: Write>(&self, writer: W) -> Result<()>
    where
        V: Serialize,
    {
        self.cache.dump(writer)
    }

    pub fn load<R: Read>(&mut self, reader: R) -> Result<bool>
    where
        V: DeserializeOwned,
    {
        self.cache.load(reader)
    }
}

/// Wraps `func` in a [`Memoized`] using the system clock.
pub fn memoize<F, V>(options: MemoOptions<V>, func: F) -> Result<Memoized<F, V>>
where
    F: FnMut(&Args) -> V,
    V: Clone + PartialEq,
{
    Memoized::new(func, options)
}
