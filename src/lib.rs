//! randcache - Bounded memoization with random eviction
//!
//! Provides a fixed-capacity cache that evicts a uniformly random entry when
//! full and expires entries lazily after a TTL, plus a function memoizer
//! built on top of it.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;

pub use cache::{BoundedTtlCache, RandomMap};
pub use config::Config;
pub use error::{CacheError, Result};
pub use memo::{memoize, Args, MemoOptions, Memoized};
