//! Cache Module
//!
//! Provides in-memory caching with random eviction and lazy TTL expiry.

mod clock;
mod random_map;
mod snapshot;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use random_map::RandomMap;
pub use snapshot::{peek_version, Snapshot, FORMAT_VERSION};
pub use stats::CacheStats;
pub use store::BoundedTtlCache;
