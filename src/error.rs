//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the map, the cache and the memoizer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the map or cache
    #[error("Key not found")]
    KeyNotFound,

    /// Random selection requested on an empty map
    #[error("Map is empty")]
    EmptyMap,

    /// Call arguments cannot be turned into a cache key
    #[error("Unhashable arguments: {0}")]
    UnhashableArguments(String),

    /// Rejected construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot could not be encoded or decoded
    #[error("Persistence error: {0}")]
    Persistence(#[from] serde_json::Error),

    /// Snapshot decoded but violates the entry/timestamp pairing
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Reading or writing the snapshot stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(CacheError::KeyNotFound.to_string(), "Key not found");
        assert_eq!(CacheError::EmptyMap.to_string(), "Map is empty");
        assert_eq!(
            CacheError::UnhashableArguments("list".to_string()).to_string(),
            "Unhashable arguments: list"
        );
        assert_eq!(
            CacheError::InvalidConfig("capacity must be positive".to_string()).to_string(),
            "Invalid configuration: capacity must be positive"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_slice::<u32>(b"not json").unwrap_err();
        let err: CacheError = err.into();
        assert!(matches!(err, CacheError::Persistence(_)));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: CacheError = err.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("short read"));
    }
}
