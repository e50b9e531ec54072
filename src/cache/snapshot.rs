//! Snapshot Module
//!
//! Persisted form of a cache: its entries, their timestamps and a format tag.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Format tag written into every snapshot. Loaders skip any other tag.
pub const FORMAT_VERSION: &str = "0.1";

// == Snapshot ==
/// Serialized `(entries, timestamps, version)` triple.
///
/// Pairs are stored as lists rather than maps so keys need not be strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<K, V> {
    pub entries: Vec<(K, V)>,
    pub timestamps: Vec<(K, DateTime<Utc>)>,
    pub version: String,
}

impl<K, V> Snapshot<K, V>
where
    K: Serialize,
    V: Serialize,
{
    /// Encodes the snapshot as JSON bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Format tag of an encoded snapshot.
///
/// Decodes only the `version` field, so payloads of any shape can be checked
/// before their entries are decoded.
///
/// # Errors
/// Fails when `bytes` is not a JSON object carrying a string `version`.
pub fn peek_version(bytes: &[u8]) -> serde_json::Result<String> {
    #[derive(Deserialize)]
    struct Header {
        version: String,
    }

    let header: Header = serde_json::from_slice(bytes)?;
    Ok(header.version)
}

impl<K, V> Snapshot<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    /// Decodes a snapshot from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
