/// Blob identity and payload types
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque string identifier for blob slots.
///
/// Typically a lowercase Crockford Base32 encoding of a SHA-256 digest;
/// derivative cache entries append a `_<width>` suffix. Two ids are equal
/// iff their byte sequences are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BlobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BlobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A blob id paired with its payload. Immutable once stored under an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub id: BlobId,
    pub body: Vec<u8>,
}

impl Blob {
    pub fn new(id: BlobId, body: Vec<u8>) -> Self {
        Self { id, body }
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}
