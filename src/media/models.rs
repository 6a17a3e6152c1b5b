/// Media records and their derived metadata
use crate::{
    blob_store::{Blob, BlobId},
    encoding,
    error::{VaultError, VaultResult},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Media ids address meta blobs; alias of BlobId for type-safe reading.
pub type MediaId = BlobId;

/// Metadata about a media file.
///
/// `hash` and `id` are derived, never user-supplied: `hash` is the
/// Base32-encoded SHA-256 of the body, `id` the encoded SHA-256 of
/// `hash ‖ filename ‖ mimeType ‖ owner`. Identical bytes therefore share
/// one hash across owners while every (content, owner, filename, mime)
/// tuple gets its own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMeta {
    pub filename: String,
    pub id: MediaId,
    pub hash: String,
    pub size: u64,
    pub owner: String,
    pub mime_type: String,
}

impl MediaMeta {
    /// Metadata with derivations pending; `Media::new` fills them in.
    pub fn draft(filename: impl Into<String>, owner: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            id: MediaId::from(""),
            hash: String::new(),
            size: 0,
            owner: owner.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Recalculate hash, size and id from the given content.
    fn update(&mut self, data: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(data);
        self.hash = encoding::encode(&hasher.finalize());
        self.size = data.len() as u64;

        let mut hasher = Sha256::new();
        hasher.update(self.hash.as_bytes());
        hasher.update(self.filename.as_bytes());
        hasher.update(self.mime_type.as_bytes());
        hasher.update(self.owner.as_bytes());
        self.id = MediaId::from(encoding::encode(&hasher.finalize()));
    }

    /// Decode metadata from a JSON meta blob.
    pub fn from_blob(blob: &Blob) -> VaultResult<Self> {
        serde_json::from_slice(&blob.body)
            .map_err(|e| VaultError::Internal(format!("decode meta blob: {e}")))
    }

    /// Encode the metadata as a JSON blob addressed by the media id.
    pub fn to_blob(&self) -> VaultResult<Blob> {
        let body = serde_json::to_vec(self)
            .map_err(|e| VaultError::Internal(format!("encode meta blob: {e}")))?;

        Ok(Blob::new(self.id.clone(), body))
    }
}

/// A media file: content bytes plus metadata.
///
/// Construction always re-derives hash, size and id from the current data,
/// so a Media can never carry stale derivations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    data: Vec<u8>,
    meta: MediaMeta,
}

impl Media {
    pub fn new(data: Vec<u8>, mut meta: MediaMeta) -> Self {
        meta.update(&data);
        Self { data, meta }
    }

    pub fn id(&self) -> &MediaId {
        &self.meta.id
    }

    pub fn hash(&self) -> &str {
        &self.meta.hash
    }

    pub fn meta(&self) -> &MediaMeta {
        &self.meta
    }

    pub fn mime_type(&self) -> &str {
        &self.meta.mime_type
    }

    pub fn owner(&self) -> &str {
        &self.meta.owner
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The content blob: body addressed by content hash.
    pub fn as_data_blob(&self) -> Blob {
        Blob::new(BlobId::from(self.meta.hash.clone()), self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_media(owner: &str) -> Media {
        Media::new(
            b"hello".to_vec(),
            MediaMeta::draft("hello.txt", owner, "text/plain"),
        )
    }

    #[test]
    fn test_derivations_are_deterministic() {
        let a = sample_media("alice");
        let b = sample_media("alice");

        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.id(), b.id());
        assert_eq!(a.meta().size, 5);
        assert!(!a.hash().is_empty());
    }

    #[test]
    fn test_same_bytes_different_owner_share_hash_not_id() {
        let alice = sample_media("alice");
        let bob = sample_media("bob");

        assert_eq!(alice.hash(), bob.hash());
        assert_ne!(alice.id(), bob.id());
    }

    #[test]
    fn test_id_depends_on_filename_and_mime() {
        let base = sample_media("alice");

        let renamed = Media::new(
            b"hello".to_vec(),
            MediaMeta::draft("other.txt", "alice", "text/plain"),
        );
        let retyped = Media::new(
            b"hello".to_vec(),
            MediaMeta::draft("hello.txt", "alice", "image/png"),
        );

        assert_eq!(base.hash(), renamed.hash());
        assert_ne!(base.id(), renamed.id());
        assert_ne!(base.id(), retyped.id());
    }

    #[test]
    fn test_hash_is_lowercase_base32() {
        let media = sample_media("alice");
        assert_eq!(encoding::normalize(media.hash()), media.hash());
    }

    #[test]
    fn test_meta_blob_roundtrip() {
        let media = sample_media("alice");
        let blob = media.meta().to_blob().unwrap();

        assert_eq!(&blob.id, media.id());

        let json = String::from_utf8(blob.body.clone()).unwrap();
        assert!(json.contains("\"mimeType\""));
        assert!(json.contains("\"filename\""));

        let decoded = MediaMeta::from_blob(&blob).unwrap();
        assert_eq!(&decoded, media.meta());
    }
}
