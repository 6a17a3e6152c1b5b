/// In-memory blob storage backend
///
/// Keeps blobs in a process-local map. Advisory locks degrade to no-op
/// guards; the map lock already serializes individual operations, which is
/// all a single-process embedding needs.
use crate::{
    blob_store::{disk::glob_match, Blob, BlobId, BlobRepository, RepoLock},
    error::{VaultError, VaultResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct MemoryBlobRepository {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
    ext: String,
}

impl MemoryBlobRepository {
    pub fn new(ext: &str) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            ext: ext.to_string(),
        }
    }

    fn guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<BlobId, Vec<u8>>> {
        self.blobs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlobRepository for MemoryBlobRepository {
    async fn lock(&self, _id: &BlobId, _exclusive: bool) -> VaultResult<RepoLock> {
        Ok(RepoLock::noop())
    }

    async fn exists(&self, id: &BlobId) -> bool {
        self.guard().contains_key(id)
    }

    async fn store(&self, blob: &Blob) -> VaultResult<()> {
        self.guard().insert(blob.id.clone(), blob.body.clone());
        Ok(())
    }

    async fn fetch(&self, id: &BlobId) -> VaultResult<Blob> {
        self.guard()
            .get(id)
            .map(|body| Blob::new(id.clone(), body.clone()))
            .ok_or_else(|| VaultError::NotFound(format!("blob {id}")))
    }

    async fn delete(&self, id: &BlobId) -> VaultResult<()> {
        self.guard()
            .remove(id)
            .map(drop)
            .ok_or_else(|| VaultError::NotFound(format!("blob {id}")))
    }

    async fn delete_all(&self, id: &BlobId, pattern: &str) -> VaultResult<()> {
        let full_pattern = format!("{}{}.{}", id, pattern, self.ext);
        self.guard()
            .retain(|key, _| !glob_match(&full_pattern, &format!("{}.{}", key, self.ext)));
        Ok(())
    }
}
