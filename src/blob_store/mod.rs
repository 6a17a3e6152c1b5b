/// Blob Storage System
///
/// Content-addressed blob slots with advisory locking and pattern delete.
/// Supports multiple backend implementations (disk, in-memory).

pub mod disk;
pub mod memory;
pub mod models;

pub use models::{Blob, BlobId};

use crate::error::VaultResult;
use async_trait::async_trait;
use fs4::FileExt;
use std::path::PathBuf;
use std::sync::Arc;

/// Blob repository contract
///
/// Implementations persist immutable blob bodies under opaque string ids
/// and provide per-slot advisory locks so concurrent tasks (and cooperating
/// OS processes) can coordinate read-then-act sequences.
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Acquire an advisory lock on the blob slot.
    ///
    /// Shared locks may coexist; an exclusive lock excludes all other locks
    /// on the same id. The returned guard releases on drop; `release` is
    /// idempotent.
    async fn lock(&self, id: &BlobId, exclusive: bool) -> VaultResult<RepoLock>;

    /// Check whether a blob exists under the given id.
    async fn exists(&self, id: &BlobId) -> bool;

    /// Persist the blob, overwriting any prior body under the same id.
    ///
    /// Fails with a bytes-written mismatch when the flushed byte count
    /// disagrees with the declared size.
    async fn store(&self, blob: &Blob) -> VaultResult<()>;

    /// Retrieve a blob by id; NotFound if absent.
    async fn fetch(&self, id: &BlobId) -> VaultResult<Blob>;

    /// Remove the blob; NotFound if absent.
    async fn delete(&self, id: &BlobId) -> VaultResult<()>;

    /// Remove every blob whose stored name matches
    /// `basename(id) + pattern + "." + ext`, where `*` is the only
    /// wildcard. Missing matches are not an error.
    async fn delete_all(&self, id: &BlobId, pattern: &str) -> VaultResult<()>;
}

/// Advisory lock guard for a blob slot.
///
/// Backed by an OS file lock on a sidecar `.lock` file. Dropping the guard
/// releases the lock; `release` may be called explicitly and is idempotent.
pub struct RepoLock {
    inner: Option<FileLock>,
}

struct FileLock {
    file: std::fs::File,
    path: PathBuf,
}

impl RepoLock {
    pub(crate) fn from_file(file: std::fs::File, path: PathBuf) -> Self {
        Self {
            inner: Some(FileLock { file, path }),
        }
    }

    /// A guard that holds nothing; used by backends with their own
    /// internal synchronization.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Release the lock and remove the sidecar file. Idempotent.
    pub fn release(&mut self) {
        if let Some(lock) = self.inner.take() {
            let _ = std::fs::remove_file(&lock.path);
            let _ = lock.file.unlock();
        }
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Configuration for blob storage
#[derive(Debug, Clone)]
pub enum BlobStoreConfig {
    /// Store blobs on the local filesystem under `basedir`
    Disk { basedir: PathBuf },

    /// Keep blobs in process memory (tests, embedding)
    Memory,
}

/// Open a repository instance for one `(subdir, ext)` namespace.
pub fn open_repository(
    cfg: &BlobStoreConfig,
    subdir: &str,
    ext: &str,
) -> VaultResult<Arc<dyn BlobRepository>> {
    match cfg {
        BlobStoreConfig::Disk { basedir } => Ok(Arc::new(disk::DiskBlobRepository::new(
            basedir.clone(),
            subdir,
            ext,
        )?)),
        BlobStoreConfig::Memory => Ok(Arc::new(memory::MemoryBlobRepository::new(ext))),
    }
}
