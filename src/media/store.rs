/// Media store: deduplication, backreferences, ownership, pruning
use crate::{
    blob_store::{open_repository, Blob, BlobId, BlobRepository, BlobStoreConfig, RepoLock},
    error::{VaultError, VaultResult},
    media::{Media, MediaId, MediaMeta},
};
use std::sync::Arc;

/// Configuration parameters for the media store.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Maximum allowed file size for uploaded media in bytes.
    pub max_size: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_size: 20 * 1024 * 1024, // 20MB
        }
    }
}

/// Outcome of a media delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the content blob was pruned (last reference removed).
    pub pruned: bool,
    /// Content hash of the deleted media.
    pub data_id: BlobId,
}

/// Media store over three blob repositories.
///
/// Content bytes live in the data repository addressed by content hash,
/// metadata in the meta repository addressed by media id, and the
/// newline-framed backreference lists in their own repository, addressed
/// by the same hash as the content they count references for.
///
/// Lock order is meta before data for every operation, so concurrent
/// stores and deletes cannot deadlock across blobs.
#[derive(Clone)]
pub struct MediaStore {
    data: Arc<dyn BlobRepository>,
    meta: Arc<dyn BlobRepository>,
    backrefs: Arc<dyn BlobRepository>,
    cfg: MediaConfig,
}

impl MediaStore {
    /// Open a media store over the given blob storage.
    pub fn open(store_cfg: &BlobStoreConfig, cfg: MediaConfig) -> VaultResult<Self> {
        Ok(Self {
            data: open_repository(store_cfg, "data", "bin")?,
            backrefs: open_repository(store_cfg, "data", "txt")?,
            meta: open_repository(store_cfg, "meta", "json")?,
            cfg,
        })
    }

    /// Assemble a store from explicit repositories.
    pub fn with_repositories(
        data: Arc<dyn BlobRepository>,
        meta: Arc<dyn BlobRepository>,
        backrefs: Arc<dyn BlobRepository>,
        cfg: MediaConfig,
    ) -> Self {
        Self {
            data,
            meta,
            backrefs,
            cfg,
        }
    }

    /// Configured upload ceiling in bytes.
    pub fn max_size(&self) -> u64 {
        self.cfg.max_size
    }

    /// Shared lock on the meta slot, holding a media stable across a
    /// read-then-act sequence.
    pub async fn lock(&self, media_id: &MediaId) -> VaultResult<RepoLock> {
        self.meta.lock(media_id, false).await
    }

    /// Store a media record.
    ///
    /// Content bytes are written only when no blob exists under their hash;
    /// the meta blob is written only when the media id is new, and the
    /// backref list is extended exactly when the meta was created. Retries
    /// of the same media therefore reconverge without double-counting.
    pub async fn store(&self, media: &Media) -> VaultResult<()> {
        if media.size() > self.cfg.max_size {
            return Err(VaultError::MediaTooLarge {
                size: media.size(),
                max: self.cfg.max_size,
            });
        }

        let meta_blob = media.meta().to_blob()?;
        let data_blob = media.as_data_blob();

        let _meta_lock = self.meta.lock(&meta_blob.id, true).await?;
        let _data_lock = self.data.lock(&data_blob.id, true).await?;

        if !self.data.exists(&data_blob.id).await {
            self.data.store(&data_blob).await?;
        }

        if !self.meta.exists(&meta_blob.id).await {
            self.meta.store(&meta_blob).await?;
            self.add_backref(&data_blob.id, &meta_blob.id).await?;
        }

        tracing::debug!(
            id = %media.id(),
            size = media.size(),
            mime = media.mime_type(),
            "media stored"
        );

        Ok(())
    }

    /// Fetch a media record, authorizing the caller as its owner.
    pub async fn fetch(&self, caller: &str, media_id: &MediaId) -> VaultResult<Media> {
        let _meta_lock = self.meta.lock(media_id, false).await?;

        let meta = self.fetch_meta(media_id).await?;
        authorize(caller, &meta)?;

        let data_id = BlobId::from(meta.hash.clone());
        let _data_lock = self.data.lock(&data_id, false).await?;

        let data_blob = self.data.fetch(&data_id).await?;

        tracing::debug!(id = %media_id, owner = %meta.owner, "media fetched");

        Ok(Media::new(data_blob.body, meta))
    }

    /// Delete a media record owned by the caller.
    ///
    /// Removes the caller's reference from the content's backref list and
    /// prunes the content and backref blobs when the list becomes empty.
    /// The meta blob is deleted even when pruning fails (content vanished
    /// out-of-band); the prune error still surfaces.
    pub async fn delete(&self, caller: &str, media_id: &MediaId) -> VaultResult<DeleteOutcome> {
        let _meta_lock = self.meta.lock(media_id, false).await?;

        let meta = self.fetch_meta(media_id).await?;
        authorize(caller, &meta)?;

        let data_id = BlobId::from(meta.hash.clone());
        let _data_lock = self.data.lock(&data_id, true).await?;

        let prune_result = self.prune(&meta).await;

        self.meta.delete(media_id).await?;

        let pruned = prune_result?;

        tracing::debug!(id = %media_id, pruned, "media deleted");

        Ok(DeleteOutcome { pruned, data_id })
    }

    async fn fetch_meta(&self, media_id: &MediaId) -> VaultResult<MediaMeta> {
        let meta_blob = self.meta.fetch(media_id).await?;
        MediaMeta::from_blob(&meta_blob)
    }

    /// Backref list for a content blob; empty when no list exists yet.
    async fn fetch_backrefs(&self, data_id: &BlobId) -> VaultResult<Vec<MediaId>> {
        if !self.backrefs.exists(data_id).await {
            return Ok(Vec::new());
        }

        let blob = self.backrefs.fetch(data_id).await?;
        let text = String::from_utf8(blob.body)
            .map_err(|e| VaultError::Internal(format!("decode backref blob: {e}")))?;

        Ok(text.split('\n').map(MediaId::from).collect())
    }

    async fn store_backrefs(&self, data_id: &BlobId, backrefs: &[MediaId]) -> VaultResult<()> {
        let body = backrefs
            .iter()
            .map(BlobId::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        self.backrefs
            .store(&Blob::new(data_id.clone(), body.into_bytes()))
            .await
    }

    async fn add_backref(&self, data_id: &BlobId, media_id: &MediaId) -> VaultResult<()> {
        let mut backrefs = self.fetch_backrefs(data_id).await?;
        backrefs.push(media_id.clone());
        self.store_backrefs(data_id, &backrefs).await
    }

    /// Drop the media's reference; delete content and backref blobs when
    /// the remaining list is empty.
    async fn prune(&self, meta: &MediaMeta) -> VaultResult<bool> {
        let data_id = BlobId::from(meta.hash.clone());

        let mut backrefs = self.fetch_backrefs(&data_id).await?;
        backrefs.retain(|entry| entry != &meta.id);

        if backrefs.is_empty() {
            self.data.delete(&data_id).await?;
            self.backrefs.delete(&data_id).await?;

            return Ok(true);
        }

        self.store_backrefs(&data_id, &backrefs).await?;

        Ok(false)
    }
}

fn authorize(caller: &str, meta: &MediaMeta) -> VaultResult<()> {
    if caller != meta.owner {
        return Err(VaultError::Unauthorized(format!(
            "user {caller:?} is not owner of media {}",
            meta.id
        )));
    }

    Ok(())
}
