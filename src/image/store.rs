/// Image store: upload constraints and the derivative cache
use crate::{
    blob_store::{open_repository, Blob, BlobId, BlobRepository, BlobStoreConfig, RepoLock},
    error::{VaultError, VaultResult},
    image::{
        filetypes::{magic_matches, mime_for_filename},
        resize::{resize_image, Interpolator},
    },
    media::{DeleteOutcome, Media, MediaId, MediaStore},
};
use std::sync::Arc;

/// Configuration parameters for the image store.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Scaling kernel for derivative rendering.
    pub interpolator: Interpolator,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            interpolator: Interpolator::CatmullRom,
        }
    }
}

/// Image store over a media store and a derivative-cache repository.
///
/// Derivatives are cached under `hash + "_" + width` in their own
/// repository namespace and wiped with a wildcard pattern delete when the
/// underlying content is pruned.
#[derive(Clone)]
pub struct ImageStore {
    cache: Arc<dyn BlobRepository>,
    media: MediaStore,
    cfg: ImageConfig,
}

impl ImageStore {
    /// Open an image store over the given blob storage and media store.
    pub fn open(
        store_cfg: &BlobStoreConfig,
        media: MediaStore,
        cfg: ImageConfig,
    ) -> VaultResult<Self> {
        Ok(Self {
            cache: open_repository(store_cfg, "cache", "bin")?,
            media,
            cfg,
        })
    }

    /// Assemble a store from an explicit cache repository.
    pub fn with_cache(
        cache: Arc<dyn BlobRepository>,
        media: MediaStore,
        cfg: ImageConfig,
    ) -> Self {
        Self { cache, media, cfg }
    }

    /// Configured upload ceiling in bytes.
    pub fn max_size(&self) -> u64 {
        self.media.max_size()
    }

    /// Shared lock on the image's meta slot.
    pub async fn lock(&self, image_id: &MediaId) -> VaultResult<RepoLock> {
        self.media.lock(image_id).await
    }

    /// Check upload constraints for a file.
    ///
    /// Rejects bodies over the ceiling and filenames outside the supported
    /// extension table. When a body is given, its magic bytes must agree
    /// with the extension's MIME type. Returns the resolved MIME type.
    pub fn check_upload_constraints(
        &self,
        filename: &str,
        size: u64,
        body: Option<&[u8]>,
    ) -> VaultResult<&'static str> {
        if size > self.max_size() {
            return Err(VaultError::MediaTooLarge {
                size,
                max: self.max_size(),
            });
        }

        let mime = mime_for_filename(filename)?;

        if let Some(body) = body {
            if !magic_matches(mime, body) {
                return Err(VaultError::TypeMismatch(format!(
                    "{filename:?} does not contain {mime}"
                )));
            }
        }

        Ok(mime)
    }

    /// Validate and store an image.
    pub async fn store(&self, image: &Media) -> VaultResult<()> {
        self.check_upload_constraints(
            &image.meta().filename,
            image.size(),
            Some(image.bytes()),
        )?;

        self.media.store(image).await
    }

    /// Delete an image; when its content is pruned, wipe every cached
    /// derivative of that content.
    pub async fn delete(&self, caller: &str, image_id: &MediaId) -> VaultResult<()> {
        let DeleteOutcome { pruned, data_id } = self.media.delete(caller, image_id).await?;

        if pruned {
            let _cache_lock = self.cache.lock(&data_id, true).await?;
            self.cache.delete_all(&data_id, "_*").await?;

            tracing::debug!(id = %image_id, data_id = %data_id, "derivative cache wiped");
        }

        Ok(())
    }

    /// Fetch an image, resized to `width` when non-zero.
    ///
    /// Misses resize synchronously and populate the cache; concurrent
    /// misses may both resize, but they write identical bytes to the same
    /// slot.
    pub async fn fetch(
        &self,
        caller: &str,
        image_id: &MediaId,
        width: u32,
    ) -> VaultResult<Media> {
        let image = self.media.fetch(caller, image_id).await?;

        if width == 0 {
            return Ok(image);
        }

        let cache_id = BlobId::from(format!("{}_{}", image.hash(), width));
        let _cache_lock = self.cache.lock(&cache_id, false).await?;

        if self.cache.exists(&cache_id).await {
            let cached = self.cache.fetch(&cache_id).await?;

            tracing::debug!(id = %image_id, cache_id = %cache_id, "derivative served from cache");

            return Ok(Media::new(cached.body, image.meta().clone()));
        }

        let resized = resize_image(
            image.bytes(),
            image.mime_type(),
            width,
            self.cfg.interpolator,
        )?;

        self.cache
            .store(&Blob::new(cache_id.clone(), resized.clone()))
            .await?;

        tracing::debug!(id = %image_id, cache_id = %cache_id, "derivative rendered");

        Ok(Media::new(resized, image.meta().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blob_store::memory::MemoryBlobRepository,
        image::filetypes::{MIME_JPEG, MIME_PNG},
        media::{MediaConfig, MediaMeta},
    };
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::new(width, height);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn test_store(max_size: u64) -> (ImageStore, Arc<MemoryBlobRepository>) {
        let media = MediaStore::with_repositories(
            Arc::new(MemoryBlobRepository::new("bin")),
            Arc::new(MemoryBlobRepository::new("json")),
            Arc::new(MemoryBlobRepository::new("txt")),
            MediaConfig { max_size },
        );

        let cache = Arc::new(MemoryBlobRepository::new("bin"));
        let store = ImageStore::with_cache(cache.clone(), media, ImageConfig::default());

        (store, cache)
    }

    fn png_media(owner: &str, width: u32, height: u32) -> Media {
        Media::new(
            png_bytes(width, height),
            MediaMeta::draft("photo.png", owner, MIME_PNG),
        )
    }

    #[tokio::test]
    async fn test_store_and_fetch_original() {
        let (store, _) = test_store(1 << 20);
        let image = png_media("alice", 8, 6);

        store.store(&image).await.unwrap();

        let fetched = store.fetch("alice", image.id(), 0).await.unwrap();
        assert_eq!(fetched.bytes(), image.bytes());
    }

    #[tokio::test]
    async fn test_constraints_reject_oversize() {
        let (store, _) = test_store(10);

        let err = store
            .check_upload_constraints("photo.png", 11, None)
            .unwrap_err();
        assert!(matches!(err, VaultError::MediaTooLarge { .. }));

        store.check_upload_constraints("photo.png", 10, None).unwrap();
    }

    #[tokio::test]
    async fn test_constraints_reject_unknown_extension() {
        let (store, _) = test_store(1 << 20);

        let err = store
            .check_upload_constraints("notes.txt", 1, None)
            .unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_constraints_reject_magic_mismatch() {
        let (store, _) = test_store(1 << 20);

        // JPEG magic under a .png name
        let err = store
            .check_upload_constraints("doc.png", 4, Some(&[0xFF, 0xD8, 0xFF, 0xE0]))
            .unwrap_err();
        assert!(matches!(err, VaultError::TypeMismatch(_)));

        assert_eq!(
            store
                .check_upload_constraints("doc.jpg", 4, Some(&[0xFF, 0xD8, 0xFF, 0xE0]))
                .unwrap(),
            MIME_JPEG
        );
    }

    #[tokio::test]
    async fn test_store_rejects_mismatched_body() {
        let (store, _) = test_store(1 << 20);

        let image = Media::new(
            png_bytes(4, 4),
            MediaMeta::draft("photo.jpg", "alice", MIME_JPEG),
        );

        let err = store.store(&image).await.unwrap_err();
        assert!(matches!(err, VaultError::TypeMismatch(_)));

        // Nothing written, so nothing to fetch
        let err = store.fetch("alice", image.id(), 0).await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_resized_populates_cache() {
        let (store, cache) = test_store(1 << 20);
        let image = png_media("alice", 8, 6);

        store.store(&image).await.unwrap();

        let cache_id = BlobId::from(format!("{}_4", image.hash()));
        assert!(!cache.exists(&cache_id).await);

        let first = store.fetch("alice", image.id(), 4).await.unwrap();
        assert!(cache.exists(&cache_id).await);

        let decoded =
            image::load_from_memory_with_format(first.bytes(), ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);

        // Second fetch observes the cache and returns identical bytes
        let second = store.fetch("alice", image.id(), 4).await.unwrap();
        assert_eq!(first.bytes(), second.bytes());
    }

    #[tokio::test]
    async fn test_resized_media_carries_original_identity_fields() {
        let (store, _) = test_store(1 << 20);
        let image = png_media("alice", 8, 6);

        store.store(&image).await.unwrap();

        let resized = store.fetch("alice", image.id(), 4).await.unwrap();
        assert_eq!(resized.meta().filename, "photo.png");
        assert_eq!(resized.mime_type(), MIME_PNG);
        assert_eq!(resized.owner(), "alice");
        assert_eq!(resized.size(), resized.bytes().len() as u64);
    }

    #[tokio::test]
    async fn test_delete_wipes_derivatives_on_prune() {
        let (store, cache) = test_store(1 << 20);
        let image = png_media("alice", 8, 6);

        store.store(&image).await.unwrap();
        store.fetch("alice", image.id(), 4).await.unwrap();

        let cache_id = BlobId::from(format!("{}_4", image.hash()));
        assert!(cache.exists(&cache_id).await);

        store.delete("alice", image.id()).await.unwrap();
        assert!(!cache.exists(&cache_id).await);
    }

    #[tokio::test]
    async fn test_delete_keeps_derivatives_while_shared() {
        let (store, cache) = test_store(1 << 20);
        let alice = png_media("alice", 8, 6);
        let bob = png_media("bob", 8, 6);

        store.store(&alice).await.unwrap();
        store.store(&bob).await.unwrap();
        store.fetch("alice", alice.id(), 4).await.unwrap();

        let cache_id = BlobId::from(format!("{}_4", alice.hash()));

        // Bob's delete does not prune the shared content
        store.delete("bob", bob.id()).await.unwrap();
        assert!(cache.exists(&cache_id).await);

        store.delete("alice", alice.id()).await.unwrap();
        assert!(!cache.exists(&cache_id).await);
    }

    #[tokio::test]
    async fn test_fetch_requires_ownership() {
        let (store, _) = test_store(1 << 20);
        let image = png_media("alice", 8, 6);

        store.store(&image).await.unwrap();

        let err = store.fetch("mallory", image.id(), 0).await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
    }
}
