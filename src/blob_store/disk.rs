/// Filesystem blob storage backend
use crate::{
    blob_store::{Blob, BlobId, BlobRepository, RepoLock},
    error::{VaultError, VaultResult},
};
use async_trait::async_trait;
use fs4::FileExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const DIR_PREFIX_LENGTH: usize = 2;
const DIR_PREFIX_DEPTH: usize = 3;
const ID_MIN_LENGTH: usize = DIR_PREFIX_LENGTH * DIR_PREFIX_DEPTH;

/// Filesystem blob repository
///
/// Each blob lives at `basedir/subdir/p0/p1/p2/<id>.<ext>` where the
/// prefixes are the first three 2-char slices of the id, left-padded with
/// zeros to at least 6 chars. The sharding keeps any single directory
/// below a few thousand entries. Advisory locks use an OS file lock on a
/// sidecar `<blobpath>.lock`.
#[derive(Debug, Clone)]
pub struct DiskBlobRepository {
    basedir: PathBuf,
    subdir: String,
    ext: String,
}

impl DiskBlobRepository {
    /// Create a repository rooted at `basedir/subdir`, creating the
    /// directory if needed.
    pub fn new(basedir: PathBuf, subdir: &str, ext: &str) -> VaultResult<Self> {
        let repo = Self {
            basedir,
            subdir: subdir.to_string(),
            ext: ext.to_string(),
        };

        std::fs::create_dir_all(repo.basedir.join(&repo.subdir))?;
        tracing::debug!(
            basedir = %repo.basedir.display(),
            subdir = %repo.subdir,
            ext = %repo.ext,
            "blob repository initialized"
        );

        Ok(repo)
    }

    /// Sharded filename for an id, without extension.
    ///
    /// Slashes are stripped and the id is left-padded with zeros so the
    /// three prefix slices always exist.
    fn shard_name(&self, id: &BlobId) -> String {
        let name = id.as_str().replace('/', "");
        let width = ID_MIN_LENGTH;
        format!("{name:0>width$}")
    }

    /// Full path for a blob, without the extension.
    fn basename_path(&self, id: &BlobId) -> PathBuf {
        let name = self.shard_name(id);
        let mut path = self.basedir.join(&self.subdir);

        for i in 0..DIR_PREFIX_DEPTH {
            let start = i * DIR_PREFIX_LENGTH;
            path.push(&name[start..start + DIR_PREFIX_LENGTH]);
        }

        path.join(name)
    }

    /// Full filesystem path for a blob with the given id.
    pub fn blob_path(&self, id: &BlobId) -> PathBuf {
        let mut path = self.basename_path(id).into_os_string();
        path.push(".");
        path.push(&self.ext);
        PathBuf::from(path)
    }

    fn lock_path(&self, id: &BlobId) -> PathBuf {
        let mut path = self.blob_path(id).into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }
}

#[async_trait]
impl BlobRepository for DiskBlobRepository {
    async fn lock(&self, id: &BlobId, exclusive: bool) -> VaultResult<RepoLock> {
        let lock_path = self.lock_path(id);

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // flock blocks until granted; keep it off the async executor
        let guard = tokio::task::spawn_blocking(move || -> std::io::Result<RepoLock> {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&lock_path)?;

            if exclusive {
                file.lock_exclusive()?;
            } else {
                file.lock_shared()?;
            }

            Ok(RepoLock::from_file(file, lock_path))
        })
        .await
        .map_err(|e| VaultError::Internal(format!("lock task failed: {e}")))??;

        tracing::debug!(id = %id, exclusive, "blob locked");

        Ok(guard)
    }

    async fn exists(&self, id: &BlobId) -> bool {
        fs::metadata(self.blob_path(id)).await.is_ok()
    }

    async fn store(&self, blob: &Blob) -> VaultResult<()> {
        let path = self.blob_path(&blob.id);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .await?;

        file.set_len(blob.size()).await?;
        file.write_all(&blob.body).await?;
        file.sync_all().await?;

        let written = file.metadata().await?.len();
        if written != blob.size() {
            return Err(VaultError::SizeMismatch {
                op: "store",
                expected: blob.size(),
                actual: written,
            });
        }

        tracing::debug!(id = %blob.id, size = blob.size(), "blob stored");

        Ok(())
    }

    async fn fetch(&self, id: &BlobId) -> VaultResult<Blob> {
        let path = self.blob_path(id);

        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| VaultError::from_io(e, format!("blob {id}")))?;

        let mut body = Vec::new();
        let read = file.read_to_end(&mut body).await? as u64;

        let size = file.metadata().await?.len();
        if read != size {
            return Err(VaultError::SizeMismatch {
                op: "fetch",
                expected: size,
                actual: read,
            });
        }

        tracing::debug!(id = %id, size = read, "blob fetched");

        Ok(Blob::new(id.clone(), body))
    }

    async fn delete(&self, id: &BlobId) -> VaultResult<()> {
        let path = self.blob_path(id);

        fs::remove_file(&path)
            .await
            .map_err(|e| VaultError::from_io(e, format!("blob {id}")))?;

        tracing::debug!(id = %id, "blob deleted");

        Ok(())
    }

    async fn delete_all(&self, id: &BlobId, pattern: &str) -> VaultResult<()> {
        let basename = self.basename_path(id);
        let full_pattern = format!("{}{}.{}", basename.to_string_lossy(), pattern, self.ext);
        let dir = basename
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.basedir.clone());

        let matches = tokio::task::spawn_blocking(move || collect_matches(&dir, &full_pattern))
            .await
            .map_err(|e| VaultError::Internal(format!("walk task failed: {e}")))??;

        for path in &matches {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(id = %id, pattern, count = matches.len(), "blob pattern deleted");

        Ok(())
    }
}

/// Walk `dir` recursively and collect files whose full path matches the
/// pattern.
fn collect_matches(dir: &Path, pattern: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if glob_match(pattern, &path.to_string_lossy()) {
                found.push(path);
            }
        }
    }

    Ok(found)
}

/// Match `text` against `pattern` where `*` is the only wildcard and does
/// not cross path separators.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] != b'*' && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == b'*' {
            star = Some((pi + 1, ti));
            pi += 1;
        } else if let Some((after_star, matched)) = star {
            if t[matched] == b'/' {
                return false;
            }
            pi = after_star;
            ti = matched + 1;
            star = Some((after_star, matched + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }

    pi == p.len()
}
