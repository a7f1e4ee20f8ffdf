use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{AssetRef, ObjectStorage};

/// A locally staged upload awaiting transfer to the storage provider.
///
/// The backing file is removed exactly once: `discard` consumes the value,
/// and the drop impl only fires for paths that were never discarded (early
/// returns, panics). Deletion is never attempted twice on the same path.
pub struct StagedFile {
    path: Option<PathBuf>,
    content_type: String,
}

impl StagedFile {
    pub fn new(path: PathBuf, content_type: String) -> Self {
        Self {
            path: Some(path),
            content_type,
        }
    }

    pub fn path(&self) -> &Path {
        // Present until discard; discard consumes self.
        self.path.as_deref().expect("staged file already discarded")
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Removes the staged file. Removal failure is logged, not propagated:
    /// the request outcome was already decided by the upload.
    pub async fn discard(mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::error!("❌ Failed to remove staged file {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            tracing::warn!("🧹 Staged file dropped without discard: {}", path.display());
            let _ = std::fs::remove_file(path);
        }
    }
}

/// The result of a successful `replace`: the committed-to-be reference and
/// the superseded one the caller must reclaim after persisting.
pub struct AssetSwap {
    pub new_ref: AssetRef,
    pub old_ref: Option<AssetRef>,
}

/// Streams a multipart file field into the staging directory.
///
/// The staged name is a fresh UUID plus the sniffed extension, so it can
/// double as the provider-side object key. Content type preference:
/// sniffed magic bytes, then the client-declared type.
pub async fn stage_field(temp_dir: &Path, mut field: Field<'_>) -> Result<StagedFile> {
    tokio::fs::create_dir_all(temp_dir).await?;

    let declared_type = field.content_type().map(|ct| ct.to_string());

    let first_chunk = field
        .chunk()
        .await
        .map_err(|e| AppError::Multipart(format!("Failed to read upload: {}", e)))?
        .ok_or_else(|| AppError::Multipart("Empty file field".to_string()))?;

    let sniffed = infer::get(&first_chunk);
    let content_type = sniffed
        .map(|kind| kind.mime_type().to_string())
        .or(declared_type)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let extension = sniffed.map(|kind| kind.extension()).unwrap_or("bin");
    let path = temp_dir.join(format!("{}.{}", Uuid::new_v4(), extension));

    // Partial writes are cleaned up before the error propagates; the
    // StagedFile guard only exists once staging succeeded.
    let staged = async {
        let file = tokio::fs::File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&first_chunk).await?;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Multipart(format!("Failed to read upload: {}", e)))?
        {
            writer.write_all(&chunk).await?;
        }

        writer.flush().await?;
        Ok::<(), AppError>(())
    }
    .await;

    if let Err(e) = staged {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e);
    }

    tracing::debug!("📥 Staged upload: {} ({})", path.display(), content_type);
    Ok(StagedFile::new(path, content_type))
}

/// Uploads a staged file, yielding the replacement reference.
///
/// Ordering contract: upload happens before any database write, so a
/// failure here leaves the owning record untouched. The staged file is
/// removed on both exit paths. The superseded reference is returned for
/// the caller to `reclaim` only after the new one is durably persisted.
pub async fn replace<S: ObjectStorage + ?Sized>(
    storage: &S,
    old: Option<AssetRef>,
    staged: StagedFile,
) -> Result<AssetSwap> {
    let uploaded = storage.upload(staged.path(), staged.content_type()).await;
    staged.discard().await;

    let new_ref = uploaded?;
    Ok(AssetSwap { new_ref, old_ref: old })
}

/// Best-effort deletion of a superseded asset.
///
/// Runs only after the replacement reference is persisted. Failure leaves
/// an orphan at the provider; that is logged for operator cleanup and
/// never rolls back the committed update.
pub async fn reclaim<S: ObjectStorage + ?Sized>(storage: &S, old: &AssetRef) {
    match storage.delete(old).await {
        Ok(()) => {
            tracing::debug!("♻️ Reclaimed superseded asset: {}", old.url());
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Reclaim failed, asset orphaned at provider: {} - {}",
                old.url(),
                e
            );
        }
    }
}

/// Removes staged files older than `max_age`.
///
/// Crash recovery: anything still in the staging directory after this long
/// was orphaned by a process that died mid-request.
pub async fn sweep_stale(temp_dir: &Path, max_age: std::time::Duration) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(temp_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let age = metadata.modified().ok().and_then(|m| m.elapsed().ok());
        if matches!(age, Some(age) if age >= max_age) {
            if tokio::fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }
    }

    if removed > 0 {
        tracing::info!("🧹 Swept {} stale staged files", removed);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockStorage {
        fail_upload: bool,
        fail_delete: bool,
        uploads: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                fail_upload: false,
                fail_delete: false,
                uploads: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
            }
        }

        fn failing_upload() -> Self {
            Self {
                fail_upload: true,
                ..Self::new()
            }
        }

        fn failing_delete() -> Self {
            Self {
                fail_delete: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ObjectStorage for MockStorage {
        async fn upload(&self, local_path: &Path, _content_type: &str) -> Result<AssetRef> {
            if self.fail_upload {
                return Err(AppError::Upload("provider unavailable".to_string()));
            }
            let key = local_path.file_name().unwrap().to_str().unwrap().to_string();
            self.uploads.lock().unwrap().push(key.clone());
            Ok(AssetRef(format!("mock://assets/{}", key)))
        }

        async fn delete(&self, asset: &AssetRef) -> Result<()> {
            if self.fail_delete {
                return Err(AppError::Upload("provider unavailable".to_string()));
            }
            self.deletes.lock().unwrap().push(asset.url().to_string());
            Ok(())
        }
    }

    async fn write_staged() -> StagedFile {
        let path = std::env::temp_dir().join(format!("vidstream-test-{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, b"fake image bytes").await.unwrap();
        StagedFile::new(path, "image/png".to_string())
    }

    #[tokio::test]
    async fn failed_upload_cleans_the_staged_file_and_reports_upload_error() {
        let storage = MockStorage::failing_upload();
        let staged = write_staged().await;
        let path = staged.path().to_path_buf();

        let result = replace(&storage, None, staged).await;

        assert!(matches!(result, Err(AppError::Upload(_))));
        assert!(!path.exists(), "staged file must be removed on failure");
    }

    #[tokio::test]
    async fn successful_replace_returns_a_fresh_reference_and_cleans_up() {
        let storage = MockStorage::new();
        let staged = write_staged().await;
        let path = staged.path().to_path_buf();
        let old = AssetRef("mock://assets/previous.png".to_string());

        let swap = replace(&storage, Some(old.clone()), staged).await.unwrap();

        assert_ne!(swap.new_ref, old);
        assert_eq!(swap.old_ref, Some(old));
        assert!(!path.exists(), "staged file must be removed on success");
    }

    #[tokio::test]
    async fn replace_never_deletes_the_superseded_asset_itself() {
        // Reclaim is the caller's move, strictly after persisting the new
        // reference.
        let storage = MockStorage::new();
        let staged = write_staged().await;
        let old = AssetRef("mock://assets/previous.png".to_string());

        let swap = replace(&storage, Some(old.clone()), staged).await.unwrap();
        assert!(storage.deletes.lock().unwrap().is_empty());

        reclaim(&storage, &swap.old_ref.unwrap()).await;
        assert_eq!(
            storage.deletes.lock().unwrap().as_slice(),
            &[old.url().to_string()]
        );
    }

    #[tokio::test]
    async fn reclaim_failure_is_swallowed() {
        let storage = MockStorage::failing_delete();
        let old = AssetRef("mock://assets/previous.png".to_string());

        // Must not panic or propagate: the new reference is already
        // committed by the time reclaim runs.
        reclaim(&storage, &old).await;
    }

    #[tokio::test]
    async fn sweep_removes_old_files_and_keeps_fresh_ones() {
        let dir = std::env::temp_dir().join(format!("vidstream-sweep-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let old = dir.join("orphan.bin");
        tokio::fs::write(&old, b"stale").await.unwrap();

        let removed = sweep_stale(&dir, std::time::Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());

        let fresh = dir.join("fresh.bin");
        tokio::fs::write(&fresh, b"fresh").await.unwrap();
        let removed = sweep_stale(&dir, std::time::Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(fresh.exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_of_a_missing_directory_is_a_noop() {
        let dir = std::env::temp_dir().join(format!("vidstream-missing-{}", Uuid::new_v4()));
        let removed = sweep_stale(&dir, std::time::Duration::ZERO).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn dropped_staged_file_is_removed_by_the_backstop() {
        let staged = write_staged().await;
        let path = staged.path().to_path_buf();

        drop(staged);

        assert!(!path.exists());
    }
}
