use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, Result};

/// A reference to an asset held by the storage provider.
///
/// Exactly one record field owns a given reference at a time; replacing the
/// field makes the old reference eligible for reclaim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssetRef(pub String);

impl AssetRef {
    pub fn url(&self) -> &str {
        &self.0
    }

    /// The provider-side object key (last path segment of the URL).
    pub fn key(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

/// The storage provider, seen as a black-box upload/delete service.
///
/// Object-safe so `AppState` can hold a `dyn` handle and tests can
/// substitute a recording double.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads a local file, returning the new asset reference.
    async fn upload(&self, local_path: &Path, content_type: &str) -> Result<AssetRef>;

    /// Deletes the referenced asset from the provider.
    async fn delete(&self, asset: &AssetRef) -> Result<()>;
}

/// HTTP object-storage client (PUT/DELETE against a bucket endpoint).
pub struct HttpObjectStorage {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    api_key: String,
}

impl HttpObjectStorage {
    /// Creates a client with the provider timeout applied to every call.
    pub fn new(
        endpoint: String,
        bucket: String,
        api_key: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build storage client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket,
            api_key,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

fn upload_err(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Upload("Storage provider timed out".to_string())
    } else {
        AppError::Upload(format!("Storage provider request failed: {}", e))
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, local_path: &Path, content_type: &str) -> Result<AssetRef> {
        let key = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Upload("Staged file has no usable name".to_string()))?
            .to_string();

        let file = tokio::fs::File::open(local_path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let url = self.object_url(&key);
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.api_key)
            .header(http::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(upload_err)?;

        if !response.status().is_success() {
            return Err(AppError::Upload(format!(
                "Storage provider returned {} for upload",
                response.status()
            )));
        }

        tracing::debug!("⬆️ Uploaded asset: {}", url);
        Ok(AssetRef(url))
    }

    async fn delete(&self, asset: &AssetRef) -> Result<()> {
        let response = self
            .http
            .delete(asset.url())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(upload_err)?;

        // Already gone is fine: reclaim is allowed to run after a crash
        // that lost track of whether the delete happened.
        if !response.status().is_success() && response.status() != http::StatusCode::NOT_FOUND {
            return Err(AppError::Upload(format!(
                "Storage provider returned {} for delete",
                response.status()
            )));
        }

        tracing::debug!("🗑️ Deleted asset: {}", asset.url());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_ref_key_is_last_path_segment() {
        let asset = AssetRef("https://cdn.example.com/vidstream/ab12.png".to_string());
        assert_eq!(asset.key(), "ab12.png");
    }

    #[test]
    fn asset_ref_key_handles_bare_identifier() {
        let asset = AssetRef("ab12.png".to_string());
        assert_eq!(asset.key(), "ab12.png");
    }
}
