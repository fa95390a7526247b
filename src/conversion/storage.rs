//! Storage-upload collaborator and the local media directory backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::error::ConversionError;

/// What the storage backend hands back for a published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalDescriptor {
    pub url: String,
    pub file_name: String,
}

#[async_trait]
pub trait StorageUploader: Send + Sync {
    /// Publish `artifact` under `public_name`.
    async fn upload(
        &self,
        artifact: &Path,
        public_name: &str,
    ) -> Result<RetrievalDescriptor, ConversionError>;
}

/// Publishes artifacts by copying them into a directory served at `/media`.
pub struct LocalMediaStorage {
    media_dir: PathBuf,
    public_base_url: String,
}

impl LocalMediaStorage {
    pub fn new(media_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            media_dir: media_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    fn url_for(&self, public_name: &str) -> String {
        format!(
            "{}/media/{}",
            self.public_base_url,
            urlencoding::encode(public_name)
        )
    }
}

fn is_safe_public_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}

#[async_trait]
impl StorageUploader for LocalMediaStorage {
    async fn upload(
        &self,
        artifact: &Path,
        public_name: &str,
    ) -> Result<RetrievalDescriptor, ConversionError> {
        if !is_safe_public_name(public_name) {
            return Err(ConversionError::UploadFailed(format!(
                "invalid public name '{}'",
                public_name
            )));
        }

        tokio::fs::create_dir_all(&self.media_dir)
            .await
            .map_err(|e| {
                ConversionError::UploadFailed(format!("media directory unavailable ({})", e.kind()))
            })?;

        let target = self.media_dir.join(public_name);
        let bytes = tokio::fs::copy(artifact, &target).await.map_err(|e| {
            ConversionError::UploadFailed(format!("could not store artifact ({})", e.kind()))
        })?;
        info!("Published {} ({} bytes)", public_name, bytes);

        Ok(RetrievalDescriptor {
            url: self.url_for(public_name),
            file_name: public_name.to_string(),
        })
    }
}
