//! Asset import collaborator: downloads a remote image and stores it as a
//! durable asset owned by a content item.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use crate::entities::ItemId;
use crate::fetcher::{FetchError, HttpClient};
use crate::repositories::write_replacing;

static IMAGE_FILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[^/]+\.(jpe?g|jpe|gif|png)$").unwrap());

/// A stored asset: opaque id plus the public URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedAsset {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("not an importable image file: {0}")]
    UnsupportedFile(String),

    #[error("remote served {0} instead of an image")]
    NotAnImage(String),

    #[error("download failed: {0}")]
    Download(#[from] FetchError),

    #[error("storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

#[async_trait]
pub trait AssetImporter: Send + Sync {
    async fn import(&self, url: &Url, owner: &ItemId) -> Result<ImportedAsset, ImportError>;
}

/// Importer that writes content-addressed files below a media directory.
pub struct FsAssetImporter {
    client: Arc<dyn HttpClient>,
    media_dir: PathBuf,
    public_base: String,
}

impl FsAssetImporter {
    pub fn new(
        client: Arc<dyn HttpClient>,
        media_dir: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            media_dir: media_dir.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Lowercased image extension from the URL's last path segment, if it names
/// a jpg, jpeg, jpe, gif or png file. Query strings are ignored.
pub fn image_extension(url: &Url) -> Option<String> {
    let file_name = url.path_segments()?.next_back()?;
    let captures = IMAGE_FILE_REGEX.captures(file_name)?;
    Some(captures.get(1)?.as_str().to_lowercase())
}

#[async_trait]
impl AssetImporter for FsAssetImporter {
    #[instrument(skip_all, fields(url = %url, owner = %owner))]
    async fn import(&self, url: &Url, owner: &ItemId) -> Result<ImportedAsset, ImportError> {
        let extension =
            image_extension(url).ok_or_else(|| ImportError::UnsupportedFile(url.to_string()))?;

        let response = self.client.get(url).await?;
        let content_type = response.content_type.clone().unwrap_or_default();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(ImportError::NotAnImage(content_type));
        }

        let digest = format!("{:x}", md5::compute(response.body_raw.as_ref()));
        let dir_name = sanitize_segment(owner.as_str());
        let dir = self.media_dir.join(&dir_name);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{digest}.{extension}");
        let final_path = dir.join(&file_name);
        if tokio::fs::try_exists(&final_path).await? {
            info!("asset already stored");
        } else {
            // Write then rename; the final path never holds a partial file.
            write_replacing(&dir, &final_path, &response.body_raw).await?;
            info!(bytes = response.body_raw.len(), "asset stored");
        }

        Ok(ImportedAsset {
            id: digest,
            url: format!("{}/{}/{}", self.public_base, dir_name, file_name),
        })
    }
}

fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
