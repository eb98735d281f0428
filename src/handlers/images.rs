use async_trait::async_trait;
use futures::{
    future,
    stream::{self, StreamExt},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use url::Url;

use crate::assets::{AssetImporter, ImportedAsset};
use crate::config::SummarySettings;
use crate::entities::HandlerPayload;
use crate::handlers::handler::{FETCH_CONCURRENCY, escape, width_attr};
use crate::handlers::{FetchContext, TypeHandler};

/// Content types served by [`ImageHandler`], with their display titles.
pub const IMAGE_TYPES: [(&str, &str); 3] = [
    ("image/jpeg", "JPEG"),
    ("image/gif", "GIF"),
    ("image/png", "PNG"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedImage {
    pub source_url: String,
    pub asset: ImportedAsset,
}

/// Imports linked images as local assets and renders them as a gallery.
pub struct ImageHandler {
    title: &'static str,
    importer: Arc<dyn AssetImporter>,
}

impl ImageHandler {
    pub fn new(title: &'static str, importer: Arc<dyn AssetImporter>) -> Self {
        Self { title, importer }
    }
}

#[async_trait]
impl TypeHandler for ImageHandler {
    fn title(&self) -> &'static str {
        self.title
    }

    #[instrument(skip_all, fields(handler = self.title, urls = urls.len(), owner = %ctx.owner))]
    async fn fetch(&self, urls: &[Url], ctx: &FetchContext) -> HandlerPayload {
        let images: Vec<ImportedImage> = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                match self.importer.import(&url, &ctx.owner).await {
                    Ok(asset) => Some(ImportedImage {
                        source_url: url.to_string(),
                        asset,
                    }),
                    Err(e) => {
                        warn!(url = %url, error = %e, "image import failed");
                        None
                    }
                }
            })
            .buffered(FETCH_CONCURRENCY)
            .filter_map(future::ready)
            .collect()
            .await;
        serde_json::to_value(images).unwrap_or_default()
    }

    fn render(&self, payload: &HandlerPayload, settings: &SummarySettings) -> String {
        let images: Vec<ImportedImage> = match serde_json::from_value(payload.clone()) {
            Ok(images) => images,
            Err(e) => {
                warn!(handler = self.title, error = %e, "unreadable image payload");
                return String::new();
            }
        };
        if images.is_empty() {
            return String::new();
        }

        let width = width_attr(settings);
        let size_class = settings.image_size.as_str();
        let mut out = String::from(r#"<span class="lsum-images">"#);
        for image in &images {
            out.push_str(&format!(
                r#"<span class="lsum-image"><img src="{}" alt=""{} class="size-{}"></span>"#,
                escape(&image.asset.url),
                width,
                size_class,
            ));
        }
        out.push_str("</span>");
        out
    }
}
