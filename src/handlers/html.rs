use async_trait::async_trait;
use futures::{
    future,
    stream::{self, StreamExt},
};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::assets::{AssetImporter, ImportedAsset};
use crate::config::SummarySettings;
use crate::entities::HandlerPayload;
use crate::fetcher::{HttpClient, decode_body};
use crate::handlers::handler::{FETCH_CONCURRENCY, escape, width_attr};
use crate::handlers::{FetchContext, TypeHandler};
use crate::scanner::filter::sanitize;

pub const HTML_TYPE: &str = "text/html";

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());

/// Metadata scraped from one linked page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PageImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<ImportedAsset>,
}

/// Fetches linked pages and summarizes them from their title and
/// OpenGraph/meta description, importing the preview image when enabled.
pub struct HtmlHandler {
    client: Arc<dyn HttpClient>,
    importer: Arc<dyn AssetImporter>,
}

impl HtmlHandler {
    pub fn new(client: Arc<dyn HttpClient>, importer: Arc<dyn AssetImporter>) -> Self {
        Self { client, importer }
    }

    async fn summarize(&self, url: &Url, ctx: &FetchContext) -> Option<PageSummary> {
        let response = match self.client.get(url).await {
            Ok(response) => response,
            Err(e) if e.is_transport() => {
                debug!(url = %url, error = %e, "page unreachable");
                return None;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "page fetch failed");
                return None;
            }
        };
        if response.status != StatusCode::OK {
            return None;
        }
        let body = decode_body(&response);
        if body.lossy {
            debug!(url = %url, encoding = body.encoding, "page had malformed bytes, decoded lossily");
        }

        let mut summary = parse_page(&body.text, &response.url_final);
        summary.url = url.to_string();

        if ctx.settings.import_images
            && let Some(image) = summary.image.as_mut()
            && let Some(src) = sanitize(&image.src)
        {
            match self.importer.import(&src, &ctx.owner).await {
                Ok(asset) => image.asset = Some(asset),
                Err(e) => warn!(url = %src, error = %e, "preview image import failed"),
            }
        }

        Some(summary)
    }
}

/// Title, description and preview image of a page. `og:description` wins
/// over `<meta name="description">`; relative image URLs are resolved
/// against `base`.
pub fn parse_page(html: &str, base: &Url) -> PageSummary {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .unwrap_or_default();

    let mut og_description = None;
    let mut meta_description = None;
    let mut og_image = None;
    for meta in document.select(&META_SELECTOR) {
        let element = meta.value();
        let Some(content) = element.attr("content") else {
            continue;
        };
        match (element.attr("property"), element.attr("name")) {
            (Some("og:description"), _) => og_description = Some(content),
            (Some("og:image"), _) => og_image = Some(content),
            (_, Some("description")) => meta_description = Some(content),
            _ => {}
        }
    }

    let description = og_description
        .map(collapse_whitespace)
        .filter(|d| !d.is_empty())
        .or_else(|| meta_description.map(collapse_whitespace))
        .unwrap_or_default();

    let image = og_image
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .and_then(|src| base.join(src).ok())
        .map(|src| PageImage {
            src: src.to_string(),
            asset: None,
        });

    PageSummary {
        url: base.to_string(),
        title,
        description,
        image,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl TypeHandler for HtmlHandler {
    fn title(&self) -> &'static str {
        "HTML"
    }

    #[instrument(skip_all, fields(urls = urls.len(), owner = %ctx.owner))]
    async fn fetch(&self, urls: &[Url], ctx: &FetchContext) -> HandlerPayload {
        let pages: Vec<PageSummary> = stream::iter(urls.iter().cloned())
            .map(|url| async move { self.summarize(&url, ctx).await })
            .buffered(FETCH_CONCURRENCY)
            .filter_map(future::ready)
            .collect()
            .await;
        serde_json::to_value(pages).unwrap_or_default()
    }

    fn render(&self, payload: &HandlerPayload, settings: &SummarySettings) -> String {
        let pages: Vec<PageSummary> = match serde_json::from_value(payload.clone()) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(error = %e, "unreadable html payload");
                return String::new();
            }
        };

        pages
            .iter()
            .filter(|page| !page.title.is_empty() && !page.description.is_empty())
            .map(|page| render_row(page, settings))
            .collect()
    }
}

fn render_row(page: &PageSummary, settings: &SummarySettings) -> String {
    let url = escape(&page.url);
    let mut row = String::from(r#"<div class="lsum-html-row">"#);
    row.push_str(&format!(
        r#"<h4 class="lsum-html-title"><a href="{url}">{}</a></h4><div class="lsum-html-url">{url}</div>"#,
        escape(&page.title),
    ));
    if let Some(asset) = page.image.as_ref().and_then(|image| image.asset.as_ref()) {
        row.push_str(&format!(
            r#"<span class="lsum-html-image"><img src="{}" alt=""{}></span>"#,
            escape(&asset.url),
            width_attr(settings),
        ));
    }
    row.push_str(&format!(
        r#"<p class="lsum-html-description">{}</p></div>"#,
        escape(&page.description),
    ));
    row
}
