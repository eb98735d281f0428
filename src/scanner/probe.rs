use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::entities::{ContentType, DiscoveredUrls};
use crate::fetcher::{HeadResponse, HttpClient};

/// Classifies eligible URLs by the content type their server declares.
#[derive(Clone)]
pub struct Prober {
    client: Arc<dyn HttpClient>,
    concurrency: usize,
}

impl Prober {
    pub fn new(client: Arc<dyn HttpClient>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Probe every URL and bucket the classifiable ones by content type.
    ///
    /// Up to `concurrency` probes are in flight at once; results are consumed
    /// in input order, so each bucket lists URLs in discovery order. URLs
    /// that fail to probe or classify are left out.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn sort(&self, urls: &[Url]) -> DiscoveredUrls {
        let results: Vec<(Url, Option<ContentType>)> = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let content_type = self.probe(&url).await;
                (url, content_type)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut sorted = DiscoveredUrls::new();
        for (url, content_type) in results {
            if let Some(content_type) = content_type {
                sorted
                    .entry(content_type)
                    .or_default()
                    .push(url.to_string());
            }
        }
        sorted
    }

    async fn probe(&self, url: &Url) -> Option<ContentType> {
        match self.client.head(url).await {
            Ok(head) => classify(&head),
            Err(e) if e.is_transport() => {
                debug!(url = %url, error = %e, "probe unreachable");
                None
            }
            Err(e) => {
                warn!(url = %url, error = %e, "probe failed");
                None
            }
        }
    }
}

/// Bucket key for a probe response: the declared content type without its
/// parameters. Anything but `200 OK` or a missing header is unclassifiable.
pub fn classify(head: &HeadResponse) -> Option<ContentType> {
    if head.status != StatusCode::OK {
        debug!(url = %head.url_final, status = %head.status, "probe status not OK");
        return None;
    }
    let raw = head.content_type.as_deref()?;
    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}
