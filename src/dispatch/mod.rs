//! Fetch dispatcher: runs each discovered bucket through its registered,
//! enabled handler and gathers the payloads.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::SummarySettings;
use crate::entities::{DiscoveredUrls, FetchedData, HandlerPayload, ItemId};
use crate::handlers::{FetchContext, Registry};
use crate::scanner::filter::sanitize;

/// Rewrites or filters a bucket's URLs before its handler sees them.
pub type PreFetch = Arc<dyn Fn(Vec<Url>) -> Vec<Url> + Send + Sync>;

/// Transforms a handler's payload before it is stored.
pub type PostFetch = Arc<dyn Fn(HandlerPayload) -> HandlerPayload + Send + Sync>;

#[derive(Clone)]
pub struct FetchDispatcher {
    registry: Arc<Registry>,
    pre_fetch: Vec<PreFetch>,
    post_fetch: Vec<PostFetch>,
}

impl FetchDispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            pre_fetch: Vec::new(),
            post_fetch: Vec::new(),
        }
    }

    /// Append a pre-fetch stage; stages run in the order they were added.
    pub fn with_pre_fetch(mut self, stage: PreFetch) -> Self {
        self.pre_fetch.push(stage);
        self
    }

    /// Append a post-fetch stage; stages run in the order they were added.
    pub fn with_post_fetch(mut self, stage: PostFetch) -> Self {
        self.post_fetch.push(stage);
        self
    }

    /// Fetch every bucket whose type is enabled and handled. Buckets run
    /// concurrently; a bucket always yields an entry, even when its handler
    /// produced an empty payload.
    #[instrument(skip_all, fields(owner = %owner, buckets = discovered.len()))]
    pub async fn dispatch(
        &self,
        discovered: &DiscoveredUrls,
        owner: &ItemId,
        settings: Arc<SummarySettings>,
    ) -> FetchedData {
        let ctx = FetchContext {
            owner: owner.clone(),
            settings: settings.clone(),
        };

        let jobs = discovered.iter().filter_map(|(content_type, urls)| {
            if !settings.type_enabled(content_type) {
                debug!(content_type = %content_type, "type disabled, skipping");
                return None;
            }
            let Some(handler) = self.registry.get(content_type) else {
                debug!(content_type = %content_type, "no handler registered, skipping");
                return None;
            };

            let urls = self.apply_pre_fetch(urls.iter().filter_map(|u| sanitize(u)).collect());
            let ctx = &ctx;
            Some(async move {
                let payload = handler.fetch(&urls, ctx).await;
                (content_type.clone(), self.apply_post_fetch(payload))
            })
        });

        let fetched: FetchedData = join_all(jobs).await.into_iter().collect();
        info!(types = fetched.len(), "dispatch complete");
        fetched
    }

    fn apply_pre_fetch(&self, urls: Vec<Url>) -> Vec<Url> {
        self.pre_fetch.iter().fold(urls, |urls, stage| stage(urls))
    }

    fn apply_post_fetch(&self, payload: HandlerPayload) -> HandlerPayload {
        self.post_fetch
            .iter()
            .fold(payload, |payload, stage| stage(payload))
    }
}
