use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::config::SummarySettings;
use crate::entities::{HandlerPayload, ItemId};

/// Upper bound on URLs a built-in handler fetches at once within a bucket.
pub(crate) const FETCH_CONCURRENCY: usize = 4;

/// Per-call inputs a handler may need while fetching.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub owner: ItemId,
    pub settings: Arc<SummarySettings>,
}

/// Fetch and render capabilities for one family of content types.
///
/// `fetch` absorbs per-URL failures and returns whatever subset succeeded.
/// `render` is pure and must tolerate payloads it cannot interpret by
/// returning an empty fragment.
#[async_trait]
pub trait TypeHandler: Send + Sync + 'static {
    /// Human readable name, e.g. "PNG".
    fn title(&self) -> &'static str;

    async fn fetch(&self, urls: &[Url], ctx: &FetchContext) -> HandlerPayload;

    fn render(&self, payload: &HandlerPayload, settings: &SummarySettings) -> String;
}

/// Escape text for use in markup, element content or quoted attributes.
pub(crate) fn escape(text: &str) -> String {
    ammonia::clean_text(text)
}

pub(crate) fn width_attr(settings: &SummarySettings) -> String {
    match settings.image_size.max_width() {
        Some(width) => format!(r#" width="{width}""#),
        None => String::new(),
    }
}
