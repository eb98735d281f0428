//! Display-time rendering of cached scan results. Never triggers a scan and
//! never fails: anything unreadable renders as absence.

use ammonia::Builder;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::config::{ConfigProvider, SummarySettings};
use crate::entities::{FetchedData, ItemId, is_empty_payload};
use crate::handlers::Registry;
use crate::repositories::ScanStateStore;

const CONTAINER_OPEN: &str = r#"<div class="lsum-summary">"#;
const CONTAINER_CLOSE: &str = "</div>";

pub struct SummaryRenderer {
    registry: Arc<Registry>,
    config: Arc<dyn ConfigProvider>,
    store: Arc<dyn ScanStateStore>,
}

impl SummaryRenderer {
    pub fn new(
        registry: Arc<Registry>,
        config: Arc<dyn ConfigProvider>,
        store: Arc<dyn ScanStateStore>,
    ) -> Self {
        Self {
            registry,
            config,
            store,
        }
    }

    /// Render the persisted summary for one item. A store failure is logged
    /// and yields the empty container.
    #[instrument(skip_all, fields(item = %id))]
    pub async fn render_item(&self, id: &ItemId) -> String {
        let fetched = match self.store.get(id).await {
            Ok(state) => state.fetched_data,
            Err(e) => {
                error!(error = %e, "failed to read scan state");
                None
            }
        };
        self.render(fetched.as_ref())
    }

    pub fn render(&self, fetched: Option<&FetchedData>) -> String {
        render_summary(&self.registry, &self.config.snapshot(), fetched)
    }
}

/// Concatenate handler fragments in registry order inside one container.
pub fn render_summary(
    registry: &Registry,
    settings: &SummarySettings,
    fetched: Option<&FetchedData>,
) -> String {
    let mut body = String::new();
    if let Some(fetched) = fetched {
        for (content_type, handler) in registry.iter() {
            if !settings.type_enabled(content_type) {
                continue;
            }
            let Some(payload) = fetched.get(content_type) else {
                continue;
            };
            if is_empty_payload(payload) {
                continue;
            }
            body.push_str(&handler.render(payload, settings));
        }
    }

    let clean = Builder::default()
        .add_generic_attributes(&["class"])
        .clean(&body)
        .to_string();
    format!("{CONTAINER_OPEN}{clean}{CONTAINER_CLOSE}")
}
