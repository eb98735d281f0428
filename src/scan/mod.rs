//! Scan state controller: drives a content item from unscanned to scanned
//! exactly once and commits the result in a single write.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;
use utoipa::ToSchema;

use crate::config::{ConfigProvider, SummarySettings};
use crate::dispatch::FetchDispatcher;
use crate::entities::{ContentItem, ItemId, ScanState};
use crate::repositories::{ScanStateStore, StoreError};
use crate::scanner::{Prober, UrlFilter, extract_urls};

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("scan did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Autosaves, drafts, revisions and other non-final events.
    TransientStatus,
    KindDisabled,
    AlreadyScanned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Skipped {
        reason: SkipReason,
    },
    Scanned {
        eligible_urls: usize,
        discovered_types: Vec<String>,
        fetched_types: Vec<String>,
    },
}

pub struct ScanController {
    site_url: Url,
    config: Arc<dyn ConfigProvider>,
    store: Arc<dyn ScanStateStore>,
    prober: Prober,
    dispatcher: FetchDispatcher,
    scan_timeout: Duration,
    locks: DashMap<ItemId, Arc<Mutex<()>>>,
}

impl ScanController {
    pub fn new(
        site_url: Url,
        config: Arc<dyn ConfigProvider>,
        store: Arc<dyn ScanStateStore>,
        prober: Prober,
        dispatcher: FetchDispatcher,
    ) -> Self {
        Self {
            site_url,
            config,
            store,
            prober,
            dispatcher,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            locks: DashMap::new(),
        }
    }

    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// Lifecycle intake. Scans the item if it is final, its kind is enabled
    /// and it has never been scanned; otherwise leaves stored state alone.
    #[instrument(skip_all, fields(item = %item.id))]
    pub async fn on_content_finalized(&self, item: &ContentItem) -> Result<ScanOutcome, ScanError> {
        let settings = self.config.snapshot();
        if let Some(reason) = precheck(item, &settings) {
            debug!(?reason, "event ignored");
            return Ok(ScanOutcome::Skipped { reason });
        }

        self.with_item_lock(&item.id, async {
            if self.store.get(&item.id).await?.scanned {
                debug!("already scanned");
                return Ok(ScanOutcome::Skipped {
                    reason: SkipReason::AlreadyScanned,
                });
            }
            self.scan_and_commit(item, settings).await
        })
        .await
    }

    /// Explicit re-scan: scans regardless of the `scanned` flag. The new
    /// result replaces the previous one in a single write; a failed or
    /// abandoned re-scan leaves the previous result in place.
    #[instrument(skip_all, fields(item = %item.id))]
    pub async fn rescan(&self, item: &ContentItem) -> Result<ScanOutcome, ScanError> {
        let settings = self.config.snapshot();
        if let Some(reason) = precheck(item, &settings) {
            return Ok(ScanOutcome::Skipped { reason });
        }

        self.with_item_lock(&item.id, self.scan_and_commit(item, settings))
            .await
    }

    /// Clear the scanned flag and both data fields so the next lifecycle
    /// event scans the item again.
    #[instrument(skip_all, fields(item = %id))]
    pub async fn reset(&self, id: &ItemId) -> Result<(), ScanError> {
        self.with_item_lock(id, async {
            self.store.clear(id).await?;
            info!("scan state cleared");
            Ok::<_, ScanError>(())
        })
        .await
    }

    async fn with_item_lock<T>(
        &self,
        id: &ItemId,
        work: impl Future<Output = Result<T, ScanError>>,
    ) -> Result<T, ScanError> {
        let lock = self.locks.entry(id.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);
        self.locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn scan_and_commit(
        &self,
        item: &ContentItem,
        settings: Arc<SummarySettings>,
    ) -> Result<ScanOutcome, ScanError> {
        let (state, eligible_urls) =
            match tokio::time::timeout(self.scan_timeout, self.run_pipeline(item, settings)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?self.scan_timeout, "scan abandoned, nothing persisted");
                    return Err(ScanError::TimedOut(self.scan_timeout));
                }
            };

        self.store.put(&item.id, &state).await?;

        let outcome = ScanOutcome::Scanned {
            eligible_urls,
            discovered_types: state
                .discovered_urls
                .iter()
                .flat_map(|m| m.keys().cloned())
                .collect(),
            fetched_types: state
                .fetched_data
                .iter()
                .flat_map(|m| m.keys().cloned())
                .collect(),
        };
        info!(?outcome, "scan committed");
        Ok(outcome)
    }

    async fn run_pipeline(
        &self,
        item: &ContentItem,
        settings: Arc<SummarySettings>,
    ) -> (ScanState, usize) {
        let candidates = extract_urls(&item.body);
        let eligible = UrlFilter::new(&self.site_url, &settings).eligible(&candidates);
        debug!(candidates = candidates.len(), eligible = eligible.len(), "urls filtered");

        if eligible.is_empty() {
            return (
                ScanState {
                    scanned: true,
                    ..ScanState::default()
                },
                0,
            );
        }

        let discovered = self.prober.sort(&eligible).await;
        let fetched = if discovered.is_empty() {
            None
        } else {
            Some(
                self.dispatcher
                    .dispatch(&discovered, &item.id, settings)
                    .await,
            )
        };

        (
            ScanState {
                scanned: true,
                discovered_urls: Some(discovered),
                fetched_data: fetched,
            },
            eligible.len(),
        )
    }
}

fn precheck(item: &ContentItem, settings: &SummarySettings) -> Option<SkipReason> {
    if !item.status.is_final() {
        return Some(SkipReason::TransientStatus);
    }
    if !settings.kind_enabled(&item.kind) {
        return Some(SkipReason::KindDisabled);
    }
    None
}
