//! Background intake for lifecycle events. The API enqueues finalized items
//! and returns immediately; the worker drains the queue with bounded
//! concurrency through the [`ScanController`].

use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::entities::ContentItem;
use crate::scan::{ScanController, ScanOutcome};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("scan queue is closed")]
    Closed,
}

/// Sending half handed to the API. Cloning is cheap.
#[derive(Clone)]
pub struct ScanQueue {
    sender: mpsc::Sender<ContentItem>,
}

impl ScanQueue {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ContentItem>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Waits for capacity when the queue is full.
    pub async fn enqueue(&self, item: ContentItem) -> Result<(), QueueError> {
        self.sender.send(item).await.map_err(|_| QueueError::Closed)
    }
}

pub struct ScanWorker {
    controller: Arc<ScanController>,
    receiver: mpsc::Receiver<ContentItem>,
    concurrency: usize,
    shutdown: CancellationToken,
    worker_id: Uuid,
}

impl ScanWorker {
    pub fn new(
        controller: Arc<ScanController>,
        receiver: mpsc::Receiver<ContentItem>,
        concurrency: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            controller,
            receiver,
            concurrency: concurrency.max(1),
            shutdown,
            worker_id: Uuid::new_v4(),
        }
    }

    /// Process events until the queue closes or shutdown is requested, then
    /// scan whatever was already accepted and wait for in-flight scans.
    pub async fn run(mut self) -> Result<()> {
        info!(worker_id = %self.worker_id, concurrency = self.concurrency, "scan worker started");
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        loop {
            let item = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                item = self.receiver.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };
            self.spawn_scan(&semaphore, item).await?;
        }

        // Refuse new events; queued ones were acknowledged and still get scanned.
        self.receiver.close();
        while let Some(item) = self.receiver.recv().await {
            debug!(item = %item.id, "scanning queued item after intake stopped");
            self.spawn_scan(&semaphore, item).await?;
        }

        debug!("intake stopped, draining in-flight scans");
        let _permits = semaphore.acquire_many(self.concurrency as u32).await?;
        info!(worker_id = %self.worker_id, "scan worker stopped");
        Ok(())
    }

    async fn spawn_scan(&self, semaphore: &Arc<Semaphore>, item: ContentItem) -> Result<()> {
        let permit = semaphore.clone().acquire_owned().await?;
        let controller = self.controller.clone();
        let span = info_span!("scan", worker_id = %self.worker_id, item = %item.id);

        tokio::spawn(
            async move {
                let _permit = permit;
                process(&controller, item).await;
            }
            .instrument(span),
        );
        Ok(())
    }
}

async fn process(controller: &ScanController, item: ContentItem) {
    match controller.on_content_finalized(&item).await {
        Ok(ScanOutcome::Skipped { reason }) => debug!(?reason, "scan skipped"),
        Ok(outcome) => info!(?outcome, "scan finished"),
        // The item stays unscanned; the next lifecycle event retries it.
        Err(e) => warn!(error = %e, "scan failed"),
    }
}

/// Cancel `token` on ctrl-c.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        info!("shutdown signal received");
        token.cancel();
    });
}
