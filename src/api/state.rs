use std::sync::Arc;

use crate::handlers::Registry;
use crate::repositories::ScanStateStore;
use crate::scan::ScanController;
use crate::summary::SummaryRenderer;
use crate::worker::ScanQueue;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn ScanStateStore>,
    pub controller: Arc<ScanController>,
    pub renderer: Arc<SummaryRenderer>,
    pub queue: ScanQueue,
}
